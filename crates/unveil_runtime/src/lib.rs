//! Unveil Embedding SDK
//!
//! Integrate Unveil motion into Rust applications.

#[cfg(feature = "unveil_core")]
pub use unveil_core;

#[cfg(feature = "unveil_animation")]
pub use unveil_animation;

#[cfg(feature = "unveil_motion")]
pub use unveil_motion;

/// Initialize the Unveil runtime
///
/// Loads the process-wide animation engine through the default loader.
/// Idempotent; a load failure degrades to baseline mode and is not an
/// error here.
#[cfg(feature = "unveil_motion")]
pub fn init() -> anyhow::Result<()> {
    let engine = unveil_motion::initialize_engine(&unveil_motion::DefaultLoader);
    tracing::debug!(mode = ?engine.mode(), "unveil runtime initialized");
    Ok(())
}

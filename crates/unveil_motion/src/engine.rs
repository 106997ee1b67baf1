//! Animation engine bootstrap
//!
//! The engine seam is the one fallible boundary in the toolkit: a host
//! loads the scheduler exactly once through an [`EngineLoader`], and
//! every component downstream sees either `Enhanced` (scheduler ready)
//! or `Baseline` (no animation, content shown at rest). Load failure is
//! recovered here and never propagates.
//!
//! Mount functions take an [`Engine`] value so tests and embedders can
//! scope engines independently; [`initialize_engine`]/[`engine`] provide
//! the process-wide instance most hosts want.

use std::sync::OnceLock;

use thiserror::Error;
use tracing::debug;
use unveil_animation::{AnimationScheduler, SchedulerHandle};

/// Errors an [`EngineLoader`] may report
///
/// These never escape the engine seam; a failed load degrades to
/// [`EngineMode::Baseline`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("animation engine unavailable: {0}")]
    Unavailable(String),
}

/// How much motion the engine can drive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineMode {
    /// Scheduler loaded; full animation available
    Enhanced,
    /// No scheduler; components apply resting styles immediately
    #[default]
    Baseline,
}

/// Produces the scheduler backing the enhanced path
pub trait EngineLoader {
    fn load(&self) -> Result<AnimationScheduler, EngineError>;
}

/// Loader for the in-process scheduler
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultLoader;

impl EngineLoader for DefaultLoader {
    fn load(&self) -> Result<AnimationScheduler, EngineError> {
        Ok(AnimationScheduler::new())
    }
}

/// The loaded (or degraded) animation engine
///
/// Cheap to clone; clones share the same scheduler. A `Baseline` engine
/// carries no scheduler and every animation request against it resolves
/// to the resting style.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    scheduler: Option<AnimationScheduler>,
}

impl Engine {
    /// An engine with no animation backend
    pub fn baseline() -> Self {
        Self { scheduler: None }
    }

    /// An engine wrapping an already-constructed scheduler
    pub fn enhanced(scheduler: AnimationScheduler) -> Self {
        Self {
            scheduler: Some(scheduler),
        }
    }

    /// Run the loader, degrading to `Baseline` on failure
    pub fn load(loader: &dyn EngineLoader) -> Self {
        match loader.load() {
            Ok(scheduler) => Self::enhanced(scheduler),
            Err(err) => {
                debug!("engine load failed, falling back to baseline: {err}");
                Self::baseline()
            }
        }
    }

    pub fn mode(&self) -> EngineMode {
        if self.scheduler.is_some() {
            EngineMode::Enhanced
        } else {
            EngineMode::Baseline
        }
    }

    pub fn is_enhanced(&self) -> bool {
        self.scheduler.is_some()
    }

    /// The backing scheduler, `Enhanced` mode only
    pub fn scheduler(&self) -> Option<&AnimationScheduler> {
        self.scheduler.as_ref()
    }

    /// A weak handle onto the backing scheduler, `Enhanced` mode only
    pub fn handle(&self) -> Option<SchedulerHandle> {
        self.scheduler.as_ref().map(|s| s.handle())
    }
}

static ENGINE: OnceLock<Engine> = OnceLock::new();

/// One-time initialization of the process-wide engine
///
/// Idempotent: the first call decides the outcome and repeat calls
/// return it unchanged.
pub fn initialize_engine(loader: &dyn EngineLoader) -> &'static Engine {
    ENGINE.get_or_init(|| Engine::load(loader))
}

/// The process-wide engine
///
/// Before [`initialize_engine`] runs this is a `Baseline` engine, so
/// components built early still resolve to visible content.
pub fn engine() -> Engine {
    ENGINE.get().cloned().unwrap_or_default()
}

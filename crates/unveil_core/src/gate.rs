//! One-shot completion latch

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "has this finished?" flag
///
/// Cheap to clone; all clones observe the same latch. Once set it
/// stays set. The first caller to observe the transition through
/// [`complete`](CompletionGate::complete) gets `true` back, which
/// makes exactly-once completion callbacks trivial to enforce.
#[derive(Clone, Debug, Default)]
pub struct CompletionGate {
    flag: Arc<AtomicBool>,
}

impl CompletionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the gate; returns `true` only for the call that flipped it
    pub fn complete(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    pub fn is_complete(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

//! Environment capability detection
//!
//! Motion-heavy surfaces must degrade on touch devices and narrow
//! viewports. The classification is computed once from an
//! [`EnvironmentProbe`] and shared through a [`CapabilityService`] so
//! every consumer reads the same answer instead of re-deriving it.

use std::sync::{Arc, RwLock};

use crate::geometry::Vec2;

/// Viewport width below which an environment counts as narrow, in pixels
pub const NARROW_VIEWPORT_BREAKPOINT: f32 = 768.0;

/// Primary pointing device class reported by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerClass {
    /// Precise pointer (mouse, trackpad, stylus)
    Fine,
    /// Imprecise pointer (finger on a touchscreen)
    Coarse,
    /// No pointing device at all
    None,
}

/// Snapshot of the environment classification
///
/// A reduced environment gets instant-to-rest motion: either the
/// pointer is coarse / touch-driven, or the viewport is narrower than
/// [`NARROW_VIEWPORT_BREAKPOINT`]. A narrow viewport alone is enough,
/// even with a fine pointer and no touch support.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CapabilityState {
    /// Touch points are available or the primary pointer is coarse
    pub touch_or_coarse_pointer: bool,
    /// Viewport width is below the narrow breakpoint
    pub narrow_viewport: bool,
}

impl CapabilityState {
    /// Whether motion should run in reduced form
    pub fn is_reduced(&self) -> bool {
        self.touch_or_coarse_pointer || self.narrow_viewport
    }
}

/// Source of raw environment facts
///
/// Each accessor returns `None` when the host cannot answer. Unknown
/// facts classify toward reduced motion rather than full motion.
pub trait EnvironmentProbe {
    /// Class of the primary pointing device
    fn pointer_class(&self) -> Option<PointerClass>;
    /// Number of simultaneous touch points the host supports
    fn touch_points(&self) -> Option<u32>;
    /// Current viewport size in pixels
    fn viewport_size(&self) -> Option<Vec2>;
}

/// Shared capability classification
///
/// Cheap to clone; all clones observe the same state. Call
/// [`refresh`](CapabilityService::refresh) after a viewport resize or
/// input-device change to re-run classification.
#[derive(Clone)]
pub struct CapabilityService {
    state: Arc<RwLock<CapabilityState>>,
}

impl CapabilityService {
    /// Classify the environment and wrap the result in a shared service
    pub fn new(probe: &dyn EnvironmentProbe) -> Self {
        Self {
            state: Arc::new(RwLock::new(classify(probe))),
        }
    }

    /// Current classification snapshot
    pub fn state(&self) -> CapabilityState {
        match self.state.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Shorthand for `state().is_reduced()`
    pub fn is_reduced(&self) -> bool {
        self.state().is_reduced()
    }

    /// Re-run classification against the probe
    ///
    /// Returns the fresh snapshot. All clones of this service observe
    /// the update.
    pub fn refresh(&self, probe: &dyn EnvironmentProbe) -> CapabilityState {
        let fresh = classify(probe);
        match self.state.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        fresh
    }
}

fn classify(probe: &dyn EnvironmentProbe) -> CapabilityState {
    let touch_or_coarse_pointer = match (probe.pointer_class(), probe.touch_points()) {
        (Some(PointerClass::Fine), Some(points)) => points > 0,
        (Some(PointerClass::Coarse), _) | (Some(PointerClass::None), _) => true,
        (Some(PointerClass::Fine), None) | (None, _) => {
            tracing::debug!("pointer facts unavailable, classifying as touch-capable");
            true
        }
    };

    let narrow_viewport = match probe.viewport_size() {
        Some(size) => size.x < NARROW_VIEWPORT_BREAKPOINT,
        None => {
            tracing::debug!("viewport size unavailable, classifying as narrow");
            true
        }
    };

    CapabilityState {
        touch_or_coarse_pointer,
        narrow_viewport,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProbe {
        pointer: Option<PointerClass>,
        touch: Option<u32>,
        viewport: Option<Vec2>,
    }

    impl EnvironmentProbe for FakeProbe {
        fn pointer_class(&self) -> Option<PointerClass> {
            self.pointer
        }
        fn touch_points(&self) -> Option<u32> {
            self.touch
        }
        fn viewport_size(&self) -> Option<Vec2> {
            self.viewport
        }
    }

    fn desktop() -> FakeProbe {
        FakeProbe {
            pointer: Some(PointerClass::Fine),
            touch: Some(0),
            viewport: Some(Vec2::new(1440.0, 900.0)),
        }
    }

    #[test]
    fn test_desktop_is_full_motion() {
        let service = CapabilityService::new(&desktop());
        let state = service.state();
        assert!(!state.touch_or_coarse_pointer);
        assert!(!state.narrow_viewport);
        assert!(!state.is_reduced());
    }

    #[test]
    fn test_touch_device_is_reduced() {
        let probe = FakeProbe {
            pointer: Some(PointerClass::Coarse),
            touch: Some(5),
            viewport: Some(Vec2::new(1024.0, 768.0)),
        };
        assert!(CapabilityService::new(&probe).is_reduced());
    }

    #[test]
    fn test_fine_pointer_with_touch_points_is_reduced() {
        let probe = FakeProbe {
            touch: Some(2),
            ..desktop()
        };
        assert!(CapabilityService::new(&probe).is_reduced());
    }

    #[test]
    fn test_narrow_viewport_alone_is_reduced() {
        // Fine pointer, no touch, but a 700px-wide window still counts
        // as reduced.
        let probe = FakeProbe {
            viewport: Some(Vec2::new(700.0, 900.0)),
            ..desktop()
        };
        let state = CapabilityService::new(&probe).state();
        assert!(!state.touch_or_coarse_pointer);
        assert!(state.narrow_viewport);
        assert!(state.is_reduced());
    }

    #[test]
    fn test_breakpoint_is_exclusive() {
        let probe = FakeProbe {
            viewport: Some(Vec2::new(768.0, 900.0)),
            ..desktop()
        };
        assert!(!CapabilityService::new(&probe).state().narrow_viewport);
    }

    #[test]
    fn test_unknown_environment_is_reduced() {
        let probe = FakeProbe {
            pointer: None,
            touch: None,
            viewport: None,
        };
        let state = CapabilityService::new(&probe).state();
        assert!(state.touch_or_coarse_pointer);
        assert!(state.narrow_viewport);
        assert!(state.is_reduced());
    }

    #[test]
    fn test_refresh_updates_all_clones() {
        let service = CapabilityService::new(&desktop());
        let clone = service.clone();
        assert!(!clone.is_reduced());

        let narrow = FakeProbe {
            viewport: Some(Vec2::new(600.0, 800.0)),
            ..desktop()
        };
        service.refresh(&narrow);
        assert!(clone.is_reduced());
    }
}

//! Unveil Core Runtime
//!
//! This crate provides the foundational primitives for the Unveil motion toolkit:
//!
//! - **Capability Detection**: Classify the host environment once and share the result
//! - **State Machines**: Flat statecharts for sequenced motion phases
//! - **Completion Gates**: One-shot latches for "has this finished?" queries
//! - **Geometry**: Minimal vector and bounds types shared by every layer
//!
//! # Example
//!
//! ```rust
//! use unveil_core::capability::{CapabilityService, EnvironmentProbe, PointerClass};
//! use unveil_core::geometry::Vec2;
//!
//! struct Desktop;
//!
//! impl EnvironmentProbe for Desktop {
//!     fn pointer_class(&self) -> Option<PointerClass> {
//!         Some(PointerClass::Fine)
//!     }
//!     fn touch_points(&self) -> Option<u32> {
//!         Some(0)
//!     }
//!     fn viewport_size(&self) -> Option<Vec2> {
//!         Some(Vec2::new(1440.0, 900.0))
//!     }
//! }
//!
//! let service = CapabilityService::new(&Desktop);
//! assert!(!service.state().is_reduced());
//! ```

pub mod capability;
pub mod fsm;
pub mod gate;
pub mod geometry;

pub use capability::{CapabilityService, CapabilityState, EnvironmentProbe, PointerClass};
pub use fsm::{EventId, FsmId, FsmRuntime, StateId, StateMachine, Transition};
pub use gate::CompletionGate;
pub use geometry::{Bounds, Vec2};

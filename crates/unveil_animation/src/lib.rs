//! Unveil Animation System
//!
//! Spring physics, eased tweens, and timeline orchestration.
//!
//! # Features
//!
//! - **Spring Physics**: RK4-integrated springs with stiffness, damping, mass
//! - **Tweens**: Single eased segments with delay and reversible direction
//! - **Timelines**: Orchestrate multiple value tracks with offsets and looping
//! - **Staggering**: Cascade timeline entries with a per-index delay step
//! - **Scheduler**: Cooperative single-threaded driver with tick callbacks
//! - **Interruptible**: Springs inherit velocity when retargeted mid-flight

pub mod easing;
pub mod interpolate;
pub mod scheduler;
pub mod spring;
pub mod timeline;
pub mod tween;

pub use easing::Easing;
pub use interpolate::Interpolate;
pub use scheduler::{
    AnimatedSpring, AnimatedTimeline, AnimatedTween, AnimationScheduler, SchedulerHandle,
    SpringId, TickCallback, TickCallbackId, TimelineId, TweenId,
};
pub use spring::{Spring, SpringConfig};
pub use timeline::{StaggerBuilder, Timeline, TimelineEntryId};
pub use tween::{PlayDirection, Tween};

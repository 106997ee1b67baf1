//! Unveil Motion Toolkit
//!
//! Capability-adaptive reveal orchestration over a headless stage.
//!
//! # Features
//!
//! - **Engine Seam**: Load the animation backend once, degrade to baseline on failure
//! - **Stage**: Retained node tree with bounds, styles, and scroll watchers
//! - **Reveals**: Hidden-to-rest motion on scroll entry, tween or spring driven
//! - **Staggering**: Cascaded child reveals off a single container trigger
//! - **Text**: Fragment splitting, per-fragment cascades, and scramble decode
//! - **Intro**: Sequenced counter/logo/tagline overlay with exactly-once hand-over
//! - **Marquee**: Infinite horizontal drift loops
//! - **Settings**: TOML-backed motion defaults and intro timings
//!
//! Every mount function takes the [`Engine`] and a
//! [`CapabilityService`](unveil_core::CapabilityService) so hosts and
//! tests control both seams explicitly; reduced capability resolves to
//! resting styles with nothing registered.

pub mod engine;
pub mod intro;
pub mod marquee;
pub mod reveal;
pub mod settings;
pub mod stage;
pub mod stagger;
pub mod text;

pub use engine::{
    engine, initialize_engine, DefaultLoader, Engine, EngineError, EngineLoader, EngineMode,
};
pub use intro::{IntroController, IntroPhase};
pub use marquee::{marquee, MarqueeHandle};
pub use reveal::{reveal, MotionDriver, MotionSpec, RevealHandle};
pub use settings::{IntroTimings, MotionSettings, SettingsError};
pub use stage::{
    NodeId, NodeStyle, Stage, Threshold, WatcherCallback, WatcherEvent, WatcherId,
};
pub use stagger::{stagger_reveal, StaggerHandle};
pub use text::{
    split_text, Fragment, FragmentSequence, Scramble, ScrambleHandle, SplitMode, TextReveal,
    TextRevealHandle,
};

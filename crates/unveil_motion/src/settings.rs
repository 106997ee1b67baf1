//! Motion configuration
//!
//! Hosts tune the toolkit through [`MotionSettings`], loaded from TOML.
//! Every field has a default, so an empty document is a valid config.
//! Unknown keys are rejected rather than silently dropped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced at the configuration boundary
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to parse motion settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Timings for the sequenced intro overlay, all in milliseconds
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IntroTimings {
    /// Counter run 0 to 100
    pub counter_ms: u32,
    /// Logo reveal offset from intro start
    pub logo_offset_ms: u32,
    /// Tagline reveal offset from intro start
    pub tagline_offset_ms: u32,
    /// Overlay fade-out once the counter completes
    pub exit_ms: u32,
    /// Hold before exit on the reduced-motion path
    pub reduced_hold_ms: u32,
}

impl Default for IntroTimings {
    fn default() -> Self {
        Self {
            counter_ms: 5000,
            logo_offset_ms: 400,
            tagline_offset_ms: 1200,
            exit_ms: 800,
            reduced_hold_ms: 1500,
        }
    }
}

/// Top-level motion settings
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MotionSettings {
    /// Viewport widths strictly below this classify as narrow
    pub breakpoint_px: f32,
    /// Default reveal duration
    pub default_duration_ms: u32,
    /// Default per-child stagger step
    pub default_stagger_ms: u32,
    pub intro: IntroTimings,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            breakpoint_px: 768.0,
            default_duration_ms: 600,
            default_stagger_ms: 100,
            intro: IntroTimings::default(),
        }
    }
}

impl MotionSettings {
    /// Parse settings from a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(input)?)
    }
}

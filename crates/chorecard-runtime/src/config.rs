#![forbid(unsafe_code)]

//! Runtime configuration as data.
//!
//! [`RuntimeConfig`] groups every tunable of the scheduler, the gesture
//! recognizer and the render path. It loads from TOML or JSON; durations are
//! integer milliseconds and distances are pixels in the file format.
//!
//! ```toml
//! # chorecard.toml
//! [scheduler]
//! debounce_ms = 16
//!
//! [gesture]
//! long_press_ms = 650
//! swipe_commit_px = 96.0
//!
//! [render]
//! strategy = "full_replace"
//! ```
//!
//! Every field defaults to the built-in value, so a missing section or key
//! behaves exactly like [`RuntimeConfig::default`].

use std::path::Path;
use std::time::Duration;

use chorecard_core::GestureConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scheduler::SchedulerConfig;

// ---------------------------------------------------------------------------
// Top-level RuntimeConfig
// ---------------------------------------------------------------------------

/// All runtime tunables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub scheduler: SchedulerPolicyConfig,
    pub gesture: GesturePolicyConfig,
    pub render: RenderPolicyConfig,
}

impl RuntimeConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Json)
    }

    /// Check that all values are usable.
    ///
    /// Returns a list of problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let g = &self.gesture;

        if g.long_press_ms == 0 {
            errors.push("gesture.long_press_ms must be > 0".into());
        }
        if g.confirm_timeout_ms == 0 {
            errors.push("gesture.confirm_timeout_ms must be > 0".into());
        }
        for (name, value) in [
            ("gesture.move_tolerance_px", g.move_tolerance_px),
            ("gesture.swipe_feedback_px", g.swipe_feedback_px),
            ("gesture.swipe_commit_px", g.swipe_commit_px),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        if g.swipe_commit_px < g.swipe_feedback_px {
            errors.push(format!(
                "gesture.swipe_commit_px ({}) must be >= gesture.swipe_feedback_px ({})",
                g.swipe_commit_px, g.swipe_feedback_px
            ));
        }
        errors
    }

    /// Validate, turning problems into an error.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    // --- builder -----------------------------------------------------------

    /// Set the debounce delay.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.scheduler.debounce_ms = millis(debounce);
        self
    }

    /// Set the fingerprint time bucket. Zero disables it.
    #[must_use]
    pub fn with_time_bucket(mut self, bucket: Duration) -> Self {
        self.scheduler.time_bucket_ms = millis(bucket);
        self
    }

    /// Replace all gesture settings.
    #[must_use]
    pub fn with_gesture(mut self, gesture: &GestureConfig) -> Self {
        self.gesture = GesturePolicyConfig::from(gesture);
        self
    }

    /// Set how rendered markup reaches the tree.
    #[must_use]
    pub fn with_strategy(mut self, strategy: RenderStrategy) -> Self {
        self.render.strategy = strategy;
        self
    }

    // --- conversions -------------------------------------------------------

    /// Scheduler settings.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            debounce: Duration::from_millis(self.scheduler.debounce_ms),
            time_bucket: Duration::from_millis(self.scheduler.time_bucket_ms),
        }
    }

    /// Gesture recognizer settings.
    #[must_use]
    pub fn gesture_config(&self) -> GestureConfig {
        let g = &self.gesture;
        GestureConfig {
            long_press: Duration::from_millis(g.long_press_ms),
            move_tolerance: g.move_tolerance_px,
            confirm_timeout: Duration::from_millis(g.confirm_timeout_ms),
            interaction_block: Duration::from_millis(g.interaction_block_ms),
            swipe_feedback: g.swipe_feedback_px,
            swipe_commit: g.swipe_commit_px,
            swipe_reset: Duration::from_millis(g.swipe_reset_ms),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Scheduler section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerPolicyConfig {
    /// Debounce delay for non-forced requests (default: 16).
    pub debounce_ms: u64,
    /// Fingerprint time bucket (default: 60000, 0 disables).
    pub time_bucket_ms: u64,
}

impl Default for SchedulerPolicyConfig {
    fn default() -> Self {
        let d = SchedulerConfig::default();
        Self {
            debounce_ms: millis(d.debounce),
            time_bucket_ms: millis(d.time_bucket),
        }
    }
}

/// Gesture section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GesturePolicyConfig {
    pub long_press_ms: u64,
    pub move_tolerance_px: f64,
    pub confirm_timeout_ms: u64,
    pub interaction_block_ms: u64,
    pub swipe_feedback_px: f64,
    pub swipe_commit_px: f64,
    pub swipe_reset_ms: u64,
}

impl Default for GesturePolicyConfig {
    fn default() -> Self {
        Self::from(&GestureConfig::default())
    }
}

impl From<&GestureConfig> for GesturePolicyConfig {
    fn from(c: &GestureConfig) -> Self {
        Self {
            long_press_ms: millis(c.long_press),
            move_tolerance_px: c.move_tolerance,
            confirm_timeout_ms: millis(c.confirm_timeout),
            interaction_block_ms: millis(c.interaction_block),
            swipe_feedback_px: c.swipe_feedback,
            swipe_commit_px: c.swipe_commit,
            swipe_reset_ms: millis(c.swipe_reset),
        }
    }
}

/// How rendered markup is brought into the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// Diff against the last markup and patch in place.
    #[default]
    Diff,
    /// Rebuild the whole tree every cycle.
    FullReplace,
}

/// Render section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderPolicyConfig {
    pub strategy: RenderStrategy,
}

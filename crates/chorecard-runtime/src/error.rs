#![forbid(unsafe_code)]

//! Runtime error types.
//!
//! Render-production failures never escape a render cycle: the runtime turns
//! them into the fallback error view and records the error for the host.
//! Configuration errors are returned to whoever loads the config.

use chorecard_render::DiffError;
use thiserror::Error;

/// Failure reported by a widget's render function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RenderError {
    message: String,
}

impl RenderError {
    /// Create a render error with a short description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The description given by the widget.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for RenderError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for RenderError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Something that went wrong during a render cycle.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The widget returned an error instead of markup.
    #[error("render failed: {0}")]
    RenderFailed(#[from] RenderError),
    /// The widget panicked while producing markup.
    #[error("render panicked: {0}")]
    RenderPanicked(String),
    /// The produced markup could not be applied to the tree.
    #[error(transparent)]
    Diff(#[from] DiffError),
    /// The runtime configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Whether this error came out of producing or applying markup.
    #[must_use]
    pub const fn is_render_failure(&self) -> bool {
        matches!(
            self,
            Self::RenderFailed(_) | Self::RenderPanicked(_) | Self::Diff(_)
        )
    }
}

/// Failure to load or validate a [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Parsed, but one or more values are out of range.
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_display_is_message() {
        assert_eq!(RenderError::new("no data").to_string(), "no data");
        let err = RuntimeError::from(RenderError::new("no data"));
        assert_eq!(err.to_string(), "render failed: no data");
        assert!(err.is_render_failure());
    }

    #[test]
    fn invalid_config_lists_every_problem() {
        let err = ConfigError::Invalid(vec!["a must be > 0".into(), "b must be > 0".into()]);
        assert_eq!(
            err.to_string(),
            "invalid configuration: a must be > 0; b must be > 0"
        );
        assert!(!RuntimeError::from(err).is_render_failure());
    }
}

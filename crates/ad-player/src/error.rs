//! Ad player error types.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, AdPlayerError>;

/// Errors raised at the collaborator seams.
///
/// Display itself never surfaces these to the caller; a failed source switch or
/// a missing surface ends the slot instead.
#[derive(Error, Debug)]
pub enum AdPlayerError {
    /// The host player could not switch to the ad source.
    #[error("source switch failed for `{url}`: {reason}")]
    SourceSwitch { url: String, reason: String },

    /// A playback surface could not be obtained or created.
    #[error("playback surface unavailable: {0}")]
    Surface(String),

    /// Invalid configuration or slot document.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AdPlayerError {
    /// Create a source switch error.
    pub fn source_switch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceSwitch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a surface error.
    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

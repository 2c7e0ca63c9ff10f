//! Error types for the trainer.
//!
//! Shape and configuration problems are detected at construction and load
//! boundaries. Nothing inside the tick loop returns these errors; a car that
//! misbehaves mid-run simply dies.

use thiserror::Error;

/// Main error type for trainer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A topology or genome does not have the shape that was asked for.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        /// What the session or topology requires.
        expected: String,
        /// What was actually supplied.
        found: String,
    },

    /// Required parameters are missing or out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Track boundaries cannot be ray cast against.
    #[error("degenerate track geometry: {0}")]
    DegenerateGeometry(String),

    /// File system errors.
    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),

    /// Network file (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parameter file parsing errors.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for trainer operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new shape mismatch error.
    #[must_use]
    pub fn shape_mismatch<E: ToString, F: ToString>(expected: E, found: F) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates a new invalid configuration error.
    #[must_use]
    pub fn invalid_configuration<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new degenerate geometry error.
    #[must_use]
    pub fn degenerate_geometry<S: Into<String>>(msg: S) -> Self {
        Self::DegenerateGeometry(msg.into())
    }

    /// Returns `true` for [`Error::ShapeMismatch`].
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch { .. })
    }
}

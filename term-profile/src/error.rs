//! Error types for the streaming profiler.
//!
//! All fallible operations in this crate return [`Result`], whose error type is
//! [`ProfileError`]. Value-level problems (an unparseable cell, a NaN) are never
//! surfaced here; they are absorbed by the column accumulators and reported as
//! missing/invalid counts in the final profile.

use thiserror::Error;

/// The main error type for the profiler.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A requested quantile was outside the open interval (0, 1).
    #[error("Invalid quantile {quantile}: must be strictly between 0 and 1")]
    InvalidQuantile { quantile: f64 },

    /// The reservoir capacity was zero.
    #[error("Invalid reservoir size: must be greater than zero")]
    InvalidReservoirSize,

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A configured column does not exist in the declared schema.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// A configured column exists but has an unsuitable declared type.
    #[error("Type mismatch for column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// The profiler was driven through an illegal phase transition.
    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Partial states could not be merged.
    #[error("Failed to merge states: {0}")]
    StateMerge(String),

    /// Error from a record source.
    #[error("Record source error ({source_type}): {message}")]
    Source {
        /// Kind of source (e.g. "arrow", "memory")
        source_type: String,
        /// Detailed error message
        message: String,
    },

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, ProfileError>`.
pub type Result<T> = std::result::Result<T, ProfileError>;

impl ProfileError {
    /// Creates a configuration error with the given message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a column-not-found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Creates a state merge error with the given message.
    pub fn state_merge(msg: impl Into<String>) -> Self {
        Self::StateMerge(msg.into())
    }

    /// Creates a record source error.
    pub fn source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_type: source_type.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid transition error.
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this error was raised by configuration validation.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantile { .. }
                | Self::InvalidReservoirSize
                | Self::Configuration(_)
                | Self::ColumnNotFound { .. }
                | Self::TypeMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ProfileError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("profiling task failed: {err}"))
    }
}

//! Error types for simulation setup and stepping.

use thiserror::Error;

/// Errors that can stop a simulation run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// The run was configured with values the model cannot use
    /// (e.g. non-positive mass, zero gravity, an empty horizon).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The integrator produced a non-finite state or failed to reach the end of a span.
    #[error("integration failed after step {step}: {reason}")]
    Integration {
        /// Index of the last step whose state was committed.
        step: usize,
        /// What went wrong.
        reason: String,
    },
}

impl SimError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an integration error for the given last-good step.
    #[must_use]
    pub fn integration(step: usize, reason: impl Into<String>) -> Self {
        Self::Integration {
            step,
            reason: reason.into(),
        }
    }
}

/// Result alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

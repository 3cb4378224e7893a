//! Error types for the reactive runtime.

use thiserror::Error;

use crate::graph::ComputationId;

/// Errors surfaced by the runtime.
///
/// Failures inside computation bodies never propagate out of a flush; they
/// are reported to the runtime's error handler and the flush carries on.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A computation body panicked.
    #[error("{id} panicked: {message}")]
    ComputationPanicked { id: ComputationId, message: String },

    /// A fallible effect returned an error.
    #[error("{id} failed: {message}")]
    ComputationFailed { id: ComputationId, message: String },

    /// The runtime configuration could not be parsed.
    #[error("invalid runtime config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

/// Turn a panic payload into a printable message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//! Uniform error shape surfaced to SDK callers

use crate::model::ExecError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code used when a submission fails at the transport level
pub const RUNTIME_ERROR: &str = "RUNTIME_ERROR";
/// Code used when challenges arrive but no handler is registered
pub const AUTHENTICATION_REQUIRED: &str = "AUTHENTICATION_REQUIRED";
/// Code used when the handler aborts authentication
pub const AUTHENTICATION_ABORTED: &str = "AUTHENTICATION_ABORTED";
/// Code used when an expired status carries no error detail
pub const AUTHENTICATION_EXPIRED: &str = "AUTHENTICATION_EXPIRED";
/// Code used when an error status carries no error detail
pub const AUTHENTICATION_ERROR: &str = "AUTHENTICATION_ERROR";

/// Code, message and opaque details
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct SdkError {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Opaque details (often serialized JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SdkError {
    /// Create an error without details
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Builder: attach details
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<ExecError> for SdkError {
    fn from(error: ExecError) -> Self {
        Self {
            code: error.code,
            message: error.message,
            details: error.details,
        }
    }
}

//! Error taxonomy surfaced by the client
//!
//! Execution failures carry the whole batch of per-tool errors; every other
//! failure carries a single error.

use crate::config::ConfigError;
use thiserror::Error;
use toolbridge_core::AuthenticationStatus;
use toolbridge_core::SdkError;
use toolbridge_core::error::RUNTIME_ERROR;
use toolbridge_transport::TransportError;

/// Errors returned by [`ToolBridgeClient`](crate::ToolBridgeClient)
#[derive(Debug, Error)]
pub enum ToolBridgeError {
    /// Client could not be constructed
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Discovery response failed validation
    #[error("Failed to parse response: {0}")]
    Decode(String),

    /// Discovery request failed at the transport level
    #[error(transparent)]
    Transport(TransportError),

    /// One or more tool executions reported failure
    #[error("Tool execution failed: {}", summarize(.0))]
    Execution(Vec<SdkError>),

    /// Challenges arrived but no authentication handler is registered
    #[error("Authentication required: {0}")]
    AuthenticationRequired(SdkError),

    /// The authentication handler aborted
    #[error("Authentication aborted: {0}")]
    AuthenticationAborted(SdkError),

    /// The authentication request resolved to expired or error
    #[error("Authentication {status}: {error}")]
    AuthenticationFailed {
        /// Terminal status reported for the challenge
        status: AuthenticationStatus,
        /// Error data supplied with the status
        error: SdkError,
    },

    /// Execution request failed at the transport level
    #[error("Runtime error: {0}")]
    Runtime(SdkError),
}

fn summarize(errors: &[SdkError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ToolBridgeError {
    /// Wrap a submission failure with the fixed runtime code
    #[must_use]
    pub fn runtime(error: &TransportError) -> Self {
        Self::Runtime(SdkError::new(RUNTIME_ERROR, error.to_string()).with_details(format!("{error:?}")))
    }

    /// Machine-readable code of this failure
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Execution(_) => "EXECUTION_ERROR",
            Self::AuthenticationRequired(error)
            | Self::AuthenticationAborted(error)
            | Self::AuthenticationFailed { error, .. }
            | Self::Runtime(error) => &error.code,
        }
    }

    /// Every failure as a list of uniform errors
    ///
    /// Execution failures yield their whole batch; all others yield one entry.
    #[must_use]
    pub fn sdk_errors(&self) -> Vec<SdkError> {
        match self {
            Self::Execution(errors) => errors.clone(),
            Self::AuthenticationRequired(error)
            | Self::AuthenticationAborted(error)
            | Self::AuthenticationFailed { error, .. }
            | Self::Runtime(error) => vec![error.clone()],
            other => vec![SdkError::new(other.code(), other.to_string())],
        }
    }
}

impl From<TransportError> for ToolBridgeError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Decode(message) => Self::Decode(message),
            other => Self::Transport(other),
        }
    }
}

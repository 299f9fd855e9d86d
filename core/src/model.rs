//! Canonical data model shared by discovery, execution and authentication.
//!
//! In-memory JSON form is camelCase. Converting to and from the snake_case
//! wire form is done by the transport, never here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A conversation message in the pass-through provider's shape
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Role of the message sender (`user`, `assistant`, `system`, `tool`)
    pub role: String,
    /// Text content
    pub content: String,
}

impl Message {
    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// One metadata entry attached to discovery and execution requests
///
/// Entries are appended in order and never deduplicated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValuePair {
    /// Metadata key
    pub key: String,
    /// Metadata value (may be absent)
    pub value: Option<String>,
}

impl KeyValuePair {
    /// Create a metadata entry
    #[must_use]
    pub fn new(key: impl Into<String>, value: Option<String>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Which credential the platform should use when executing tools
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Authentication {
    /// Use the client's API key
    #[default]
    ApiKey,
    /// Use the named metadata field as the credential
    Metadata {
        /// Metadata key holding the credential
        #[serde(rename = "metadataField")]
        metadata_field: String,
    },
}

impl Authentication {
    /// Credential taken from a metadata field
    #[must_use]
    pub fn metadata_field(field: impl Into<String>) -> Self {
        Self::Metadata {
            metadata_field: field.into(),
        }
    }
}

/// A single parameter of a tool's schema
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// JSON schema type name (`string`, `number`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

/// Ordered parameter list with the subset marked required
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolParameters {
    /// Parameters in declaration order
    #[serde(default)]
    pub properties: Vec<ToolParameter>,
    /// Names of required parameters
    #[serde(default)]
    pub required: Vec<String>,
}

/// Name, description and parameters of a tool
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolSignature {
    /// Tool name
    pub name: String,
    /// What the tool does
    #[serde(default)]
    pub description: String,
    /// Parameter schema
    #[serde(default)]
    pub parameters: ToolParameters,
}

/// A tool as returned by discovery
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Platform identifier of the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_uid: Option<String>,
    /// The tool's signature
    pub definition: ToolSignature,
}

impl ToolDefinition {
    /// Tool name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Tool description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.definition.description
    }
}

/// Callee and serialized arguments of a tool call
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallDetails {
    /// Name of the tool to invoke
    pub name: String,
    /// Arguments as an opaque serialized payload
    pub arguments: String,
}

/// A request to invoke one tool, correlated to its result by `id`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    /// Correlation identifier
    pub id: String,
    /// Invocation kind tag, normally `function`
    #[serde(rename = "type")]
    pub kind: String,
    /// Callee and arguments
    pub details: ToolCallDetails,
}

impl ToolCall {
    /// Create a `function` tool call
    #[must_use]
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: "function".to_string(),
            details: ToolCallDetails {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Successful tool output
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecOutput {
    /// Output payload
    pub content: String,
    /// Content type of the payload (`text`, `json`, ...)
    pub content_type: String,
}

/// Failed tool execution
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Opaque details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Kind of credential an authentication challenge asks for
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationType {
    /// OAuth flow
    Oauth,
    /// Username and password
    Basic,
    /// Public/private key pair
    KeyPair,
    /// Static API key
    ApiKey,
    /// JSON web token
    Jwt,
    /// Anything the SDK does not recognize
    #[default]
    #[serde(other)]
    Unknown,
}

/// A server-issued request for interactive authentication
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationChallenge {
    /// Connection needing credentials
    pub connection_uid: String,
    /// Identifier of this authentication request
    pub request_uid: String,
    /// One-time secret for this request
    pub request_secret: String,
    /// Kind of credential requested
    #[serde(default)]
    pub authentication_type: AuthenticationType,
    /// Provider-specific settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    /// Field schema for credential entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
}

/// Challenges bundled in one auth-request result
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthRequests {
    /// Pending challenges, in server order
    #[serde(default)]
    pub requests: Vec<AuthenticationChallenge>,
}

/// Variant-specific payload of an execution result
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ExecutionPayload {
    /// Tool produced output
    ExecOutput(ExecOutput),
    /// Tool failed
    Error(ExecError),
    /// Tool needs authentication first
    AuthRequest(AuthRequests),
}

/// One entry of the execution endpoint's result list
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Originating tool call
    pub tool_call_id: String,
    /// Platform identifier of the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_uid: Option<String>,
    /// Result variant
    #[serde(flatten)]
    pub payload: ExecutionPayload,
}

impl ExecutionResult {
    /// Output result for `tool_call_id`
    #[must_use]
    pub fn output(
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_uid: None,
            payload: ExecutionPayload::ExecOutput(ExecOutput {
                content: content.into(),
                content_type: content_type.into(),
            }),
        }
    }

    /// Output payload, if this is an output result
    #[must_use]
    pub const fn as_output(&self) -> Option<&ExecOutput> {
        match &self.payload {
            ExecutionPayload::ExecOutput(output) => Some(output),
            _ => None,
        }
    }

    /// Whether this is an output result
    #[must_use]
    pub const fn is_output(&self) -> bool {
        matches!(self.payload, ExecutionPayload::ExecOutput(_))
    }
}

/// State of an authentication request as reported by the status endpoint
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationStatus {
    /// Still waiting on the user
    Requested,
    /// Completed successfully
    Authenticated,
    /// The request expired
    Expired,
    /// The flow failed
    Error,
}

impl AuthenticationStatus {
    /// Whether polling can stop
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Requested)
    }

    /// Whether this is a terminal failure
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Expired | Self::Error)
    }
}

impl fmt::Display for AuthenticationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Expired => write!(f, "expired"),
            Self::Error => write!(f, "error"),
        }
    }
}

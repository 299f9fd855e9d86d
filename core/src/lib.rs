//! # Toolbridge Core
//!
//! Canonical data model and provider adapters for the toolbridge SDK.
//!
//! The SDK talks to a remote agent platform that exposes *tools* (callable
//! functions) behind a bridge identifier. This crate holds everything that is
//! pure data transformation:
//!
//! - [`model`]: tool definitions, tool calls, execution results, authentication
//!   challenges and statuses, metadata, authentication scope
//! - [`error`]: the uniform [`SdkError`] shape surfaced to callers
//! - [`provider`]: the [`Provider`] capability trait and its implementations
//!   ([`Native`] pass-through and [`OpenAi`])
//! - [`openai`]: OpenAI chat-completion wire types used by the [`OpenAi`] provider
//!
//! Transport and orchestration live in `toolbridge-transport` and `toolbridge`.
//!
//! ## Example
//!
//! ```
//! use toolbridge_core::{OpenAi, Provider, ToolDefinition};
//!
//! let definition: ToolDefinition = serde_json::from_value(serde_json::json!({
//!     "definition": {
//!         "name": "lookup_user",
//!         "description": "Find a user by email",
//!         "parameters": {
//!             "properties": [{"name": "email", "type": "string", "description": "User email"}],
//!             "required": ["email"]
//!         }
//!     }
//! })).unwrap();
//!
//! let tools = OpenAi.tools(&[definition]);
//! assert_eq!(tools[0].function.name, "lookup_user");
//! ```

pub mod error;
pub mod model;
pub mod openai;
pub mod provider;

pub use error::SdkError;
pub use model::{
    AuthRequests, Authentication, AuthenticationChallenge, AuthenticationStatus,
    AuthenticationType, ExecError, ExecOutput, ExecutionPayload, ExecutionResult, KeyValuePair,
    Message, ToolCall, ToolCallDetails, ToolDefinition, ToolParameter, ToolParameters,
    ToolSignature,
};
pub use provider::{Native, OpenAi, Provider, ProviderKind};

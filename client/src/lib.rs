//! # Toolbridge
//!
//! Client for a remote agent platform's tools: discover them, execute the
//! tool calls a language model asks for, and get the results back in the
//! shape the model's provider expects.
//!
//! Tool executions may be blocked on interactive authentication. The client
//! hands each challenge to a registered handler, waits for it to resolve
//! (typically by opening a landing page and polling the authentication
//! module), then resubmits the same request.
//!
//! ## Modules
//!
//! - [`config`]: [`ClientConfig`] from builders, environment or TOML
//! - [`client`]: [`ToolBridgeClient`] construction and tool discovery
//! - [`orchestrator`]: tool execution and the authentication round loop
//! - [`auth`]: events, single-shot completions, the status poller
//! - [`error`]: [`ToolBridgeError`]
//!
//! ## Example
//!
//! ```no_run
//! use toolbridge::{ClientConfig, Native, ToolBridgeClient, ToolCall};
//!
//! # async fn example() -> Result<(), toolbridge::ToolBridgeError> {
//! let config = ClientConfig::new("api-key")
//!     .with_base_url("https://platform.example.com")
//!     .with_auth_mod_base_url("https://auth.example.com");
//! let mut client = ToolBridgeClient::new(config, Native)?;
//!
//! client.on_authentication_request(|event| {
//!     let poller = event.poller.clone();
//!     poller.handle_authentication_request(event, &|url: &str| println!("Sign in at {url}"));
//! });
//!
//! let calls = vec![ToolCall::function("1", "lookup_user", r#"{"email":"bob@example.com"}"#)];
//! for result in client.run_tools("bridge-1", None, &calls).await? {
//!     println!("{}: {:?}", result.tool_call_id, result.as_output());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;

pub use auth::{
    AuthCompletion, AuthOutcome, AuthenticationPoller, AuthenticationRequestEvent, ChallengeKey,
    LandingPageOpener, PollStep, SdkEvent, SdkEventType,
};
pub use client::ToolBridgeClient;
pub use config::{ClientConfig, ConfigError};
pub use error::ToolBridgeError;
pub use orchestrator::NATIVE_TOOL_CALL_ID;

pub use toolbridge_core::{
    Authentication, AuthenticationChallenge, AuthenticationStatus, ExecutionPayload,
    ExecutionResult, KeyValuePair, Message, Native, OpenAi, Provider, ProviderKind, SdkError,
    ToolCall, ToolDefinition,
};
pub use toolbridge_transport::{HttpTransport, Transport, TransportError};

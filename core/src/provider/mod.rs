//! Provider adapters
//!
//! A provider is the LLM ecosystem whose native tool declarations, assistant
//! turns and tool result messages the canonical model is translated to and from.
//! Each provider is one [`Provider`] implementation, chosen when the client is
//! built, so no call site branches on a provider tag.
//!
//! - [`Native`]: pass-through, the canonical types are the provider types
//! - [`OpenAi`]: OpenAI chat completions

mod native;
mod openai;

pub use native::Native;
pub use openai::OpenAi;

use crate::model::{ExecutionResult, ToolCall, ToolDefinition};
use serde::Serialize;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Bidirectional mapping between canonical and provider-native shapes
pub trait Provider: Send + Sync + 'static {
    /// Tool declaration shape handed to the model
    type Tool: Serialize + Clone + Send + Sync + fmt::Debug;
    /// Conversation message shape forwarded with requests
    type Message: Serialize + Clone + Send + Sync + fmt::Debug;
    /// Assistant turn the tool calls are extracted from
    type Completion: ?Sized + Sync;
    /// Tool result message shape handed back to the model
    type ToolMessage: Clone + Send + fmt::Debug;

    /// Tag identifying this provider
    fn kind(&self) -> ProviderKind;

    /// Map discovered tool definitions to tool declarations
    fn tools(&self, definitions: &[ToolDefinition]) -> Vec<Self::Tool>;

    /// Extract canonical tool calls from an assistant turn
    ///
    /// An empty list means no tool invocation was requested.
    fn tool_calls(&self, completion: &Self::Completion) -> Vec<ToolCall>;

    /// Map output results to tool result messages; other variants are dropped
    fn tool_messages(&self, results: Vec<ExecutionResult>) -> Vec<Self::ToolMessage>;
}

/// Provider tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Pass-through
    Native,
    /// OpenAI chat completions
    OpenAi,
}

impl FromStr for ProviderKind {
    type Err = Infallible;

    /// Unrecognized tags resolve to the pass-through provider
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "native" | "gentoro" | "" => Ok(Self::Native),
            other => {
                tracing::warn!(provider = other, "Unrecognized provider tag, passing data through");
                Ok(Self::Native)
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_tag_parsing() {
        assert_eq!("openai".parse(), Ok(ProviderKind::OpenAi));
        assert_eq!("OpenAI".parse(), Ok(ProviderKind::OpenAi));
        assert_eq!("native".parse(), Ok(ProviderKind::Native));
        assert_eq!("vercel".parse(), Ok(ProviderKind::Native));
    }
}

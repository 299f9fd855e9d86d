//! OpenAI chat-completion wire types
//!
//! Only the parts the [`OpenAi`](crate::OpenAi) provider reads or produces:
//! tool declarations, assistant tool calls inside a completion, and tool
//! result messages.

use serde::{Deserialize, Serialize};

/// Finish reason signalling that the assistant wants tools invoked
pub const FINISH_REASON_TOOL_CALLS: &str = "tool_calls";

/// Tool declaration passed in a chat-completion request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionTool {
    /// Always `function`
    #[serde(rename = "type")]
    pub kind: String,
    /// Function signature
    pub function: FunctionDefinition,
}

/// Function signature with a JSON schema for its parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// What the function does
    pub description: String,
    /// JSON schema object (`type`, `properties`, `required`)
    pub parameters: serde_json::Value,
}

/// A chat completion returned by the model
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    /// Completion identifier
    #[serde(default)]
    pub id: String,
    /// Model that produced the completion
    #[serde(default)]
    pub model: String,
    /// Candidate choices; only the first is inspected
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One candidate in a completion
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Index of this choice
    #[serde(default)]
    pub index: u32,
    /// Why generation stopped (`stop`, `tool_calls`, `length`, ...)
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// The assistant turn
    pub message: AssistantMessage,
}

/// Assistant turn inside a choice
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AssistantMessage {
    /// Always `assistant`
    #[serde(default)]
    pub role: String,
    /// Text content, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Requested tool calls, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatCompletionToolCall>>,
}

/// Tool call requested by the assistant
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatCompletionToolCall {
    /// Call identifier, echoed back in the tool message
    pub id: String,
    /// Always `function`
    #[serde(rename = "type")]
    pub kind: String,
    /// Function name and JSON-encoded arguments
    pub function: FunctionCall,
}

/// Function name and JSON-encoded arguments
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Arguments as a JSON string
    pub arguments: String,
}

/// Tool result message sent back to the model
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatCompletionToolMessage {
    /// Always `tool`
    pub role: String,
    /// Call this message answers
    pub tool_call_id: String,
    /// Content parts
    pub content: Vec<ContentPartText>,
}

/// Text content part
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentPartText {
    /// Always `text`
    #[serde(rename = "type")]
    pub kind: String,
    /// The text
    pub text: String,
}

impl ChatCompletionToolMessage {
    /// Tool message carrying `text` for `tool_call_id`
    ///
    /// The part type is always `text`. An output's `contentType` is not
    /// forwarded, since OpenAI only accepts `text` parts in tool messages.
    #[must_use]
    pub fn text(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            tool_call_id: tool_call_id.into(),
            content: vec![ContentPartText {
                kind: "text".to_string(),
                text: text.into(),
            }],
        }
    }
}

use super::{Provider, ProviderKind};
use crate::model::{ExecutionResult, Message, ToolCall, ToolDefinition};

/// Pass-through provider: callers work with the canonical types directly
#[derive(Clone, Copy, Debug, Default)]
pub struct Native;

impl Provider for Native {
    type Tool = ToolDefinition;
    type Message = Message;
    type Completion = [ToolCall];
    type ToolMessage = ExecutionResult;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Native
    }

    fn tools(&self, definitions: &[ToolDefinition]) -> Vec<ToolDefinition> {
        definitions.to_vec()
    }

    fn tool_calls(&self, completion: &[ToolCall]) -> Vec<ToolCall> {
        completion.to_vec()
    }

    fn tool_messages(&self, results: Vec<ExecutionResult>) -> Vec<ExecutionResult> {
        results.into_iter().filter(ExecutionResult::is_output).collect()
    }
}

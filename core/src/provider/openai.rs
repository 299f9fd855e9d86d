use super::{Provider, ProviderKind};
use crate::model::{ExecutionResult, ToolCall, ToolCallDetails, ToolDefinition};
use crate::openai::{
    ChatCompletion, ChatCompletionTool, ChatCompletionToolMessage, FINISH_REASON_TOOL_CALLS,
    FunctionDefinition,
};
use serde_json::{Map, Value, json};

/// OpenAI chat-completions provider
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenAi;

impl OpenAi {
    /// Flatten the ordered parameter list into a name-keyed JSON schema
    fn parameters_schema(definition: &ToolDefinition) -> Value {
        let properties: Map<String, Value> = definition
            .definition
            .parameters
            .properties
            .iter()
            .map(|parameter| {
                (
                    parameter.name.clone(),
                    json!({
                        "type": parameter.kind,
                        "description": parameter.description,
                    }),
                )
            })
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": definition.definition.parameters.required,
        })
    }
}

impl Provider for OpenAi {
    type Tool = ChatCompletionTool;
    type Message = Value;
    type Completion = ChatCompletion;
    type ToolMessage = ChatCompletionToolMessage;

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn tools(&self, definitions: &[ToolDefinition]) -> Vec<ChatCompletionTool> {
        definitions
            .iter()
            .map(|definition| ChatCompletionTool {
                kind: "function".to_string(),
                function: FunctionDefinition {
                    name: definition.name().to_string(),
                    description: definition.description().to_string(),
                    parameters: Self::parameters_schema(definition),
                },
            })
            .collect()
    }

    fn tool_calls(&self, completion: &ChatCompletion) -> Vec<ToolCall> {
        let Some(choice) = completion.choices.first() else {
            return Vec::new();
        };
        if choice.finish_reason.as_deref() != Some(FINISH_REASON_TOOL_CALLS) {
            return Vec::new();
        }

        choice
            .message
            .tool_calls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|call| ToolCall {
                id: call.id.clone(),
                kind: call.kind.clone(),
                details: ToolCallDetails {
                    name: call.function.name.clone(),
                    arguments: call.function.arguments.clone(),
                },
            })
            .collect()
    }

    fn tool_messages(&self, results: Vec<ExecutionResult>) -> Vec<ChatCompletionToolMessage> {
        results
            .into_iter()
            .filter_map(|result| {
                result
                    .as_output()
                    .map(|output| ChatCompletionToolMessage::text(&result.tool_call_id, &output.content))
            })
            .collect()
    }
}

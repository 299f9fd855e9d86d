//! Tool execution orchestration
//!
//! One `run_tools` call drives this loop:
//!
//! ```text
//! normalize ─► submit ─► classify ─┬─► errors          ─► Err(Execution)
//!                 ▲                ├─► outputs only    ─► Ok(tool messages)
//!                 │                └─► auth requests   ─► authenticate ─┐
//!                 └───────────── same request ◄─────── all resolved ────┘
//! ```
//!
//! Challenges are dispatched one at a time in server order to the first
//! authentication handler; the next one is only dispatched once the previous
//! completion reports success. An abort or a failure status ends the run.

use crate::auth::{AuthCompletion, AuthOutcome, AuthenticationRequestEvent, SdkEvent, SdkEventType};
use crate::client::{RequestContext, ToolBridgeClient};
use crate::error::ToolBridgeError;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbridge_core::error::{AUTHENTICATION_ABORTED, AUTHENTICATION_REQUIRED};
use toolbridge_core::{
    Authentication, AuthenticationChallenge, ExecutionPayload, ExecutionResult, KeyValuePair,
    Provider, SdkError, ToolCall,
};
use toolbridge_transport::send;

/// Tool call id used by [`ToolBridgeClient::run_tool_natively`]
pub const NATIVE_TOOL_CALL_ID: &str = "native";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunToolsRequest<'a, M> {
    context: RequestContext<'a, M>,
    messages: &'a [M],
    authentication: &'a Authentication,
    metadata: &'a [KeyValuePair],
    tool_calls: &'a [ToolCall],
}

#[derive(Deserialize)]
struct RunToolsResponse {
    #[serde(default)]
    results: Vec<ExecutionResult>,
}

/// What one execution round produced
#[derive(Debug, PartialEq)]
enum Round {
    Completed(Vec<ExecutionResult>),
    Failed(Vec<SdkError>),
    NeedsAuthentication(Vec<ExecutionResult>),
}

/// Errors win over challenges, challenges win over outputs
fn classify(results: Vec<ExecutionResult>) -> Round {
    let errors: Vec<SdkError> = results
        .iter()
        .filter_map(|result| match &result.payload {
            ExecutionPayload::Error(error) => Some(SdkError::from(error.clone())),
            _ => None,
        })
        .collect();
    if !errors.is_empty() {
        return Round::Failed(errors);
    }

    let (auth_requests, outputs): (Vec<_>, Vec<_>) = results
        .into_iter()
        .partition(|result| matches!(result.payload, ExecutionPayload::AuthRequest(_)));
    if auth_requests.is_empty() {
        Round::Completed(outputs)
    } else {
        Round::NeedsAuthentication(auth_requests)
    }
}

/// A challenge with the tool call that raised it
#[derive(Debug, PartialEq)]
struct PendingChallenge {
    tool_call_id: String,
    tool_uid: Option<String>,
    challenge: AuthenticationChallenge,
}

/// Result order, then order within each result
fn flatten(auth_requests: Vec<ExecutionResult>) -> Vec<PendingChallenge> {
    auth_requests
        .into_iter()
        .flat_map(|result| {
            let ExecutionResult {
                tool_call_id,
                tool_uid,
                payload,
            } = result;
            let requests = match payload {
                ExecutionPayload::AuthRequest(requests) => requests.requests,
                _ => Vec::new(),
            };
            requests.into_iter().map(move |challenge| PendingChallenge {
                tool_call_id: tool_call_id.clone(),
                tool_uid: tool_uid.clone(),
                challenge,
            })
        })
        .collect()
}

impl<P: Provider> ToolBridgeClient<P> {
    /// Execute the tool calls in `completion` and map the outputs back to
    /// provider tool messages
    ///
    /// Authentication challenges raised along the way are handed to the
    /// registered handler; once all are satisfied the identical request is
    /// submitted again.
    ///
    /// # Errors
    ///
    /// - `Execution` with every error result if any tool failed
    /// - `AuthenticationRequired` if challenges arrived and no handler is registered
    /// - `AuthenticationAborted` / `AuthenticationFailed` if a challenge did not succeed
    /// - `Runtime` if a submission failed at the transport level
    #[tracing::instrument(skip(self, messages, completion), name = "run_tools")]
    pub async fn run_tools(
        &self,
        bridge_uid: &str,
        messages: Option<&[P::Message]>,
        completion: &P::Completion,
    ) -> Result<Vec<P::ToolMessage>, ToolBridgeError> {
        let tool_calls = self.provider.tool_calls(completion);
        if tool_calls.is_empty() {
            tracing::debug!("No tool calls requested");
            return Ok(Vec::new());
        }

        let outputs = self
            .execute(bridge_uid, messages.unwrap_or_default(), &tool_calls)
            .await?;
        Ok(self.provider.tool_messages(outputs))
    }

    /// Run a single tool by name, bypassing provider mapping
    ///
    /// Arguments are `params` serialized as JSON, or `{}` when absent. Returns
    /// the first output result, if the platform produced one.
    ///
    /// # Errors
    ///
    /// Same as [`run_tools`](Self::run_tools)
    #[tracing::instrument(skip(self, params), name = "run_tool_natively")]
    pub async fn run_tool_natively(
        &self,
        bridge_uid: &str,
        tool_name: &str,
        params: Option<&Value>,
    ) -> Result<Option<ExecutionResult>, ToolBridgeError> {
        let arguments = params.map_or_else(|| "{}".to_string(), Value::to_string);
        let tool_call = ToolCall::function(NATIVE_TOOL_CALL_ID, tool_name, arguments);
        let outputs = self.execute(bridge_uid, &[], &[tool_call]).await?;
        Ok(outputs.into_iter().next())
    }

    async fn execute(
        &self,
        bridge_uid: &str,
        messages: &[P::Message],
        tool_calls: &[ToolCall],
    ) -> Result<Vec<ExecutionResult>, ToolBridgeError> {
        counter!("toolbridge.runs").increment(1);
        let path = format!("/bornio/v1/inference/{bridge_uid}/runtools");
        let request = RunToolsRequest {
            context: RequestContext {
                bridge_uid,
                messages,
            },
            messages,
            authentication: &self.authentication,
            metadata: &self.metadata,
            tool_calls,
        };

        let mut round = 1_u32;
        loop {
            tracing::debug!(round, tool_calls = tool_calls.len(), "Submitting tool calls");
            let response: RunToolsResponse = send(self.transport.as_ref(), &path, &request)
                .await
                .map_err(|e| ToolBridgeError::runtime(&e))?;

            match classify(response.results) {
                Round::Completed(outputs) => return Ok(outputs),
                Round::Failed(errors) => {
                    tracing::warn!(errors = errors.len(), "Tool execution failed");
                    return Err(ToolBridgeError::Execution(errors));
                }
                Round::NeedsAuthentication(auth_requests) => {
                    self.authenticate(auth_requests).await?;
                }
            }
            round += 1;
        }
    }

    async fn authenticate(&self, auth_requests: Vec<ExecutionResult>) -> Result<(), ToolBridgeError> {
        let Some(handler) = self.listeners.first(SdkEventType::AuthenticationRequest) else {
            let details = details_json(&auth_requests);
            return Err(ToolBridgeError::AuthenticationRequired(
                SdkError::new(
                    AUTHENTICATION_REQUIRED,
                    "Tool execution requires authentication, and no listener is registered to handle it",
                )
                .with_details(details),
            ));
        };

        for pending in flatten(auth_requests) {
            counter!("toolbridge.auth_challenges").increment(1);
            let details = details_json(&pending.challenge);
            tracing::info!(
                tool_call_id = %pending.tool_call_id,
                connection_uid = %pending.challenge.connection_uid,
                request_uid = %pending.challenge.request_uid,
                "Dispatching authentication request"
            );

            let (completion, outcome) = AuthCompletion::channel();
            (*handler)(SdkEvent::AuthenticationRequest(AuthenticationRequestEvent {
                tool_call_id: pending.tool_call_id,
                tool_uid: pending.tool_uid,
                challenge: pending.challenge,
                completion,
                poller: self.poller.clone(),
            }));

            match outcome.await.unwrap_or(AuthOutcome::Aborted) {
                AuthOutcome::Authenticated => {}
                AuthOutcome::Aborted => {
                    return Err(ToolBridgeError::AuthenticationAborted(
                        SdkError::new(
                            AUTHENTICATION_ABORTED,
                            "Authentication request was aborted by the listener",
                        )
                        .with_details(details),
                    ));
                }
                AuthOutcome::Failed { status, error } => {
                    tracing::warn!(%status, code = %error.code, "Authentication failed");
                    return Err(ToolBridgeError::AuthenticationFailed { status, error });
                }
            }
        }
        Ok(())
    }
}

/// JSON form of `value` for an error's `details`, empty if it cannot be serialized
fn details_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|error| {
        tracing::warn!(error = %error, "Could not serialize error details");
        String::new()
    })
}

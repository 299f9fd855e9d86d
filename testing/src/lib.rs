//! # Toolbridge Testing
//!
//! Testing utilities for the toolbridge SDK.
//!
//! This crate provides:
//! - [`mocks::MockTransport`]: scripted responses per endpoint, recorded requests
//! - [`fixtures`]: wire-form (snake_case) response bodies
//! - [`properties`]: proptest strategies for execution batches
//! - [`init_tracing`]: test-friendly log output
//!
//! ## Example
//!
//! ```
//! use toolbridge_testing::{MockTransport, fixtures};
//!
//! let transport = MockTransport::new();
//! transport.respond(
//!     "/bornio/v1/inference/b/runtools",
//!     fixtures::run_tools_response(vec![fixtures::output_result("1", "done")]),
//! );
//! assert_eq!(transport.pending("/bornio/v1/inference/b/runtools"), 1);
//! ```

/// Mock implementations of the SDK's seams
pub mod mocks {
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use toolbridge_transport::{Transport, TransportError};

    /// A request seen by [`MockTransport`]
    #[derive(Clone, Debug, PartialEq)]
    pub struct RecordedRequest {
        /// Endpoint path
        pub path: String,
        /// Wire-form body
        pub body: Value,
    }

    #[derive(Default)]
    struct Script {
        responses: HashMap<String, VecDeque<Result<Value, TransportError>>>,
        requests: Vec<RecordedRequest>,
    }

    /// Transport answering from per-path response queues
    ///
    /// Each request pops the next scripted response for its path. A path
    /// with nothing left answers with `TransportError::RequestFailed`.
    #[derive(Default)]
    pub struct MockTransport {
        script: Mutex<Script>,
    }

    impl MockTransport {
        /// Transport with nothing scripted
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a successful wire-form response for `path`
        pub fn respond(&self, path: &str, body: Value) -> &Self {
            self.enqueue(path, Ok(body))
        }

        /// Queue a failure for `path`
        pub fn fail(&self, path: &str, error: TransportError) -> &Self {
            self.enqueue(path, Err(error))
        }

        /// Every request in arrival order
        #[must_use]
        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.lock().requests.clone()
        }

        /// Bodies of the requests sent to `path`, in arrival order
        #[must_use]
        pub fn requests_to(&self, path: &str) -> Vec<Value> {
            self.lock()
                .requests
                .iter()
                .filter(|request| request.path == path)
                .map(|request| request.body.clone())
                .collect()
        }

        /// Number of scripted responses not yet consumed for `path`
        #[must_use]
        pub fn pending(&self, path: &str) -> usize {
            self.lock().responses.get(path).map_or(0, VecDeque::len)
        }

        fn enqueue(&self, path: &str, response: Result<Value, TransportError>) -> &Self {
            self.lock()
                .responses
                .entry(path.to_string())
                .or_default()
                .push_back(response);
            self
        }

        fn lock(&self) -> MutexGuard<'_, Script> {
            self.script.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
            let mut script = self.lock();
            script.requests.push(RecordedRequest {
                path: path.to_string(),
                body,
            });
            script
                .responses
                .get_mut(path)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| {
                    Err(TransportError::RequestFailed(format!(
                        "no scripted response for {path}"
                    )))
                })
        }
    }

    /// Records landing page URLs instead of opening them
    #[derive(Debug, Default)]
    pub struct RecordingOpener {
        urls: Mutex<Vec<String>>,
    }

    impl RecordingOpener {
        /// Opener with nothing recorded
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Record `url` as opened
        pub fn open(&self, url: &str) {
            self.urls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(url.to_string());
        }

        /// URLs opened so far
        #[must_use]
        pub fn urls(&self) -> Vec<String> {
            self.urls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }
}

/// Wire-form response bodies, as the platform sends them
pub mod fixtures {
    use serde_json::{Value, json};

    /// Execution endpoint for `bridge_uid`
    #[must_use]
    pub fn run_tools_path(bridge_uid: &str) -> String {
        format!("/bornio/v1/inference/{bridge_uid}/runtools")
    }

    /// Discovery endpoint for `bridge_uid`
    #[must_use]
    pub fn retrieve_tools_path(bridge_uid: &str) -> String {
        format!("/bornio/v1/inference/{bridge_uid}/retrievetools")
    }

    /// Authentication status endpoint
    pub const STATUS_PATH: &str = "/authmod/v1/request/status";

    /// Output result
    #[must_use]
    pub fn output_result(tool_call_id: &str, content: &str) -> Value {
        json!({
            "tool_call_id": tool_call_id,
            "type": "exec_output",
            "data": {"content": content, "content_type": "text"}
        })
    }

    /// Error result
    #[must_use]
    pub fn error_result(tool_call_id: &str, code: &str, message: &str) -> Value {
        json!({
            "tool_call_id": tool_call_id,
            "type": "error",
            "data": {"code": code, "message": message}
        })
    }

    /// Auth-request result carrying `challenges` in order
    #[must_use]
    pub fn auth_request_result(tool_call_id: &str, challenges: Vec<Value>) -> Value {
        json!({
            "tool_call_id": tool_call_id,
            "tool_uid": format!("uid-{tool_call_id}"),
            "type": "auth_request",
            "data": {"requests": challenges}
        })
    }

    /// OAuth challenge
    #[must_use]
    pub fn challenge(connection_uid: &str, request_uid: &str) -> Value {
        json!({
            "connection_uid": connection_uid,
            "request_uid": request_uid,
            "request_secret": format!("secret-{request_uid}"),
            "authentication_type": "oauth",
            "settings": null
        })
    }

    /// Execution response
    #[must_use]
    pub fn run_tools_response(results: Vec<Value>) -> Value {
        json!({ "results": results })
    }

    /// Tool definition with string parameters, all required
    #[must_use]
    pub fn tool(name: &str, description: &str, parameters: &[(&str, &str)]) -> Value {
        let properties: Vec<Value> = parameters
            .iter()
            .map(|(name, description)| json!({"name": name, "type": "string", "description": description}))
            .collect();
        let required: Vec<&str> = parameters.iter().map(|(name, _)| *name).collect();
        json!({
            "tool_uid": format!("uid-{name}"),
            "definition": {
                "name": name,
                "description": description,
                "parameters": {"properties": properties, "required": required}
            }
        })
    }

    /// Discovery response
    #[must_use]
    pub fn tools_response(tools: Vec<Value>) -> Value {
        json!({ "tools": tools })
    }

    /// Status response without error info
    #[must_use]
    pub fn status_response(result: &str) -> Value {
        json!({ "result": result, "info": null })
    }

    /// Status response with error info
    #[must_use]
    pub fn status_failure(result: &str, code: &str, message: &str, stack_trace: &str) -> Value {
        json!({
            "result": result,
            "info": {"code": code, "message": message, "stack_trace": stack_trace}
        })
    }
}

/// Property-based testing utilities using proptest
pub mod properties {
    use proptest::prelude::*;
    use serde_json::Value;

    /// One entry of a generated execution batch
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ResultKind {
        /// Output result
        Output,
        /// Error result with this code
        Error(String),
        /// Auth-request result
        AuthRequest,
    }

    /// Execution batches mixing outputs, errors and auth requests
    pub fn result_batch() -> impl Strategy<Value = Vec<ResultKind>> {
        let kind = prop_oneof![
            Just(ResultKind::Output),
            "[A-Z]{3,8}".prop_map(ResultKind::Error),
            Just(ResultKind::AuthRequest),
        ];
        prop::collection::vec(kind, 1..8)
    }

    /// Wire-form results for `batch`; tool call ids are positions
    #[must_use]
    pub fn wire_results(batch: &[ResultKind]) -> Vec<Value> {
        batch
            .iter()
            .enumerate()
            .map(|(index, kind)| {
                let id = index.to_string();
                match kind {
                    ResultKind::Output => super::fixtures::output_result(&id, "ok"),
                    ResultKind::Error(code) => super::fixtures::error_result(&id, code, "failed"),
                    ResultKind::AuthRequest => super::fixtures::auth_request_result(
                        &id,
                        vec![super::fixtures::challenge("conn", &id)],
                    ),
                }
            })
            .collect()
    }

    /// Error codes of `batch`, in order
    #[must_use]
    pub fn error_codes(batch: &[ResultKind]) -> Vec<String> {
        batch
            .iter()
            .filter_map(|kind| match kind {
                ResultKind::Error(code) => Some(code.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Route `tracing` output through the test harness
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{MockTransport, RecordedRequest, RecordingOpener};

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use serde_json::json;
    use toolbridge_transport::{Transport, TransportError};

    #[tokio::test]
    async fn test_responses_pop_in_order_per_path() {
        let transport = MockTransport::new();
        transport
            .respond("/a", json!({"n": 1}))
            .respond("/a", json!({"n": 2}))
            .fail("/b", TransportError::Unauthorized);

        assert_eq!(transport.post("/a", json!({})).await.unwrap(), json!({"n": 1}));
        assert_eq!(transport.post("/b", json!({})).await, Err(TransportError::Unauthorized));
        assert_eq!(transport.post("/a", json!({"x": true})).await.unwrap(), json!({"n": 2}));
        assert!(matches!(
            transport.post("/a", json!({})).await,
            Err(TransportError::RequestFailed(_))
        ));

        assert_eq!(transport.requests().len(), 4);
        assert_eq!(transport.requests_to("/a")[1], json!({"x": true}));
    }

    #[test]
    fn test_error_codes_follow_batch_order() {
        let batch = vec![
            properties::ResultKind::Error("B".to_string()),
            properties::ResultKind::Output,
            properties::ResultKind::Error("A".to_string()),
        ];
        assert_eq!(properties::error_codes(&batch), vec!["B", "A"]);
        assert_eq!(properties::wire_results(&batch).len(), 3);
    }
}

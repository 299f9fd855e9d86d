//! Execution orchestration against a scripted transport

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use proptest::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use toolbridge::{
    AuthCompletion, AuthenticationStatus, ClientConfig, ExecutionResult, Message, Native, OpenAi,
    Provider, SdkError, ToolBridgeClient, ToolBridgeError, ToolCall,
};
use toolbridge_core::error::{AUTHENTICATION_ABORTED, AUTHENTICATION_REQUIRED, RUNTIME_ERROR};
use toolbridge_core::openai::ChatCompletion;
use toolbridge_testing::fixtures::{
    auth_request_result, challenge, error_result, output_result, run_tools_path,
    run_tools_response,
};
use toolbridge_testing::{MockTransport, init_tracing, properties};

const BRIDGE: &str = "bridge-1";

fn client<P: Provider>(transport: &Arc<MockTransport>, provider: P) -> ToolBridgeClient<P> {
    init_tracing();
    let config = ClientConfig::new("test-key")
        .with_auth_mod_base_url("https://auth.example.com")
        .with_poll_interval(Duration::from_millis(500));
    ToolBridgeClient::with_transport(config, provider, transport.clone()).unwrap()
}

fn calls() -> Vec<ToolCall> {
    vec![
        ToolCall::function("1", "lookup_user", r#"{"email":"bob@example.com"}"#),
        ToolCall::function("2", "list_orders", "{}"),
    ]
}

/// Handler that records dispatched request uids and authenticates immediately
fn authenticating_handler(
    client: &mut ToolBridgeClient<Native>,
) -> Arc<Mutex<Vec<String>>> {
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&dispatched);
    client.on_authentication_request(move |event| {
        seen.lock().unwrap().push(event.challenge.request_uid.clone());
        event.completion.authenticated();
    });
    dispatched
}

#[tokio::test]
async fn test_empty_tool_calls_resolve_without_network() {
    let transport = Arc::new(MockTransport::new());

    let native = client(&transport, Native);
    assert!(native.run_tools(BRIDGE, None, &[]).await.unwrap().is_empty());

    let openai = client(&transport, OpenAi);
    let stop: ChatCompletion = serde_json::from_value(json!({
        "choices": [{"finish_reason": "stop", "message": {"role": "assistant", "content": "Hi"}}]
    }))
    .unwrap();
    assert!(openai.run_tools(BRIDGE, None, &stop).await.unwrap().is_empty());

    let no_calls: ChatCompletion = serde_json::from_value(json!({
        "choices": [{"finish_reason": "tool_calls", "message": {"role": "assistant", "tool_calls": []}}]
    }))
    .unwrap();
    assert!(openai.run_tools(BRIDGE, None, &no_calls).await.unwrap().is_empty());

    assert!(openai.run_tools(BRIDGE, None, &ChatCompletion::default()).await.unwrap().is_empty());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_request_carries_context_scope_and_metadata() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(
        &run_tools_path(BRIDGE),
        run_tools_response(vec![output_result("1", "bob"), output_result("2", "[]")]),
    );

    let mut client = client(&transport, Native);
    client
        .metadata("tenant", Some("acme".to_string()))
        .metadata("tenant", None);

    let history = [Message::user("Who is bob?")];
    let results = client.run_tools(BRIDGE, Some(&history[..]), &calls()).await.unwrap();
    assert_eq!(results.len(), 2);

    let body = &transport.requests_to(&run_tools_path(BRIDGE))[0];
    assert_eq!(body["context"]["bridge_uid"], BRIDGE);
    assert_eq!(body["context"]["messages"][0]["content"], "Who is bob?");
    assert_eq!(body["messages"], body["context"]["messages"]);
    assert_eq!(body["authentication"], json!({"scope": "api_key"}));
    assert_eq!(
        body["metadata"],
        json!([{"key": "tenant", "value": "acme"}, {"key": "tenant", "value": null}])
    );
    assert_eq!(body["tool_calls"][0]["type"], "function");
    assert_eq!(body["tool_calls"][0]["details"]["name"], "lookup_user");
}

#[tokio::test]
async fn test_errors_reject_with_exactly_the_error_batch() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(
        &run_tools_path(BRIDGE),
        run_tools_response(vec![
            output_result("1", "bob"),
            error_result("2", "NOT_FOUND", "no orders"),
            auth_request_result("3", vec![challenge("conn-1", "req-1")]),
            error_result("4", "TIMEOUT", "too slow"),
        ]),
    );

    let mut client = client(&transport, Native);
    let dispatched = authenticating_handler(&mut client);

    let error = client.run_tools(BRIDGE, None, &calls()).await.unwrap_err();
    let ToolBridgeError::Execution(errors) = error else {
        panic!("expected execution error, got {error:?}");
    };
    assert_eq!(
        errors,
        vec![
            SdkError::new("NOT_FOUND", "no orders"),
            SdkError::new("TIMEOUT", "too slow"),
        ]
    );
    assert!(dispatched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_challenges_dispatch_in_order_one_at_a_time() {
    let transport = Arc::new(MockTransport::new());
    let path = run_tools_path(BRIDGE);
    transport
        .respond(
            &path,
            run_tools_response(vec![
                auth_request_result("r1", vec![challenge("conn-a", "a1"), challenge("conn-a", "a2")]),
                auth_request_result("r2", vec![challenge("conn-b", "b1")]),
            ]),
        )
        .respond(&path, run_tools_response(vec![output_result("r1", "done"), output_result("r2", "done")]));

    let mut client = client(&transport, Native);
    let order = Arc::new(Mutex::new(Vec::new()));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    {
        let order = Arc::clone(&order);
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        client.on_authentication_request(move |event| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            order
                .lock()
                .unwrap()
                .push((event.tool_call_id.clone(), event.challenge.request_uid.clone()));
            let in_flight = Arc::clone(&in_flight);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                event.completion.authenticated();
            });
        });
    }

    let results = client.run_tools(BRIDGE, None, &calls()).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(
        *order.lock().unwrap(),
        vec![
            ("r1".to_string(), "a1".to_string()),
            ("r1".to_string(), "a2".to_string()),
            ("r2".to_string(), "b1".to_string()),
        ]
    );
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_waits_until_every_challenge_resolves() {
    let transport = Arc::new(MockTransport::new());
    let path = run_tools_path(BRIDGE);
    transport
        .respond(
            &path,
            run_tools_response(vec![auth_request_result("1", vec![challenge("conn-1", "req-1")])]),
        )
        .respond(&path, run_tools_response(vec![output_result("1", "bob")]));

    let mut client = client(&transport, Native);
    let (sender, mut completions) = mpsc::unbounded_channel::<AuthCompletion>();
    client.on_authentication_request(move |event| {
        sender.send(event.completion).unwrap();
    });

    let client = Arc::new(client);
    let run = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run_tools(BRIDGE, None, &calls()).await })
    };

    let completion = completions.recv().await.unwrap();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!run.is_finished());
    assert_eq!(transport.requests_to(&path).len(), 1);

    completion.authenticated();
    let results = run.await.unwrap().unwrap();
    assert_eq!(results, vec![ExecutionResult::output("1", "bob", "text")]);
}

#[tokio::test]
async fn test_resubmits_identical_request_once_per_pass() {
    let transport = Arc::new(MockTransport::new());
    let path = run_tools_path(BRIDGE);
    transport
        .respond(
            &path,
            run_tools_response(vec![auth_request_result("1", vec![challenge("conn-1", "req-1")])]),
        )
        .respond(
            &path,
            run_tools_response(vec![auth_request_result("2", vec![challenge("conn-2", "req-2")])]),
        )
        .respond(&path, run_tools_response(vec![output_result("1", "bob"), output_result("2", "[]")]));

    let mut client = client(&transport, Native);
    client.metadata("tenant", Some("acme".to_string()));
    let dispatched = authenticating_handler(&mut client);

    let results = client.run_tools(BRIDGE, None, &calls()).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(*dispatched.lock().unwrap(), vec!["req-1", "req-2"]);

    let submissions = transport.requests_to(&path);
    assert_eq!(submissions.len(), 3);
    assert!(submissions.iter().all(|body| *body == submissions[0]));
}

#[tokio::test]
async fn test_abort_stops_further_dispatch() {
    let transport = Arc::new(MockTransport::new());
    let path = run_tools_path(BRIDGE);
    transport.respond(
        &path,
        run_tools_response(vec![auth_request_result(
            "1",
            vec![challenge("conn-1", "req-1"), challenge("conn-1", "req-2")],
        )]),
    );

    let mut client = client(&transport, Native);
    let dispatched = Arc::new(AtomicUsize::new(0));
    {
        let dispatched = Arc::clone(&dispatched);
        client.on_authentication_request(move |event| {
            dispatched.fetch_add(1, Ordering::SeqCst);
            event.completion.abort();
        });
    }

    let error = client.run_tools(BRIDGE, None, &calls()).await.unwrap_err();
    let ToolBridgeError::AuthenticationAborted(error) = error else {
        panic!("expected abort, got {error:?}");
    };
    assert_eq!(error.code, AUTHENTICATION_ABORTED);
    assert!(error.details.unwrap().contains("req-1"));
    assert_eq!(dispatched.load(Ordering::SeqCst), 1);
    assert_eq!(transport.requests_to(&path).len(), 1);
}

#[tokio::test]
async fn test_dropped_completion_counts_as_abort() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(
        &run_tools_path(BRIDGE),
        run_tools_response(vec![auth_request_result("1", vec![challenge("conn-1", "req-1")])]),
    );

    let mut client = client(&transport, Native);
    client.on_authentication_request(drop);

    let error = client.run_tools(BRIDGE, None, &calls()).await.unwrap_err();
    assert_eq!(error.code(), AUTHENTICATION_ABORTED);
}

#[tokio::test]
async fn test_failure_status_rejects_with_its_data() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(
        &run_tools_path(BRIDGE),
        run_tools_response(vec![auth_request_result(
            "1",
            vec![challenge("conn-1", "req-1"), challenge("conn-1", "req-2")],
        )]),
    );

    let mut client = client(&transport, Native);
    client.on_authentication_request(|event| {
        event.completion.fail(
            AuthenticationStatus::Expired,
            SdkError::new("LINK_EXPIRED", "the sign-in link expired"),
        );
    });

    let error = client.run_tools(BRIDGE, None, &calls()).await.unwrap_err();
    match error {
        ToolBridgeError::AuthenticationFailed { status, error } => {
            assert_eq!(status, AuthenticationStatus::Expired);
            assert_eq!(error.code, "LINK_EXPIRED");
        }
        other => panic!("expected authentication failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_handler_rejects_immediately() {
    let transport = Arc::new(MockTransport::new());
    let path = run_tools_path(BRIDGE);
    transport.respond(
        &path,
        run_tools_response(vec![auth_request_result("1", vec![challenge("conn-1", "req-1")])]),
    );

    let client = client(&transport, Native);
    let error = client.run_tools(BRIDGE, None, &calls()).await.unwrap_err();

    let ToolBridgeError::AuthenticationRequired(error) = error else {
        panic!("expected authentication required, got {error:?}");
    };
    assert_eq!(error.code, AUTHENTICATION_REQUIRED);
    assert!(error.details.unwrap().contains("connectionUid"));
    assert_eq!(transport.requests_to(&path).len(), 1);
}

#[tokio::test]
async fn test_transport_failures_become_runtime_errors() {
    let transport = Arc::new(MockTransport::new());
    let path = run_tools_path(BRIDGE);
    transport.respond(&path, json!({"results": "not a list"}));

    let client = client(&transport, Native);

    let decode = client.run_tools(BRIDGE, None, &calls()).await.unwrap_err();
    assert!(matches!(decode, ToolBridgeError::Runtime(_)));
    assert_eq!(decode.code(), RUNTIME_ERROR);

    let unreachable = client.run_tools(BRIDGE, None, &calls()).await.unwrap_err();
    let ToolBridgeError::Runtime(error) = unreachable else {
        panic!("expected runtime error, got {unreachable:?}");
    };
    assert_eq!(error.code, RUNTIME_ERROR);
    assert!(error.message.contains("no scripted response"));
    assert!(error.details.is_some());
}

#[tokio::test]
async fn test_native_output_round_trips_unchanged() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(
        &run_tools_path(BRIDGE),
        run_tools_response(vec![output_result("1", "bob@example.com")]),
    );

    let client = client(&transport, Native);
    let results = client.run_tools(BRIDGE, None, &calls()[..1]).await.unwrap();
    assert_eq!(results, vec![ExecutionResult::output("1", "bob@example.com", "text")]);
}

#[tokio::test]
async fn test_openai_output_becomes_tool_message() {
    let transport = Arc::new(MockTransport::new());
    let path = run_tools_path(BRIDGE);
    transport.respond(&path, run_tools_response(vec![output_result("call_1", "bob@example.com")]));

    let client = client(&transport, OpenAi);
    let completion: ChatCompletion = serde_json::from_value(json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "finish_reason": "tool_calls",
            "message": {
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "lookup_user", "arguments": "{\"email\":\"bob\"}"}
                }]
            }
        }]
    }))
    .unwrap();
    let history = [json!({"role": "user", "content": "Who is bob?"})];

    let messages = client.run_tools(BRIDGE, Some(&history[..]), &completion).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, "tool");
    assert_eq!(messages[0].tool_call_id, "call_1");
    assert_eq!(messages[0].content[0].text, "bob@example.com");

    let body = &transport.requests_to(&path)[0];
    assert_eq!(body["tool_calls"][0]["id"], "call_1");
    assert_eq!(body["tool_calls"][0]["details"]["arguments"], "{\"email\":\"bob\"}");
}

#[tokio::test]
async fn test_run_tool_natively() {
    let transport = Arc::new(MockTransport::new());
    let path = run_tools_path(BRIDGE);
    transport
        .respond(&path, run_tools_response(vec![output_result("native", "42")]))
        .respond(&path, run_tools_response(vec![]));

    let client = client(&transport, OpenAi);

    let params = json!({"a": 40, "b": 2});
    let result = client
        .run_tool_natively(BRIDGE, "add", Some(&params))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.as_output().unwrap().content, "42");

    assert!(client.run_tool_natively(BRIDGE, "noop", None).await.unwrap().is_none());

    let bodies = transport.requests_to(&path);
    assert_eq!(bodies[0]["tool_calls"][0]["id"], "native");
    assert_eq!(bodies[0]["tool_calls"][0]["details"]["arguments"], params.to_string());
    assert_eq!(bodies[1]["tool_calls"][0]["details"]["arguments"], "{}");
    assert_eq!(bodies[1]["messages"], json!([]));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_any_error_rejects_with_exactly_the_errors(batch in properties::result_batch()) {
        let codes = properties::error_codes(&batch);
        prop_assume!(!codes.is_empty());

        let transport = Arc::new(MockTransport::new());
        transport.respond(
            &run_tools_path(BRIDGE),
            run_tools_response(properties::wire_results(&batch)),
        );
        let client = client(&transport, Native);

        let error = tokio_test::block_on(client.run_tools(BRIDGE, None, &calls())).unwrap_err();
        let ToolBridgeError::Execution(errors) = error else {
            panic!("expected execution error");
        };
        let returned: Vec<String> = errors.into_iter().map(|e| e.code).collect();
        prop_assert_eq!(returned, codes);
    }
}

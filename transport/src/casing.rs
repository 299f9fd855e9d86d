//! Key-case translation between the in-memory and wire forms
//!
//! In memory, payloads use camelCase keys; on the wire, snake_case. Only
//! object keys are rewritten, never string values. Translation recurses
//! through nested objects and arrays.

use serde_json::{Map, Value};

/// `connectionUid` -> `connection_uid`
#[must_use]
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `connection_uid` -> `connectionUid`
///
/// Only an underscore followed by a lowercase ASCII letter collapses.
#[must_use]
pub fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' {
            if let Some(next) = chars.peek().copied().filter(char::is_ascii_lowercase) {
                out.push(next.to_ascii_uppercase());
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Rewrite every object key to snake_case for the wire
#[must_use]
pub fn to_wire(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (camel_to_snake(&key), to_wire(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(to_wire).collect()),
        other => other,
    }
}

/// Rewrite every object key to camelCase, dropping null-valued keys
#[must_use]
pub fn from_wire(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                let value = from_wire(value);
                if !value.is_null() {
                    out.insert(snake_to_camel(&key), value);
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(from_wire).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_key_conversion() {
        assert_eq!(camel_to_snake("toolCallId"), "tool_call_id");
        assert_eq!(camel_to_snake("messages"), "messages");
        assert_eq!(snake_to_camel("tool_call_id"), "toolCallId");
        assert_eq!(snake_to_camel("stack_trace"), "stackTrace");
        assert_eq!(snake_to_camel("_private"), "Private");
        assert_eq!(snake_to_camel("v_2"), "v_2");
    }

    #[test]
    fn test_nested_payload_to_wire() {
        let body = json!({
            "context": {"bridgeUid": "b-1", "messages": [{"role": "user", "content": "hi"}]},
            "toolCalls": [{"id": "1", "details": {"name": "lookupUser", "arguments": "{\"userId\":1}"}}]
        });

        assert_eq!(
            to_wire(body),
            json!({
                "context": {"bridge_uid": "b-1", "messages": [{"role": "user", "content": "hi"}]},
                "tool_calls": [{"id": "1", "details": {"name": "lookupUser", "arguments": "{\"userId\":1}"}}]
            })
        );
    }

    #[test]
    fn test_from_wire_drops_nulls() {
        let body = json!({
            "results": [{"tool_call_id": "1", "tool_uid": null, "data": {"content_type": "text"}}]
        });

        assert_eq!(
            from_wire(body),
            json!({"results": [{"toolCallId": "1", "data": {"contentType": "text"}}]})
        );
    }

    proptest! {
        #[test]
        fn prop_lowercase_keys_are_untouched_on_the_way_out(key in "[a-z0-9]{1,16}") {
            prop_assert_eq!(camel_to_snake(&key), key);
        }

        #[test]
        fn prop_camel_keys_survive_the_wire(key in "[a-z]{1,8}([A-Z][a-z]{1,8}){0,3}") {
            prop_assert_eq!(snake_to_camel(&camel_to_snake(&key)), key);
        }
    }
}

//! Wire format between the host and script plugins
//!
//! Newline-delimited JSON in both directions, one UTF-8 object per line:
//!
//! ```text
//! host -> plugin  {"jsonrpc":"2.0","id":1,"method":"init","params":{...}}
//! plugin -> host  {"id":1,"result":{}}
//! plugin -> host  {"id":2,"error":{"message":"api key missing"}}
//! plugin -> host  {"method":"api.show_message","params":{"title":"..."}}
//! ```
//!
//! Objects with a `method` are notifications from the plugin to the host and
//! are never answered. Everything else must carry the numeric `id` of the
//! request it answers.

use crate::plugins::error::{PluginError, PluginResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }

    /// Serialize as one protocol line, terminator included
    pub fn encode(&self) -> PluginResult<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub id: u64,
    pub outcome: Result<Value, RpcErrorObject>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PluginMessage {
    Response(RpcResponse),
    Notification { method: String, params: Value },
}

/// Decode one line written by a plugin
pub fn decode_line(line: &str) -> PluginResult<PluginMessage> {
    let value: Value = serde_json::from_str(line.trim())?;
    let Value::Object(mut object) = value else {
        return Err(PluginError::Protocol(format!("expected a JSON object, got: {}", line.trim())));
    };

    if let Some(method) = object.get("method").and_then(Value::as_str).map(str::to_string) {
        return Ok(PluginMessage::Notification {
            method,
            params: object.remove("params").unwrap_or(Value::Null),
        });
    }

    let id = object
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| PluginError::Protocol("response without a numeric id".to_string()))?;

    let outcome = match object.remove("error") {
        Some(Value::Null) | None => Ok(object.remove("result").unwrap_or(Value::Null)),
        Some(error) => Err(serde_json::from_value::<RpcErrorObject>(error.clone()).unwrap_or_else(
            |_| RpcErrorObject {
                message: error.to_string(),
                code: None,
            },
        )),
    };

    Ok(PluginMessage::Response(RpcResponse { id, outcome }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_line_layout() {
        let line = RpcRequest::new(1, "init", json!({})).encode().unwrap();
        assert_eq!(line, "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"init\",\"params\":{}}\n");
    }

    #[test]
    fn test_decode_result() {
        let message = decode_line(r#"{"id":1,"result":{}}"#).unwrap();
        assert_eq!(
            message,
            PluginMessage::Response(RpcResponse {
                id: 1,
                outcome: Ok(json!({})),
            })
        );
    }

    #[test]
    fn test_decode_null_result_is_success() {
        let message = decode_line(r#"{"id":7,"result":null,"error":null}"#).unwrap();
        assert_eq!(
            message,
            PluginMessage::Response(RpcResponse {
                id: 7,
                outcome: Ok(Value::Null),
            })
        );
    }

    #[test]
    fn test_decode_error_envelope() {
        let message = decode_line(r#"{"id":3,"error":{"message":"boom","code":-32000}}"#).unwrap();
        let PluginMessage::Response(response) = message else {
            panic!("expected a response");
        };
        let error = response.outcome.unwrap_err();
        assert_eq!(error.message, "boom");
        assert_eq!(error.code, Some(-32000));

        // Free-form error values are kept as text
        let PluginMessage::Response(response) = decode_line(r#"{"id":4,"error":"nope"}"#).unwrap() else {
            panic!("expected a response");
        };
        assert_eq!(response.outcome.unwrap_err().message, "\"nope\"");
    }

    #[test]
    fn test_decode_notification() {
        let message =
            decode_line(r#"{"method":"api.show_message","params":{"title":"hi"}}"#).unwrap();
        assert_eq!(
            message,
            PluginMessage::Notification {
                method: "api.show_message".to_string(),
                params: json!({"title": "hi"}),
            }
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_line("Traceback (most recent call last):").is_err());
        assert!(decode_line("[1,2,3]").is_err());
        assert!(decode_line(r#"{"result":{}}"#).is_err());
        assert!(decode_line(r#"{"id":"abc","result":{}}"#).is_err());
    }
}

// JSON-RPC types and error helpers
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum JsonRpcRequest {
    WithParams(JsonRpcRequestWithParams),
    WithoutParams(JsonRpcRequestWithoutParams),
    Notification(JsonRpcNotification),
}

impl JsonRpcRequest {
    pub fn jsonrpc(&self) -> &str {
        match self {
            JsonRpcRequest::WithParams(req) => &req.jsonrpc,
            JsonRpcRequest::WithoutParams(req) => &req.jsonrpc,
            JsonRpcRequest::Notification(req) => &req.jsonrpc,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct JsonRpcRequestWithParams {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    pub params: Value,
}

#[derive(Deserialize, Debug)]
pub struct JsonRpcRequestWithoutParams {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
}

#[derive(Deserialize, Debug)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(rename = "clientInfo", default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Deserialize, Debug)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[derive(Serialize, Debug)]
pub struct JsonRpcResponse<T> {
    pub jsonrpc: String,
    pub id: Value,
    pub result: T,
}

impl<T: Serialize> JsonRpcResponse<T> {
    pub fn new(id: Value, result: T) -> Self {
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: String,
    pub id: Value,
    pub error: ErrorObject,
}

#[derive(Serialize, Debug)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
}

impl JsonRpcErrorResponse {
    pub fn new(id: Value, code: i32, message: impl Into<String>) -> Self {
        JsonRpcErrorResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: ErrorObject {
                code,
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_shapes_are_distinguished() {
        let with_params: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "x"}
        }))
        .unwrap();
        assert!(matches!(with_params, JsonRpcRequest::WithParams(_)));

        let without_params: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}))
                .unwrap();
        assert!(matches!(without_params, JsonRpcRequest::WithoutParams(_)));

        let notification: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0", "method": "notifications/initialized"
        }))
        .unwrap();
        assert!(matches!(notification, JsonRpcRequest::Notification(_)));
        assert_eq!(notification.jsonrpc(), "2.0");
    }

    #[test]
    fn error_response_serializes() {
        let error = JsonRpcErrorResponse::new(json!(7), METHOD_NOT_FOUND, "Method not found");
        assert_eq!(
            serde_json::to_value(error).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "error": {"code": -32601, "message": "Method not found"}
            })
        );
    }

    #[test]
    fn initialize_params_tolerate_missing_client_info() {
        let params: InitializeParams =
            serde_json::from_value(json!({"protocolVersion": "2024-11-05"})).unwrap();
        assert_eq!(params.protocol_version, "2024-11-05");
        assert!(params.client_info.is_none());
    }
}

// MCP request dispatch and the axum handler serving it over HTTP
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::TimeSourceConfig;
use crate::resolver::TimeResolver;
use crate::rpc::{
    InitializeParams, JsonRpcErrorResponse, JsonRpcNotification, JsonRpcRequest,
    JsonRpcRequestWithParams, JsonRpcRequestWithoutParams, JsonRpcResponse, ToolCallParams,
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::tools::{
    call_get_current_time, get_tools_description_json, text_result, GET_CURRENT_TIME,
};

pub const SERVER_NAME: &str = "ntp-time-server";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

type ConfigSource = Arc<dyn Fn() -> TimeSourceConfig + Send + Sync>;

/// Everything a request needs: the shared resolver and where per-call
/// configuration comes from.
#[derive(Clone)]
pub struct AppState {
    resolver: Arc<TimeResolver>,
    config: ConfigSource,
}

impl AppState {
    /// Configuration is re-read from the environment on every tool call.
    pub fn from_env(resolver: Arc<TimeResolver>) -> Self {
        Self::with_config_source(resolver, TimeSourceConfig::from_env)
    }

    pub fn with_config_source<F>(resolver: Arc<TimeResolver>, config: F) -> Self
    where
        F: Fn() -> TimeSourceConfig + Send + Sync + 'static,
    {
        Self {
            resolver,
            config: Arc::new(config),
        }
    }
}

/// Handle one JSON-RPC message. Notifications produce no response.
pub async fn dispatch(state: &AppState, request_value: Value) -> Option<Value> {
    let id = request_value.get("id").cloned().unwrap_or(Value::Null);
    if !request_value.is_object() {
        return Some(error_value(id, INVALID_REQUEST, "Invalid Request"));
    }

    let request: Result<JsonRpcRequest, _> = serde_json::from_value(request_value);
    let request = match request {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "malformed JSON-RPC message");
            return Some(error_value(id, INVALID_REQUEST, "Invalid Request"));
        }
    };
    if request.jsonrpc() != JSONRPC_VERSION {
        return Some(error_value(
            id,
            INVALID_REQUEST,
            "Invalid Request: jsonrpc must be \"2.0\"",
        ));
    }

    match request {
        JsonRpcRequest::WithParams(req) => Some(handle_request_with_params(state, req).await),
        JsonRpcRequest::WithoutParams(req) => Some(handle_request_without_params(req)),
        JsonRpcRequest::Notification(req) => {
            handle_notification(&req);
            None
        }
    }
}

pub fn parse_error() -> Value {
    error_value(Value::Null, PARSE_ERROR, "Parse error")
}

async fn handle_request_with_params(state: &AppState, req: JsonRpcRequestWithParams) -> Value {
    match req.method.as_str() {
        "initialize" => process_init(&req),
        "tools/call" => {
            let params: Result<ToolCallParams, _> = serde_json::from_value(req.params);
            match params {
                Ok(params) => process_tool_call(state, req.id, params).await,
                Err(e) => error_value(
                    req.id,
                    INVALID_PARAMS,
                    format!("Invalid params for tools/call: {e}"),
                ),
            }
        }
        "tools/list" | "ping" => respond_without_params(req.id, &req.method),
        _ => error_value(req.id, METHOD_NOT_FOUND, "Method not found"),
    }
}

fn handle_request_without_params(req: JsonRpcRequestWithoutParams) -> Value {
    match req.method.as_str() {
        "tools/list" | "ping" => respond_without_params(req.id, &req.method),
        "initialize" | "tools/call" => error_value(
            req.id,
            INVALID_PARAMS,
            format!("Invalid params: {} requires params", req.method),
        ),
        _ => error_value(req.id, METHOD_NOT_FOUND, "Method not found"),
    }
}

fn respond_without_params(id: Value, method: &str) -> Value {
    match method {
        "tools/list" => response_value(id, json!({ "tools": get_tools_description_json() })),
        _ => response_value(id, json!({})),
    }
}

fn handle_notification(req: &JsonRpcNotification) {
    match req.method.as_str() {
        "notifications/initialized" => debug!("client initialized"),
        "notifications/cancelled" => debug!(params = ?req.params, "client cancelled a request"),
        other => debug!(method = other, "ignoring notification"),
    }
}

pub fn process_init(req: &JsonRpcRequestWithParams) -> Value {
    let params: Result<InitializeParams, _> = serde_json::from_value(req.params.clone());
    match params {
        Ok(params) => {
            if let Some(client) = &params.client_info {
                debug!(client = %client.name, version = ?client.version, "initialize");
            }
            let protocol_version = negotiate_protocol_version(&params.protocol_version);
            response_value(
                req.id.clone(),
                json!({
                    "protocolVersion": protocol_version,
                    "capabilities": {
                        "tools": {
                            "listChanged": false
                        }
                    },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
        }
        Err(e) => error_value(
            req.id.clone(),
            INVALID_PARAMS,
            format!("Invalid params for initialize: {e}"),
        ),
    }
}

async fn process_tool_call(state: &AppState, id: Value, params: ToolCallParams) -> Value {
    if params.name != GET_CURRENT_TIME {
        warn!(tool = %params.name, "call for unknown tool");
        return error_value(id, INVALID_PARAMS, format!("Unknown tool: {}", params.name));
    }
    if let Some(arguments) = params.arguments.as_ref().filter(|a| !is_empty_arguments(a)) {
        debug!(?arguments, "ignoring arguments to get_current_time");
    }

    let config = (state.config)();
    let text = call_get_current_time(Arc::clone(&state.resolver), config).await;
    response_value(id, text_result(text))
}

fn is_empty_arguments(arguments: &Value) -> bool {
    match arguments {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn negotiate_protocol_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|v| **v == requested)
        .copied()
        .unwrap_or(DEFAULT_PROTOCOL_VERSION)
}

fn response_value<T: Serialize>(id: Value, result: T) -> Value {
    to_value_or_internal_error(JsonRpcResponse::new(id, result))
}

fn error_value(id: Value, code: i32, message: impl Into<String>) -> Value {
    to_value_or_internal_error(JsonRpcErrorResponse::new(id, code, message))
}

fn to_value_or_internal_error<T: Serialize>(response: T) -> Value {
    serde_json::to_value(response).unwrap_or_else(|e| {
        json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": Value::Null,
            "error": { "code": -32603, "message": format!("Internal error: {e}") }
        })
    })
}

pub async fn mcp_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request_value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return create_jsonrpc_response(&parse_error()),
    };
    match dispatch(&state, request_value).await {
        Some(response) => create_jsonrpc_response(&response),
        None => Response::builder()
            .status(StatusCode::ACCEPTED)
            .body(Body::empty())
            .unwrap_or_else(|_| Response::new(Body::empty())),
    }
}

pub fn create_jsonrpc_response(json_response: &Value) -> Response {
    match serde_json::to_string(json_response) {
        Ok(json_string) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_string))
            .unwrap_or_else(|_| internal_error("failed to build response")),
        Err(_) => internal_error("failed to serialize response"),
    }
}

fn internal_error(reason: &str) -> Response {
    let mut response = Response::new(Body::from(format!(r#"{{"error":"{reason}"}}"#)));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

//! MCP server: exposes the tracker to language-model clients as tools,
//! resources and prompts over JSON-RPC 2.0.

use serde_json::{json, Value};

use crate::api::TrackerApi;
use crate::error::{Error, Result};

mod jsonrpc;
mod prompts;
mod resources;
mod stdio;
mod tools;

pub use jsonrpc::{json_rpc_error, json_rpc_response, JsonRpcRequest};
pub use stdio::serve;

use jsonrpc::{
    tool_text_content, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    RESOURCE_NOT_FOUND,
};

/// Protocol revision assumed when the client does not name one
pub const MCP_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "tasktracker";

pub struct McpServer {
    api: TrackerApi,
    reload_before_call: bool,
}

impl McpServer {
    pub fn new(api: TrackerApi) -> Self {
        let reload_before_call = api.config().mcp.reload_before_call;
        Self {
            api,
            reload_before_call,
        }
    }

    pub fn api(&self) -> &TrackerApi {
        &self.api
    }

    /// Handle one raw JSON-RPC message; `None` means no reply is sent
    pub fn handle_message(&mut self, raw: &str) -> Option<Value> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                return Some(json_rpc_error(
                    None,
                    PARSE_ERROR,
                    &format!("Parse error: {err}"),
                ));
            }
        };
        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request),
            Err(err) => Some(json_rpc_error(
                id,
                INVALID_REQUEST,
                &format!("Invalid request: {err}"),
            )),
        }
    }

    pub fn handle(&mut self, request: JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();
        let expects_response = request.expects_response();
        tracing::debug!(method, "mcp request");

        if method == "initialize" {
            let protocol_version = request
                .params
                .as_ref()
                .and_then(|v| v.get("protocolVersion"))
                .and_then(|v| v.as_str())
                .unwrap_or(MCP_VERSION);

            return Some(json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": protocol_version,
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    },
                    "capabilities": {
                        "tools": {},
                        "resources": {},
                        "prompts": {},
                        "logging": {}
                    }
                }),
            ));
        }

        // Requests are served without waiting for the initialized notification
        if method == "notifications/initialized" || method == "initialized" {
            return None;
        }

        if method == "ping" || method == "logging/setLevel" {
            return Some(json_rpc_response(request.id, json!({})));
        }

        if method == "tools/list" {
            return Some(json_rpc_response(
                request.id,
                json!({ "tools": tools::definitions() }),
            ));
        }

        if method == "tools/call" {
            let Some(params) = request.params.as_ref().and_then(|v| v.as_object()) else {
                return Some(json_rpc_error(
                    request.id,
                    INVALID_PARAMS,
                    "params must be an object",
                ));
            };
            let tool_name = params
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let args = match params.get("arguments") {
                None | Some(Value::Null) => json!({}),
                Some(v) => v.clone(),
            };

            self.refresh();
            let body = tools::call(&mut self.api, &tool_name, args);
            let success = body
                .get("success")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            tracing::info!(tool = %tool_name, success, "tool call");

            return Some(json_rpc_response(
                request.id,
                json!({
                    "content": [tool_text_content(&body)],
                    "isError": !success
                }),
            ));
        }

        if method == "resources/list" {
            return Some(json_rpc_response(request.id, resources::list()));
        }
        if method == "resources/templates/list" {
            return Some(json_rpc_response(request.id, resources::templates()));
        }
        if method == "resources/read" {
            let uri = request
                .params
                .as_ref()
                .and_then(|v| v.get("uri"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            self.refresh();
            return Some(match resources::read(&self.api, &uri) {
                Ok(result) => json_rpc_response(request.id, result),
                Err(err) => error_response(request.id, &err),
            });
        }

        if method == "prompts/list" {
            return Some(json_rpc_response(request.id, prompts::list()));
        }
        if method == "prompts/get" {
            let params = request.params.clone().unwrap_or_else(|| json!({}));
            let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
            return Some(match prompts::get(name, &args) {
                Ok(result) => json_rpc_response(request.id, result),
                Err(err) => error_response(request.id, &err),
            });
        }

        // Notifications never receive a response, even if unknown
        if !expects_response {
            return None;
        }

        Some(json_rpc_error(
            request.id,
            METHOD_NOT_FOUND,
            &format!("Method not found: {method}"),
        ))
    }

    fn refresh(&mut self) {
        if self.reload_before_call {
            self.api.reload_all();
        }
    }
}

fn error_response(id: Option<Value>, err: &Error) -> Value {
    let code = match err {
        Error::NotFound { .. } => RESOURCE_NOT_FOUND,
        _ => INVALID_PARAMS,
    };
    json_rpc_error(id, code, &err.to_string())
}

/// Serve MCP on the process's stdin/stdout until stdin closes
pub fn serve_stdio(api: TrackerApi) -> Result<()> {
    let mut server = McpServer::new(api);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    tracing::info!(root = %server.api().storage().root().display(), "mcp server started");
    serve(&mut server, stdin.lock(), stdout.lock())
}

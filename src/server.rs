//! MCP server implementation.
//!
//! Handles JSON-RPC 2.0 over stdio according to the MCP protocol specification.
//! Tool calls are dispatched on their own tasks so a slow database round trip
//! doesn't serialize the whole session; a single writer task owns stdout.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::error::{rpc_codes, Result, ServerError};
use crate::registry::ProjectRegistry;
use crate::tools::{prompts, ToolRegistry};

/// MCP protocol version we support.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server information.
const SERVER_NAME: &str = "docstore-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version marker, must be "2.0".
    pub jsonrpc: String,
    /// Request id; absent for notifications.
    pub id: Option<JsonValue>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<JsonValue>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// Protocol version marker, always "2.0".
    pub jsonrpc: String,
    /// Request id this responds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    /// Success result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    /// Error object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<JsonValue>, result: JsonValue) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<JsonValue>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Create an error response from a ServerError.
    pub fn from_error(id: Option<JsonValue>, err: ServerError) -> Self {
        Self::error(id, err.rpc_code(), err.to_string())
    }
}

/// MCP server.
pub struct McpServer {
    projects: Arc<ProjectRegistry>,
    tools: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a new MCP server over an initialized project registry.
    pub fn new(projects: ProjectRegistry) -> Self {
        Self {
            projects: Arc::new(projects),
            tools: Arc::new(ToolRegistry::new()),
        }
    }

    /// Run the server, reading from stdin and writing to stdout.
    pub async fn run(&self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(line) = rx.recv().await {
                if stdout.write_all(line.as_bytes()).await.is_err()
                    || stdout.write_all(b"\n").await.is_err()
                    || stdout.flush().await.is_err()
                {
                    break;
                }
            }
        });

        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                // EOF - client disconnected
                break;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) => self.handle_request(request, &tx),
                Err(e) => send(
                    &tx,
                    JsonRpcResponse::error(
                        None,
                        rpc_codes::PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ),
                ),
            }
        }

        drop(tx);
        let _ = writer.await;
        Ok(())
    }

    /// Route a single JSON-RPC request; responses go through the writer channel.
    fn handle_request(&self, request: JsonRpcRequest, tx: &UnboundedSender<String>) {
        // Validate JSON-RPC version
        if request.jsonrpc != "2.0" {
            send(
                tx,
                JsonRpcResponse::error(
                    request.id,
                    rpc_codes::INVALID_REQUEST,
                    "Invalid JSON-RPC version".to_string(),
                ),
            );
            return;
        }

        match request.method.as_str() {
            "initialize" => send(tx, handle_initialize(request)),
            "initialized" | "notifications/initialized" => {
                // Client acknowledgment; notifications carry no id and get no
                // response.
                if request.id.is_some() {
                    send(tx, JsonRpcResponse::success(request.id, JsonValue::Null));
                }
            }
            "tools/list" => send(tx, self.handle_tools_list(request)),
            "tools/call" => self.spawn_tool_call(request, tx),
            "resources/list" => send(
                tx,
                JsonRpcResponse::success(request.id, json!({ "resources": [] })),
            ),
            "prompts/list" => self.spawn_prompts_list(request, tx),
            "ping" => send(tx, JsonRpcResponse::success(request.id, json!({}))),
            _ => send(
                tx,
                JsonRpcResponse::error(
                    request.id,
                    rpc_codes::METHOD_NOT_FOUND,
                    format!("Unknown method: {}", request.method),
                ),
            ),
        }
    }

    /// Handle the tools/list request.
    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let tools: Vec<JsonValue> = self
            .tools
            .tools()
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();

        JsonRpcResponse::success(request.id, json!({ "tools": tools }))
    }

    /// Dispatch tools/call on its own task; many calls may be in flight at once.
    fn spawn_tool_call(&self, request: JsonRpcRequest, tx: &UnboundedSender<String>) {
        let projects = Arc::clone(&self.projects);
        let tools = Arc::clone(&self.tools);
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = tool_call_response(&projects, &tools, request).await;
            send(&tx, response);
        });
    }

    /// Answer prompts/list from the default project's prompt collection.
    fn spawn_prompts_list(&self, request: JsonRpcRequest, tx: &UnboundedSender<String>) {
        let projects = Arc::clone(&self.projects);
        let tx = tx.clone();
        tokio::spawn(async move {
            let records = match projects.resolve(None) {
                Ok(store) => prompts::prompt_records(store.as_ref()).await,
                Err(_) => Vec::new(),
            };
            send(
                &tx,
                JsonRpcResponse::success(request.id, json!({ "prompts": records })),
            );
        });
    }
}

/// Serialize and queue one response; drops it if the writer is gone.
fn send(tx: &UnboundedSender<String>, response: JsonRpcResponse) {
    match serde_json::to_string(&response) {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize response"),
    }
}

/// Handle the initialize request.
fn handle_initialize(request: JsonRpcRequest) -> JsonRpcResponse {
    JsonRpcResponse::success(
        request.id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {},
                "prompts": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            }
        }),
    )
}

/// Build the tools/call response.
///
/// Every tool failure - validation, unknown tool, unknown project, backend -
/// comes back as an `{"error": ...}` text payload inside the success envelope,
/// never as a transport failure.
async fn tool_call_response(
    projects: &ProjectRegistry,
    tools: &ToolRegistry,
    request: JsonRpcRequest,
) -> JsonRpcResponse {
    let id = request.id;

    let params = match request.params {
        Some(JsonValue::Object(obj)) => obj,
        _ => {
            return JsonRpcResponse::error(
                id,
                rpc_codes::INVALID_PARAMS,
                "Missing params object".to_string(),
            )
        }
    };

    let name = match params.get("name").and_then(|v| v.as_str()) {
        Some(n) => n.to_string(),
        None => {
            return JsonRpcResponse::error(
                id,
                rpc_codes::INVALID_PARAMS,
                "Missing 'name' in params".to_string(),
            )
        }
    };

    let arguments = match params.get("arguments") {
        Some(JsonValue::Object(obj)) => obj.clone(),
        Some(JsonValue::Null) | None => Map::new(),
        _ => {
            return JsonRpcResponse::error(
                id,
                rpc_codes::INVALID_PARAMS,
                "'arguments' must be an object".to_string(),
            )
        }
    };

    match tools.dispatch(projects, &name, arguments).await {
        Ok(result) => JsonRpcResponse::success(
            id,
            json!({
                "content": [{
                    "type": "text",
                    "text": pretty(&result)
                }]
            }),
        ),
        Err(err) => {
            tracing::debug!(tool = %name, error = %err, "tool call failed");
            JsonRpcResponse::success(
                id,
                json!({
                    "content": [{
                        "type": "text",
                        "text": pretty(&json!({ "error": err.to_string() }))
                    }],
                    "isError": true
                }),
            )
        }
    }
}

/// Pretty-print a payload; every tool response is one JSON text block.
fn pretty(value: &JsonValue) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_response_success() {
        let response =
            JsonRpcResponse::success(Some(JsonValue::Number(1.into())), json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_json_rpc_response_error() {
        let response = JsonRpcResponse::error(
            Some(JsonValue::Number(1.into())),
            -32600,
            "Invalid".to_string(),
        );
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"error\""));
        assert!(!json.contains("\"result\""));
    }

    #[test]
    fn test_from_error_maps_codes() {
        let response = JsonRpcResponse::from_error(
            None,
            ServerError::UnknownTool("nope".to_string()),
        );
        assert_eq!(response.error.map(|e| e.code), Some(rpc_codes::METHOD_NOT_FOUND));
    }
}

//! Main request dispatcher. Receives JSON-RPC messages and routes them to handlers.

use tokio::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::tools::ToolRegistry;
use crate::types::*;

use super::negotiation::Handshake;
use super::validator::validate_request;

/// Dispatches incoming JSON-RPC messages against the tool registry.
pub struct ProtocolHandler {
    tools: ToolRegistry,
    handshake: Mutex<Handshake>,
}

impl ProtocolHandler {
    pub fn new(tools: ToolRegistry) -> Self {
        Self {
            tools,
            handshake: Mutex::new(Handshake::default()),
        }
    }

    /// Whether the client has sent `notifications/initialized`.
    pub async fn is_initialized(&self) -> bool {
        self.handshake.lock().await.initialized
    }

    /// Handle one message. Requests always get a response; notifications and
    /// stray responses get `None`.
    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!("Received unexpected message type from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        if let Err(e) = validate_request(&request) {
            return to_value(&e.to_json_rpc_error(request.id));
        }

        tracing::debug!("-> {} (id {})", request.method, request.id);
        let id = request.id.clone();

        match self.dispatch_request(request).await {
            Ok(value) => to_value(&JsonRpcResponse::new(id, value)),
            Err(e) => {
                tracing::warn!("Request {id} failed: {e}");
                to_value(&e.to_json_rpc_error(id))
            }
        }
    }

    async fn dispatch_request(&self, request: JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "shutdown" => {
                tracing::info!("Shutdown requested");
                Ok(empty_object())
            }
            "ping" => Ok(empty_object()),

            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(request.params).await,

            _ => Err(McpError::MethodNotFound(request.method)),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                self.handshake.lock().await.mark_initialized();
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                // Requests run to completion; a fetch is bounded by its own timeouts.
                tracing::info!("Received cancellation notification");
            }
            _ => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = required_params(params, "Initialize")?;
        let result = self.handshake.lock().await.negotiate(init_params);
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    fn handle_tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: self.tools.list_tools(),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let call_params: ToolCallParams = required_params(params, "Tool call")?;

        let result = self
            .tools
            .call(&call_params.name, call_params.arguments)
            .await?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn required_params<T: DeserializeOwned>(params: Option<Value>, what: &str) -> McpResult<T> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .ok_or_else(|| McpError::InvalidParams(format!("{what} params required")))
}

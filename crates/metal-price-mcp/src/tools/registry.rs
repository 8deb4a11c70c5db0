//! Tool registration and dispatch.

use std::sync::Arc;

use serde_json::Value;

use metal_price::PriceFetcher;

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::get_silver_price;

/// The tools this server exposes, bound to the fetcher they run against.
/// Built once at process start and handed to the protocol handler.
pub struct ToolRegistry {
    fetcher: Arc<PriceFetcher>,
}

impl ToolRegistry {
    pub fn new(fetcher: PriceFetcher) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
        }
    }

    /// Definitions of every tool, independent of any fetcher.
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![get_silver_price::definition()]
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        Self::definitions()
    }

    pub async fn call(&self, name: &str, arguments: Option<Value>) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            get_silver_price::NAME => get_silver_price::execute(args, &self.fetcher).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}

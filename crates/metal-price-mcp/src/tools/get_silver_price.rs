//! Tool: get_silver_price — Fetch the live MCX silver futures quote.

use serde_json::{json, Value};

use metal_price::{ErrorReport, PriceFetcher};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

pub const NAME: &str = "get_silver_price";

const CHART_MIME: &str = "image/png";

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some(
            "Get the current MCX silver futures price (INR) with open, previous close, \
             52-week range, volume, open interest, lot size and change since previous close"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Run one fetch. A failed fetch is returned as an `{error, timestamp}`
/// record with `isError` set, never as a JSON-RPC error.
pub async fn execute(args: Value, fetcher: &PriceFetcher) -> McpResult<ToolCallResult> {
    if !(args.is_object() || args.is_null()) {
        return Err(McpError::InvalidParams(
            "get_silver_price takes no arguments".to_string(),
        ));
    }

    match fetcher.fetch_price().await {
        Ok(report) => {
            let result = ToolCallResult::json(&report);
            Ok(match report.chart_image_base64() {
                Some(data) => result.with_image(data, CHART_MIME),
                None => result,
            })
        }
        Err(e) => {
            tracing::error!("{NAME} failed: {e}");
            Ok(ToolCallResult::error_json(&ErrorReport::new(&e)))
        }
    }
}

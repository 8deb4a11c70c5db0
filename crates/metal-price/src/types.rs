//! Core data types for price reports and fetch errors.

use serde::{Deserialize, Serialize};

/// Fixed identity of the quoted instrument.
pub const METAL: &str = "Silver";
pub const EXCHANGE: &str = "MCX";
pub const CURRENCY: &str = "INR";

/// Direction of the move since the previous close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Up,
    Down,
}

/// A single quote snapshot, assembled fresh for every fetch.
///
/// Optional fields are omitted from JSON when the page did not yield them.
/// Numeric fields stay as the page formatted them so trailing zeros and
/// thousands separators survive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReport {
    pub metal: String,
    pub exchange: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_low: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_high: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_interest_lots: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    pub timestamp: String,
    pub source: String,
    /// PNG snapshot of the rendered page. Carried next to the JSON, not in it.
    #[serde(skip)]
    pub chart_image: Option<Vec<u8>>,
}

impl PriceReport {
    /// Base64 encoding of the chart snapshot, if one was captured.
    pub fn chart_image_base64(&self) -> Option<String> {
        use base64::Engine;
        self.chart_image
            .as_deref()
            .map(|png| base64::engine::general_purpose::STANDARD.encode(png))
    }
}

/// Record returned in place of a report when the fetch itself failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
    pub timestamp: String,
}

impl ErrorReport {
    pub fn new(error: &PriceError) -> Self {
        Self {
            error: error.to_string(),
            timestamp: now_timestamp(),
        }
    }
}

/// Wall-clock timestamp used on every record: UTC, RFC 3339, milliseconds.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Errors that abort a fetch.
///
/// Missing fields and skipped derivations are never errors; they only make the
/// report less complete.
#[derive(thiserror::Error, Debug)]
pub enum PriceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl PriceError {
    /// Network failure, timeout or non-success status while fetching the page.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PriceError::Transport(_) | PriceError::HttpStatus { .. } | PriceError::Timeout(_)
        )
    }

    /// Browser launch or navigation failure.
    pub fn is_render(&self) -> bool {
        matches!(
            self,
            PriceError::Render(_) | PriceError::BrowserUnavailable(_)
        )
    }
}

/// Convenience result type.
pub type PriceResult<T> = Result<T, PriceError>;

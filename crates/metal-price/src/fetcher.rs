//! PriceFetcher: acquire the quote page, extract, derive, assemble.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::change::derive_change;
use crate::extract::{extract_fields, has_primary_quote};
use crate::source::{BrowserSource, HttpSource, Page, PageSource};
use crate::types::{now_timestamp, PriceError, PriceReport, PriceResult, CURRENCY, EXCHANGE, METAL};

/// Groww's MCX silver futures page.
pub const DEFAULT_URL: &str = "https://groww.in/commodities/futures/mcx_silver";
/// Provenance label carried on every report.
pub const DEFAULT_SOURCE_LABEL: &str = "Groww.in";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SETTLE_SECS: u64 = 8;
const DEFAULT_POLL_MS: u64 = 500;

/// How the page is acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Plain GET only.
    Http,
    /// Always render in a headless browser.
    Browser,
    /// GET first; render only if the traded price is missing from the response.
    #[default]
    Auto,
}

impl FromStr for FetchMode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(FetchMode::Http),
            "browser" => Ok(FetchMode::Browser),
            "auto" => Ok(FetchMode::Auto),
            other => Err(PriceError::InvalidConfig(format!(
                "unknown fetch mode '{other}' (expected http, browser or auto)"
            ))),
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::Http => write!(f, "http"),
            FetchMode::Browser => write!(f, "browser"),
            FetchMode::Auto => write!(f, "auto"),
        }
    }
}

/// Everything a fetch needs. Resolved once at process start.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub url: String,
    pub source_label: String,
    /// Bound on the GET, and on browser navigation.
    pub http_timeout: Duration,
    /// Longest wait for the quote to appear in a rendered page.
    pub settle_timeout: Duration,
    pub poll_interval: Duration,
    pub mode: FetchMode,
    pub chromium_path: Option<PathBuf>,
    /// Attach a PNG of the rendered page. Browser renders only.
    pub capture_chart: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            settle_timeout: Duration::from_secs(DEFAULT_SETTLE_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            mode: FetchMode::default(),
            chromium_path: None,
            capture_chart: false,
        }
    }
}

impl FetchConfig {
    pub fn validate(&self) -> PriceResult<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(PriceError::InvalidConfig(format!(
                "source URL must be http(s): {}",
                self.url
            )));
        }
        if self.http_timeout.is_zero() {
            return Err(PriceError::InvalidConfig(
                "HTTP timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(PriceError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fetches one quote per call. Holds configuration only; no state is shared
/// between calls.
pub struct PriceFetcher {
    config: FetchConfig,
    http: Box<dyn PageSource>,
    browser: Box<dyn PageSource>,
}

impl PriceFetcher {
    pub fn new(config: FetchConfig) -> PriceResult<Self> {
        config.validate()?;
        let http = HttpSource::new(config.http_timeout);
        let browser = BrowserSource::new(
            config.http_timeout,
            config.settle_timeout,
            config.poll_interval,
        )
        .with_chromium_path(config.chromium_path.clone())
        .with_screenshot(config.capture_chart);
        Ok(Self::with_sources(config, Box::new(http), Box::new(browser)))
    }

    /// Build a fetcher over explicit page sources.
    pub fn with_sources(
        config: FetchConfig,
        http: Box<dyn PageSource>,
        browser: Box<dyn PageSource>,
    ) -> Self {
        Self {
            config,
            http,
            browser,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn acquire(&self) -> PriceResult<Page> {
        let url = self.config.url.as_str();
        match self.config.mode {
            FetchMode::Http => self.http.acquire(url).await,
            FetchMode::Browser => self.browser.acquire(url).await,
            FetchMode::Auto => {
                let page = self.http.acquire(url).await?;
                if has_primary_quote(&page.text) {
                    return Ok(page);
                }
                if !self.browser.is_available() {
                    tracing::warn!(
                        "Quote missing from HTTP response and no browser available; returning HTTP result"
                    );
                    return Ok(page);
                }
                tracing::info!("Quote missing from HTTP response, rendering in browser");
                self.browser.acquire(url).await
            }
        }
    }

    /// Fetch the page once and assemble a fresh report.
    pub async fn fetch_price(&self) -> PriceResult<PriceReport> {
        let page = self.acquire().await?;
        let timestamp = now_timestamp();

        let report = build_report(
            &page.text,
            page.screenshot,
            &self.config.source_label,
            timestamp,
        );

        tracing::info!(
            "Fetched silver quote via {:?}: price={}, change={}",
            page.method,
            report.current_price.as_deref().unwrap_or("-"),
            report.percent_change.as_deref().unwrap_or("-")
        );

        Ok(report)
    }
}

/// Assemble a report from page text. Fields the text does not yield stay absent.
pub fn build_report(
    text: &str,
    chart_image: Option<Vec<u8>>,
    source_label: &str,
    timestamp: String,
) -> PriceReport {
    let fields = extract_fields(text);

    let derived = match (&fields.current_price, &fields.previous_close) {
        (Some(current), Some(previous)) => {
            let derived = derive_change(current, previous);
            if derived.is_none() {
                tracing::debug!("Could not derive change from {current} and {previous}");
            }
            derived
        }
        _ => None,
    };

    let (change, percent_change, trend) = match derived {
        Some(d) => (Some(d.change), Some(d.percent_change), Some(d.trend)),
        None => (None, None, None),
    };

    PriceReport {
        metal: METAL.to_string(),
        exchange: EXCHANGE.to_string(),
        currency: CURRENCY.to_string(),
        current_price: fields.current_price,
        open: fields.open,
        previous_close: fields.previous_close,
        fifty_two_week_low: fields.fifty_two_week_low,
        fifty_two_week_high: fields.fifty_two_week_high,
        volume: fields.volume,
        open_interest_lots: fields.open_interest_lots,
        lot_size: fields.lot_size,
        change,
        percent_change,
        trend,
        timestamp,
        source: source_label.to_string(),
        chart_image,
    }
}

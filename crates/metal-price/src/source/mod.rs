//! Page acquisition by plain HTTP or a headless browser render.
//!
//! Both sources hand back the page as text ready for field extraction. Each
//! `acquire` call owns its connection or browser process end to end; nothing
//! is pooled or reused across calls.

pub mod browser;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::PriceResult;

pub use browser::{find_chromium, BrowserSource};
pub use http::HttpSource;

/// How a page was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMethod {
    Http,
    Browser,
}

/// A fetched page, reduced to what extraction needs.
#[derive(Debug, Clone)]
pub struct Page {
    /// Visible page text.
    pub text: String,
    /// Full-page PNG, only from a browser render with capture enabled.
    pub screenshot: Option<Vec<u8>>,
    pub method: AcquisitionMethod,
}

/// Something that can turn a URL into page text.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url` once. Failures are fatal to the caller's fetch.
    async fn acquire(&self, url: &str) -> PriceResult<Page>;
    /// Whether this source can run on this machine.
    fn is_available(&self) -> bool {
        true
    }
}

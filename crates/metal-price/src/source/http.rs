//! Single-shot HTTP GET wrapping reqwest.

use std::time::Duration;

use async_trait::async_trait;

use super::{AcquisitionMethod, Page, PageSource};
use crate::extract::page_text;
use crate::types::{PriceError, PriceResult};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

/// Plain HTTP page source. One request per `acquire`, no retry.
#[derive(Debug, Clone)]
pub struct HttpSource {
    timeout: Duration,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn client(&self) -> PriceResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PriceError::Transport(format!("failed to build HTTP client: {e}")))
    }

    /// Configured timeout in milliseconds, saturating at `u64::MAX`.
    fn timeout_millis(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn map_error(&self, e: reqwest::Error) -> PriceError {
        if e.is_timeout() {
            PriceError::Timeout(self.timeout_millis())
        } else {
            PriceError::Transport(e.to_string())
        }
    }

    /// GET `url` and return the raw body.
    pub async fn get(&self, url: &str) -> PriceResult<String> {
        let client = self.client()?;

        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PriceError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.text().await.map_err(|e| self.map_error(e))
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn acquire(&self, url: &str) -> PriceResult<Page> {
        let body = self.get(url).await?;
        tracing::debug!("Fetched {} bytes from {url}", body.len());

        // scraper's DOM is !Send; keep it off the async executor.
        let text = tokio::task::spawn_blocking(move || page_text(&body))
            .await
            .map_err(|e| PriceError::Transport(format!("page parse task failed: {e}")))?;

        Ok(Page {
            text,
            screenshot: None,
            method: AcquisitionMethod::Http,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_millis() {
        assert_eq!(HttpSource::new(Duration::from_secs(10)).timeout_millis(), 10_000);
        assert_eq!(HttpSource::new(Duration::MAX).timeout_millis(), u64::MAX);
    }
}

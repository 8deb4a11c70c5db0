//! Headless Chromium page source using chromiumoxide.

use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page as ChromiumPage, ScreenshotParams};
use futures::{Stream, StreamExt};

use super::{AcquisitionMethod, Page, PageSource};
use crate::extract::has_primary_quote;
use crate::types::{PriceError, PriceResult};

/// Environment variable naming an explicit Chromium binary.
pub const CHROMIUM_PATH_ENV: &str = "METAL_PRICE_CHROMIUM_PATH";

/// Browser executables looked up on `PATH`, most specific first.
const SYSTEM_BROWSERS: &[&str] = &["google-chrome", "chromium", "chromium-browser"];

const MACOS_CHROME: &str = "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome";

const VISIBLE_TEXT_JS: &str = "document.body ? document.body.innerText : ''";

/// Chrome for Testing builds unpacked under `~/.metal-price/chromium`.
fn user_installs(home: &Path) -> Vec<PathBuf> {
    let root = home.join(".metal-price").join("chromium");
    if cfg!(target_os = "macos") {
        ["chrome-mac-arm64", "chrome-mac-x64"]
            .iter()
            .map(|arch| {
                root.join(arch)
                    .join("Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing")
            })
            .collect()
    } else {
        vec![root.join("chrome-linux64").join("chrome"), root.join("chrome")]
    }
}

/// Pick a browser from an explicit path, then a user install under `home`,
/// then `PATH`, then the stock macOS location.
fn locate_chromium(configured: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
    let local = home.as_deref().map(user_installs).unwrap_or_default();
    configured
        .into_iter()
        .chain(local)
        .find(|candidate| candidate.is_file())
        .or_else(|| SYSTEM_BROWSERS.iter().find_map(|name| which::which(name).ok()))
        .or_else(|| {
            let stock = PathBuf::from(MACOS_CHROME);
            (cfg!(target_os = "macos") && stock.is_file()).then_some(stock)
        })
}

/// Find a Chromium binary, honouring `METAL_PRICE_CHROMIUM_PATH`.
pub fn find_chromium() -> Option<PathBuf> {
    locate_chromium(
        std::env::var_os(CHROMIUM_PATH_ENV).map(PathBuf::from),
        dirs::home_dir(),
    )
}

/// Drive the CDP event stream until the browser goes away. Errors are
/// per-event and the stream keeps going after them; returns the number of
/// events seen.
async fn drain_events<S, T, E>(mut events: S) -> usize
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: Display,
{
    let mut seen = 0;
    while let Some(event) = events.next().await {
        seen += 1;
        if let Err(e) = event {
            tracing::debug!("Chromium event error: {e}");
        }
    }
    seen
}

/// Read page text until it carries the traded price or `settle` runs out.
/// Every read is bounded by the time left, so a stuck read cannot hold the
/// caller past the deadline. Returns the last text read.
async fn poll_for_quote<F, Fut>(mut read: F, settle: Duration, poll: Duration) -> PriceResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PriceResult<String>>,
{
    let deadline = Instant::now() + settle;
    let mut last = String::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, read()).await {
            Ok(text) => {
                let text = text?;
                if has_primary_quote(&text) {
                    return Ok(text);
                }
                last = text;
            }
            Err(_) => {
                tracing::warn!("Page text read did not finish before the settle deadline");
                break;
            }
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(poll.min(remaining)).await;
    }
    tracing::warn!(
        "Quote not rendered within {} ms, extracting what is there",
        settle.as_millis()
    );
    Ok(last)
}

/// Renders the page in a fresh headless browser for every call.
#[derive(Debug, Clone)]
pub struct BrowserSource {
    chromium_path: Option<PathBuf>,
    navigation_timeout: Duration,
    settle_timeout: Duration,
    poll_interval: Duration,
    capture_screenshot: bool,
}

impl BrowserSource {
    pub fn new(navigation_timeout: Duration, settle_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            chromium_path: None,
            navigation_timeout,
            settle_timeout,
            poll_interval,
            capture_screenshot: false,
        }
    }

    /// Use this binary instead of searching for one.
    pub fn with_chromium_path(mut self, path: Option<PathBuf>) -> Self {
        self.chromium_path = path;
        self
    }

    /// Capture a full-page PNG once the quote has rendered.
    pub fn with_screenshot(mut self, capture: bool) -> Self {
        self.capture_screenshot = capture;
        self
    }

    fn executable(&self) -> Option<PathBuf> {
        match &self.chromium_path {
            Some(path) if path.is_file() => Some(path.clone()),
            Some(path) => {
                tracing::warn!("Configured Chromium {} does not exist", path.display());
                find_chromium()
            }
            None => find_chromium(),
        }
    }

    async fn launch(&self) -> PriceResult<(Browser, tokio::task::JoinHandle<usize>)> {
        let chrome_path = self.executable().ok_or_else(|| {
            PriceError::BrowserUnavailable(format!(
                "Chromium not found. Install Chrome or set {CHROMIUM_PATH_ENV}."
            ))
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| PriceError::Render(format!("failed to build browser config: {e}")))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| PriceError::Render(format!("failed to launch Chromium: {e}")))?;

        let events = tokio::spawn(drain_events(handler));

        Ok((browser, events))
    }

    async fn visible_text(page: &ChromiumPage) -> PriceResult<String> {
        page.evaluate(VISIBLE_TEXT_JS)
            .await
            .map_err(|e| PriceError::Render(format!("failed to read page text: {e}")))?
            .into_value::<String>()
            .map_err(|e| PriceError::Render(format!("failed to convert page text: {e:?}")))
    }

    async fn render(&self, browser: &Browser, url: &str) -> PriceResult<Page> {
        let start = Instant::now();
        let page = tokio::time::timeout(self.navigation_timeout, browser.new_page(url))
            .await
            .map_err(|_| {
                PriceError::Render(format!(
                    "navigation timed out after {} ms",
                    self.navigation_timeout.as_millis()
                ))
            })?
            .map_err(|e| PriceError::Render(format!("navigation failed: {e}")))?;

        let text = poll_for_quote(
            || Self::visible_text(&page),
            self.settle_timeout,
            self.poll_interval,
        )
        .await?;
        tracing::debug!(
            "Rendered {url} in {} ms ({} chars)",
            start.elapsed().as_millis(),
            text.len()
        );

        let screenshot = if self.capture_screenshot {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build();
            match page.screenshot(params).await {
                Ok(png) => Some(png),
                Err(e) => {
                    tracing::warn!("Screenshot failed: {e}");
                    None
                }
            }
        } else {
            None
        };

        if let Err(e) = page.close().await {
            tracing::warn!("Failed to close page: {e}");
        }

        Ok(Page {
            text,
            screenshot,
            method: AcquisitionMethod::Browser,
        })
    }
}

#[async_trait]
impl PageSource for BrowserSource {
    async fn acquire(&self, url: &str) -> PriceResult<Page> {
        let (mut browser, events) = self.launch().await?;

        let result = self.render(&browser, url).await;

        // Tear the process down whether or not the render worked.
        if let Err(e) = browser.close().await {
            tracing::warn!("Failed to close Chromium: {e}");
        }
        if let Err(e) = browser.wait().await {
            tracing::warn!("Failed to reap Chromium: {e}");
        }
        events.abort();

        result
    }

    fn is_available(&self) -> bool {
        self.executable().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_configured_path_is_not_used() {
        let source = BrowserSource::new(
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::from_millis(100),
        )
        .with_chromium_path(Some(PathBuf::from("/nonexistent/chrome-binary")));
        assert_ne!(
            source.executable(),
            Some(PathBuf::from("/nonexistent/chrome-binary"))
        );
    }

    #[test]
    fn test_configured_browser_wins() {
        let existing = std::env::current_exe().unwrap();
        assert_eq!(
            locate_chromium(Some(existing.clone()), None),
            Some(existing)
        );
    }

    #[test]
    fn test_user_installs_live_under_home() {
        let home = PathBuf::from("/home/trader");
        let installs = user_installs(&home);
        assert!(!installs.is_empty());
        assert!(installs
            .iter()
            .all(|p| p.starts_with("/home/trader/.metal-price/chromium")));
    }

    #[tokio::test]
    async fn test_event_errors_do_not_stop_draining() {
        let events = futures::stream::iter(vec![
            Ok(()),
            Err("unknown CDP event"),
            Ok(()),
            Ok(()),
        ]);
        assert_eq!(drain_events(events).await, 4);
    }

    #[tokio::test]
    async fn test_poll_returns_once_quote_renders() {
        let mut reads = vec![
            "Silver 5 Dec Fut \u{20B9}5,432.10".to_string(),
            "Loading".to_string(),
        ];
        let text = poll_for_quote(
            || {
                let next = reads.pop().unwrap_or_default();
                async move { Ok(next) }
            },
            Duration::from_secs(5),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert!(text.contains("5,432.10"));
    }

    #[tokio::test]
    async fn test_stuck_read_is_cut_off_at_settle_deadline() {
        let start = Instant::now();
        let text = tokio::time::timeout(
            Duration::from_secs(5),
            poll_for_quote(
                || futures::future::pending::<PriceResult<String>>(),
                Duration::from_millis(200),
                Duration::from_millis(50),
            ),
        )
        .await
        .expect("settle deadline not enforced")
        .unwrap();
        assert!(text.is_empty());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_settle_keeps_last_text_without_quote() {
        let text = poll_for_quote(
            || async { Ok("Open 5,400.00".to_string()) },
            Duration::from_millis(150),
            Duration::from_millis(20),
        )
        .await
        .unwrap();
        assert_eq!(text, "Open 5,400.00");
    }

    #[tokio::test]
    async fn test_read_error_propagates() {
        let err = poll_for_quote(
            || async { Err(PriceError::Render("target closed".into())) },
            Duration::from_secs(1),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
        assert!(err.is_render());
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_renders_quote() {
        let source = BrowserSource::new(
            Duration::from_secs(10),
            Duration::from_secs(2),
            Duration::from_millis(100),
        )
        .with_screenshot(true);

        let page = source
            .acquire("data:text/html,<h1>Silver 5 Dec Fut</h1><p>%E2%82%B95,432.10</p>")
            .await
            .expect("render failed");

        assert_eq!(page.method, AcquisitionMethod::Browser);
        assert!(page.text.contains("5,432.10"));
        let png = page.screenshot.expect("screenshot missing");
        assert_eq!(&png[..4], b"\x89PNG");
    }
}

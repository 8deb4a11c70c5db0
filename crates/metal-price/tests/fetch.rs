//! End-to-end fetches against a local HTTP fixture.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use metal_price::{FetchConfig, FetchMode, PriceError, PriceFetcher, Trend};

const QUOTE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>MCX Silver Futures</title>
  <script>window.__STATE__ = {"banner": "Open 1.00"};</script>
</head>
<body>
  <header><a href="/">Invest from &#8377;100 a month</a></header>
  <main>
    <h1>Silver 5 Dec Fut</h1>
    <div class="ltp"><span>&#8377;5,432.10</span><span>+32.10 (0.59%)</span></div>
    <table class="stats">
      <tr><td>Open</td><td>5,400.00</td></tr>
      <tr><td>Prev. Close</td><td>5,400.00</td></tr>
      <tr><td>52W Low</td><td>4,120.55</td></tr>
      <tr><td>52W High</td><td>6,010.00</td></tr>
      <tr><td>Volume (qty)</td><td>12,345</td></tr>
      <tr><td>Open Interest (lots)</td><td>8,765</td></tr>
      <tr><td>Lot Size</td><td>30</td></tr>
    </table>
  </main>
</body>
</html>"#;

const PAGE_PATH: &str = "/commodities/futures/mcx_silver";

fn http_config(server: &MockServer) -> FetchConfig {
    FetchConfig {
        url: format!("{}{PAGE_PATH}", server.uri()),
        http_timeout: Duration::from_secs(2),
        mode: FetchMode::Http,
        ..FetchConfig::default()
    }
}

async fn serve(body: &str, status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_full_quote_page() {
    let server = serve(QUOTE_PAGE, 200).await;
    let fetcher = PriceFetcher::new(http_config(&server)).unwrap();

    let report = fetcher.fetch_price().await.unwrap();

    assert_eq!(report.metal, "Silver");
    assert_eq!(report.exchange, "MCX");
    assert_eq!(report.currency, "INR");
    assert_eq!(report.source, "Groww.in");
    assert_eq!(report.current_price.as_deref(), Some("5,432.10"));
    assert_eq!(report.open.as_deref(), Some("5,400.00"));
    assert_eq!(report.previous_close.as_deref(), Some("5,400.00"));
    assert_eq!(report.fifty_two_week_low.as_deref(), Some("4,120.55"));
    assert_eq!(report.fifty_two_week_high.as_deref(), Some("6,010.00"));
    assert_eq!(report.volume.as_deref(), Some("12,345"));
    assert_eq!(report.open_interest_lots.as_deref(), Some("8,765"));
    assert_eq!(report.lot_size.as_deref(), Some("30"));
    assert_eq!(report.change.as_deref(), Some("+32.10"));
    assert_eq!(report.percent_change.as_deref(), Some("+0.59%"));
    assert_eq!(report.trend, Some(Trend::Up));
    assert!(report.chart_image.is_none());
}

#[tokio::test]
async fn test_server_rendered_markup_keeps_price() {
    let body = r#"<main><h1>Silver 5 Dec Fut</h1>
        <div class="ltp"><span>&#8377;<!-- -->5,432.10</span></div>
        <div><span>Prev. Close</span><span>5,400.00</span></div></main>"#;
    let server = serve(body, 200).await;
    let fetcher = PriceFetcher::new(http_config(&server)).unwrap();

    let report = fetcher.fetch_price().await.unwrap();

    assert_eq!(report.current_price.as_deref(), Some("5,432.10"));
    assert_eq!(report.previous_close.as_deref(), Some("5,400.00"));
    assert_eq!(report.change.as_deref(), Some("+32.10"));
}

#[tokio::test]
async fn test_sparse_page_omits_missing_fields() {
    let server = serve("<p>Volume (qty) 12,345</p><p>Lot Size 30</p>", 200).await;
    let fetcher = PriceFetcher::new(http_config(&server)).unwrap();

    let report = fetcher.fetch_price().await.unwrap();
    let json = serde_json::to_value(&report).unwrap();
    let obj = json.as_object().unwrap();

    assert_eq!(obj["volume"], "12,345");
    assert_eq!(obj["lot_size"], "30");
    for absent in [
        "current_price",
        "open",
        "previous_close",
        "change",
        "percent_change",
        "trend",
    ] {
        assert!(!obj.contains_key(absent), "{absent} should be absent");
    }
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let server = serve("oops", 500).await;
    let fetcher = PriceFetcher::new(http_config(&server)).unwrap();

    let err = fetcher.fetch_price().await.unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, PriceError::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(QUOTE_PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = FetchConfig {
        http_timeout: Duration::from_millis(200),
        ..http_config(&server)
    };
    let fetcher = PriceFetcher::new(config).unwrap();

    let err = fetcher.fetch_price().await.unwrap_err();
    assert!(matches!(err, PriceError::Timeout(200)), "got {err}");
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = FetchConfig {
        url: format!("http://127.0.0.1:{port}/"),
        mode: FetchMode::Http,
        ..FetchConfig::default()
    };
    let fetcher = PriceFetcher::new(config).unwrap();

    let err = fetcher.fetch_price().await.unwrap_err();
    assert!(err.is_transport(), "got {err}");
}

#[tokio::test]
async fn test_auto_mode_uses_http_when_quote_present() {
    let server = serve(QUOTE_PAGE, 200).await;
    let config = FetchConfig {
        mode: FetchMode::Auto,
        ..http_config(&server)
    };
    let fetcher = PriceFetcher::new(config).unwrap();

    let report = fetcher.fetch_price().await.unwrap();
    assert_eq!(report.current_price.as_deref(), Some("5,432.10"));
}

#[tokio::test]
async fn test_sequential_fetches_are_independent_and_ordered() {
    let server = serve(QUOTE_PAGE, 200).await;
    let fetcher = PriceFetcher::new(http_config(&server)).unwrap();

    let first = fetcher.fetch_price().await.unwrap();
    let second = fetcher.fetch_price().await.unwrap();

    assert!(first.timestamp <= second.timestamp);
    assert_eq!(first.current_price, second.current_price);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

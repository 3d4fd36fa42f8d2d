//! Drives `YahooClient` against a one-shot local HTTP server.

use chrono::NaiveDate;
use market_data::error::MarketDataError;
use market_data::{PriceSource, YahooClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const CHART: &str = r#"{"chart":{"result":[{"meta":{"symbol":"XLE","gmtoffset":-18000},"timestamp":[1704205800,1704292200],"indicators":{"quote":[{"close":[84.1,85.3]}],"adjclose":[{"adjclose":[83.9,85.1]}]}}],"error":null}}"#;

const NOT_FOUND: &str = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;

/// Serves `body` once and hands back the request line it received.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        String::from_utf8_lossy(&request)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    });

    (base_url, handle)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn fetches_adjusted_prices() {
    let (base_url, server) = serve_once("200 OK", CHART).await;
    let client = YahooClient::new(Some(&base_url)).unwrap();

    let series = client
        .fetch_prices("XLE", date(2024, 1, 1), date(2024, 1, 31))
        .await
        .unwrap();

    assert_eq!(series.ticker(), "XLE");
    assert_eq!(series.len(), 2);
    assert_eq!(series.first_date(), Some(date(2024, 1, 2)));

    let request_line = server.await.unwrap();
    assert!(request_line.starts_with("GET /v8/finance/chart/XLE?period1=1704067200"));
}

#[tokio::test]
async fn not_found_is_an_upstream_error() {
    let (base_url, _server) = serve_once("404 Not Found", NOT_FOUND).await;
    let client = YahooClient::new(Some(&base_url)).unwrap();

    let err = client
        .fetch_prices("NOPE", date(2024, 1, 1), date(2024, 1, 31))
        .await
        .unwrap_err();

    assert!(matches!(err, MarketDataError::Upstream(_)));
}

#[tokio::test]
async fn non_json_failures_keep_the_status() {
    let (base_url, _server) = serve_once("502 Bad Gateway", "upstream unavailable").await;
    let client = YahooClient::new(Some(&base_url)).unwrap();

    let err = client
        .fetch_prices("XLE", date(2024, 1, 1), date(2024, 1, 31))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("502"));
}

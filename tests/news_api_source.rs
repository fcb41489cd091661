// tests/news_api_source.rs
//
// NewsAPI adapter against a local mock of `/v2/everything`.
//
// Covered:
// - availability probe (ok / 401 / 429 / timeout / refused / no key)
// - paging: short page stops, totalResults stops, max_results cap
// - 429 mid-paging keeps earlier pages
// - malformed dates and duplicate titles are dropped

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use financial_news_sentiment::ingest::providers::{NewsApiConfig, NewsApiSource};
use financial_news_sentiment::HeadlineSource;

#[derive(Default)]
struct Mock {
    /// Articles the upstream pretends to hold.
    total: usize,
    /// Overrides `totalResults` in responses.
    reported_total: Option<usize>,
    probe_status: Option<u16>,
    probe_delay: Option<Duration>,
    /// Page number that answers 429.
    rate_limit_page: Option<usize>,
    extra_articles: Vec<Value>,
    probes: AtomicUsize,
    pages: AtomicUsize,
}

fn article(i: usize) -> Value {
    json!({
        "title": format!("Headline {i}"),
        "url": format!("https://news.test/{i}"),
        "publishedAt": "2024-05-01T10:00:00Z",
        "source": { "id": null, "name": "Mock Wire" }
    })
}

async fn everything(
    State(mock): State<Arc<Mock>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let page_size: usize = q.get("pageSize").and_then(|s| s.parse().ok()).unwrap_or(100);

    // probe requests carry no page parameter
    let Some(page) = q.get("page").and_then(|s| s.parse::<usize>().ok()) else {
        mock.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = mock.probe_delay {
            tokio::time::sleep(delay).await;
        }
        let status = mock.probe_status.unwrap_or(200);
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
        return (status, Json(json!({ "status": "ok", "totalResults": 1, "articles": [] })))
            .into_response();
    };

    mock.pages.fetch_add(1, Ordering::SeqCst);
    if mock.rate_limit_page == Some(page) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "status": "error", "code": "rateLimited" })),
        )
            .into_response();
    }

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(mock.total);
    let mut articles: Vec<Value> = (start..end.max(start)).map(article).collect();
    if page == 1 {
        articles.splice(0..0, mock.extra_articles.iter().cloned());
    }
    Json(json!({
        "status": "ok",
        "totalResults": mock.reported_total.unwrap_or(mock.total),
        "articles": articles,
    }))
    .into_response()
}

async fn spawn_mock(mock: Arc<Mock>) -> SocketAddr {
    let app = Router::new()
        .route("/v2/everything", get(everything))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn source_for(addr: SocketAddr, key: &str) -> NewsApiSource {
    NewsApiSource::new(NewsApiConfig {
        api_key: key.to_string(),
        base_url: format!("http://{addr}"),
        timeout: Duration::from_secs(5),
        probe_timeout: Duration::from_millis(300),
    })
    .expect("client")
}

async fn with_mock(mock: Mock) -> (Arc<Mock>, NewsApiSource) {
    let mock = Arc::new(mock);
    let addr = spawn_mock(mock.clone()).await;
    (mock, source_for(addr, "test-key-0123456789"))
}

#[tokio::test]
async fn probe_ok_means_available() {
    let (mock, src) = with_mock(Mock::default()).await;
    assert!(src.is_available().await);
    assert_eq!(mock.probes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn probe_rejections_mean_unavailable() {
    for status in [401u16, 429, 500] {
        let (_, src) = with_mock(Mock {
            probe_status: Some(status),
            ..Mock::default()
        })
        .await;
        assert!(!src.is_available().await, "status {status}");
    }
}

#[tokio::test]
async fn slow_probe_times_out_as_unavailable() {
    let (_, src) = with_mock(Mock {
        probe_delay: Some(Duration::from_secs(2)),
        ..Mock::default()
    })
    .await;
    assert!(!src.is_available().await);
}

#[tokio::test]
async fn refused_connection_is_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let src = source_for(addr, "test-key-0123456789");
    assert!(!src.is_available().await);
}

#[tokio::test]
async fn missing_key_skips_the_probe() {
    let mock = Arc::new(Mock::default());
    let addr = spawn_mock(mock.clone()).await;
    let src = source_for(addr, "");
    assert!(!src.is_available().await);
    assert_eq!(mock.probes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn short_page_ends_paging() {
    let (mock, src) = with_mock(Mock {
        total: 30,
        ..Mock::default()
    })
    .await;
    let items = src.fetch("AAPL", 7, 100).await.expect("fetch");
    assert_eq!(items.len(), 30);
    assert_eq!(mock.pages.load(Ordering::SeqCst), 1);
    assert!(items.iter().all(|i| i.ticker == "AAPL" && i.publisher == "Mock Wire"));
}

#[tokio::test]
async fn pages_until_max_results() {
    let (mock, src) = with_mock(Mock {
        total: 1_000,
        ..Mock::default()
    })
    .await;
    let items = src.fetch("MSFT", 7, 230).await.expect("fetch");
    assert_eq!(items.len(), 230);
    assert_eq!(mock.pages.load(Ordering::SeqCst), 3);
    assert_eq!(items[0].title, "Headline 0");
    assert_eq!(items[229].title, "Headline 229");
}

#[tokio::test]
async fn reported_total_ends_paging() {
    let (mock, src) = with_mock(Mock {
        total: 1_000,
        reported_total: Some(100),
        ..Mock::default()
    })
    .await;
    let items = src.fetch("MSFT", 7, 300).await.expect("fetch");
    assert_eq!(items.len(), 100);
    assert_eq!(mock.pages.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rate_limit_mid_paging_keeps_collected_pages() {
    let (mock, src) = with_mock(Mock {
        total: 1_000,
        rate_limit_page: Some(2),
        ..Mock::default()
    })
    .await;
    let items = src.fetch("TSLA", 7, 250).await.expect("fetch");
    assert_eq!(items.len(), 100);
    assert_eq!(mock.pages.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rate_limit_on_first_page_is_empty_not_error() {
    let (_, src) = with_mock(Mock {
        total: 50,
        rate_limit_page: Some(1),
        ..Mock::default()
    })
    .await;
    let items = src.fetch("TSLA", 7, 50).await.expect("fetch");
    assert!(items.is_empty());
}

#[tokio::test]
async fn malformed_and_duplicate_articles_are_dropped() {
    let (_, src) = with_mock(Mock {
        total: 3,
        extra_articles: vec![
            json!({ "title": "Bad date", "url": "u", "publishedAt": "yesterday", "source": { "name": "X" } }),
            json!({ "title": null, "url": "u", "publishedAt": "2024-05-01T10:00:00Z", "source": { "name": "X" } }),
            json!({ "title": "  headline 0 ", "url": "u", "publishedAt": "2024-05-01T09:00:00Z", "source": { "name": "X" } }),
        ],
        ..Mock::default()
    })
    .await;
    let items = src.fetch("AAPL", 7, 100).await.expect("fetch");
    let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
    // first spelling of a normalized title wins
    assert_eq!(titles, vec!["  headline 0 ", "Headline 1", "Headline 2"]);
}

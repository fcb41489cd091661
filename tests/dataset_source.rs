// tests/dataset_source.rs
//
// Static CSV source read from disk through the HeadlineSource trait.

use std::io::Write;

use chrono::{Duration, Utc};
use financial_news_sentiment::ingest::providers::DatasetSource;
use financial_news_sentiment::ingest::types::DATE_FORMAT;
use financial_news_sentiment::{HeadlineSource, SourceError};

fn ago(days: i64) -> String {
    (Utc::now() - Duration::days(days)).format(DATE_FORMAT).to_string()
}

fn write_csv(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("news.csv");
    let mut f = std::fs::File::create(&path).expect("create csv");
    f.write_all(body.as_bytes()).expect("write csv");
    path
}

#[tokio::test]
async fn reads_ticker_and_general_rows_inside_window() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = format!(
        "ticker,title,publisher,link,published_date\n\
         AAPL,Apple unveils new chip,Wire,https://d.test/1,{}\n\
         GENERAL,Stocks rally broadly,Wire,https://d.test/2,{}\n\
         MSFT,Microsoft cloud growth,Wire,https://d.test/3,{}\n\
         AAPL,Old Apple story,Wire,https://d.test/4,{}\n\
         AAPL,,Wire,https://d.test/5,{}\n\
         AAPL,Broken date,Wire,https://d.test/6,not-a-date\n",
        ago(1),
        ago(2),
        ago(1),
        ago(40),
        ago(1),
    );
    let src = DatasetSource::new(write_csv(&dir, &body));

    let items = src.fetch("AAPL", 7, 100).await.expect("fetch");
    let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Apple unveils new chip", "Stocks rally broadly"]);
    // general rows are re-tagged for the requested ticker
    assert!(items.iter().all(|i| i.ticker == "AAPL"));

    let wide = src.fetch("AAPL", 60, 100).await.expect("fetch wide");
    assert_eq!(wide.len(), 3);
}

#[tokio::test]
async fn missing_file_is_a_dataset_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let src = DatasetSource::new(dir.path().join("absent.csv"));
    let err = src.fetch("AAPL", 7, 100).await.expect_err("should fail");
    assert!(matches!(err, SourceError::Dataset(_)), "{err:?}");
}

#[tokio::test]
async fn missing_required_column_is_a_dataset_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let src = DatasetSource::new(write_csv(&dir, "ticker,headline,published_date\nAAPL,x,2024-01-01\n"));
    let err = src.fetch("AAPL", 7, 100).await.expect_err("should fail");
    assert!(matches!(err, SourceError::Dataset(_)), "{err:?}");
}

#[tokio::test]
async fn bundled_demo_dataset_parses() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data/demo_financial_news.csv");
    let src = DatasetSource::new(&path);
    // a window wide enough to cover every bundled row
    let items = src.fetch("AAPL", 36_500, 1_000).await.expect("fetch demo");
    assert!(!items.is_empty());
    assert!(items.iter().all(|i| !i.title.trim().is_empty()));
}

// src/ingest/providers/dataset.rs
//! Secondary source: static CSV dataset with historical headlines.
//!
//! Columns: `ticker,title,publisher,link,published_date`. Rows tagged
//! `GENERAL` apply to every ticker. Lines starting with `#` are comments.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use metrics::counter;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::ingest::types::{window_start, HeadlineRecord, HeadlineSource, SourceError, DATE_FORMAT};

pub const GENERAL_TICKER: &str = "GENERAL";

#[derive(Debug, Deserialize)]
struct Row {
    ticker: String,
    title: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    link: String,
    published_date: String,
}

pub struct DatasetSource {
    path: PathBuf,
}

impl DatasetSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, RFC 3339 and bare dates (midnight UTC).
pub fn parse_dataset_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(n) = NaiveDateTime::parse_from_str(raw, DATE_FORMAT) {
        return Some(n.and_utc());
    }
    if let Ok(d) = DateTime::parse_from_rfc3339(raw) {
        return Some(d.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// Filter CSV content for `ticker` (or `GENERAL`) rows at or after `cutoff`.
pub fn select_rows(
    content: &[u8],
    ticker: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<HeadlineRecord>, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(content);

    let headers = rdr.headers()?.clone();
    for required in ["ticker", "title", "published_date"] {
        if !headers.iter().any(|h| h == required) {
            return Err(SourceError::Dataset(format!("missing column `{required}`")));
        }
    }

    let mut out = Vec::new();
    let mut malformed = 0usize;
    for row in rdr.deserialize::<Row>() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                malformed += 1;
                debug!(target: "dataset", error = %e, "skipping unreadable row");
                continue;
            }
        };

        let row_ticker = row.ticker.to_ascii_uppercase();
        if row_ticker != ticker && row_ticker != GENERAL_TICKER {
            continue;
        }
        if row.title.is_empty() {
            malformed += 1;
            continue;
        }
        let Some(published) = parse_dataset_date(&row.published_date) else {
            malformed += 1;
            continue;
        };
        if published < cutoff {
            continue;
        }
        out.push(HeadlineRecord::new(
            row.title,
            row.publisher,
            row.link,
            published,
            ticker,
        ));
    }

    if malformed > 0 {
        warn!(target: "dataset", malformed, "dropped malformed dataset rows");
        counter!("news_malformed_items_total", "source" => "dataset").increment(malformed as u64);
    }
    Ok(out)
}

#[async_trait]
impl HeadlineSource for DatasetSource {
    fn name(&self) -> &'static str {
        "Dataset"
    }

    async fn fetch(
        &self,
        ticker: &str,
        days: u32,
        _max_results: usize,
    ) -> Result<Vec<HeadlineRecord>, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::Dataset(format!(
                "dataset not found at {}",
                self.path.display()
            )));
        }
        if days > 30 {
            info!(target: "dataset", %ticker, days, "historical lookup in static dataset");
        }

        let content = tokio::fs::read(&self.path).await?;
        let cutoff = window_start(Utc::now(), days);
        let out = select_rows(&content, ticker, cutoff)?;
        info!(target: "dataset", %ticker, count = out.len(), "dataset items");
        Ok(out)
    }
}

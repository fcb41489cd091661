// src/ingest/types.rs
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::sentiment::Sentiment;

/// Wire format for headline timestamps (second precision, UTC).
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One normalized headline as produced by a source adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeadlineRecord {
    pub title: String,
    pub publisher: String,
    pub link: String,
    #[serde(with = "second_precision")]
    pub published_date: DateTime<Utc>,
    pub ticker: String, // upper-case symbol
}

impl HeadlineRecord {
    pub fn new(
        title: impl Into<String>,
        publisher: impl Into<String>,
        link: impl Into<String>,
        published_date: DateTime<Utc>,
        ticker: &str,
    ) -> Self {
        Self {
            title: title.into(),
            publisher: publisher.into(),
            link: link.into(),
            published_date: published_date.trunc_subsecs(0),
            ticker: ticker.to_ascii_uppercase(),
        }
    }
}

/// Start of a `days`-long lookback window ending at `now`. Windows reaching
/// past the representable range start at the earliest representable instant.
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    chrono::Duration::try_days(i64::from(days.max(1)))
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// A headline with its sentiment attached by the scorer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredHeadline {
    #[serde(flatten)]
    pub headline: HeadlineRecord,
    pub sentiment: Sentiment,
    /// Confidence in [0,1]; polarity lives in `sentiment`.
    pub score: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// A priority-ordered news source. Adapters must not panic; failures are
/// reported as `SourceError` and the pipeline degrades to the next source.
#[async_trait::async_trait]
pub trait HeadlineSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap capability probe. Sources without a probe are always available.
    async fn is_available(&self) -> bool {
        true
    }

    async fn fetch(
        &self,
        ticker: &str,
        days: u32,
        max_results: usize,
    ) -> Result<Vec<HeadlineRecord>, SourceError>;
}

mod second_precision {
    use super::DATE_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, DATE_FORMAT)
            .map(|n| n.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

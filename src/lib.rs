// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod sentiment;
pub mod summary;

use std::sync::Arc;

pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::ingest::types::{HeadlineRecord, HeadlineSource, ScoredHeadline, SourceError};
pub use crate::ingest::{AggregateOutcome, Aggregation, EmptyReason, NewsAggregator};
pub use crate::sentiment::{Analysis, Sentiment, SentimentScorer};
pub use crate::summary::{summarize, TickerSummary};

/// Build the production pipeline from configuration: one shared scorer
/// injected into the aggregator.
pub fn build_aggregator(cfg: &AppConfig) -> anyhow::Result<Arc<NewsAggregator>> {
    let scorer = Arc::new(SentimentScorer::rule_based(&cfg.scorer));
    Ok(Arc::new(NewsAggregator::from_config(cfg, scorer)?))
}

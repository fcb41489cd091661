// src/ingest/mod.rs
//! Aggregation pipeline: primary → secondary → tertiary sources, merged by
//! normalized title, truncated and scored.

pub mod config;
pub mod providers;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::ingest::config::PipelineConfig;
use crate::ingest::providers::{DatasetSource, FallbackSource, NewsApiSource};
use crate::ingest::types::{HeadlineRecord, HeadlineSource, ScoredHeadline};
use crate::sentiment::SentimentScorer;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_aggregations_total", "Aggregation runs.");
        describe_counter!(
            "news_aggregations_empty_total",
            "Aggregation runs that ended with no headlines."
        );
        describe_counter!("news_source_items_total", "Headlines returned per source.");
        describe_counter!("news_source_errors_total", "Source fetch failures.");
        describe_counter!(
            "news_malformed_items_total",
            "Items dropped for missing title or date."
        );
    });
}

/// Key used for duplicate detection only; never stored.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Ordered headline set with first-seen-wins deduplication.
#[derive(Debug, Default)]
pub struct HeadlineSet {
    items: Vec<HeadlineRecord>,
    seen: HashSet<String>,
}

impl HeadlineSet {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append records whose normalized title is new; returns how many were added.
    pub fn extend_unique<I: IntoIterator<Item = HeadlineRecord>>(&mut self, records: I) -> usize {
        let before = self.items.len();
        for r in records {
            let key = normalize_title(&r.title);
            if !key.is_empty() && self.seen.insert(key) {
                self.items.push(r);
            }
        }
        self.items.len() - before
    }

    pub fn truncate(&mut self, max: usize) {
        self.items.truncate(max);
    }

    pub fn into_vec(self) -> Vec<HeadlineRecord> {
        self.items
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    /// Every source came back empty.
    NoHeadlines,
    /// The run hit an internal error and was degraded to empty.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateOutcome {
    Found,
    Empty(EmptyReason),
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub ticker: String,
    pub items: Vec<ScoredHeadline>,
    pub sources_used: Vec<&'static str>,
    pub outcome: AggregateOutcome,
}

impl Aggregation {
    fn failed(ticker: String, reason: String) -> Self {
        Self {
            ticker,
            items: Vec::new(),
            sources_used: Vec::new(),
            outcome: AggregateOutcome::Empty(EmptyReason::Failed(reason)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<ScoredHeadline> {
        self.items
    }
}

pub struct NewsAggregator {
    primary: Arc<dyn HeadlineSource>,
    secondary: Arc<dyn HeadlineSource>,
    tertiary: Arc<dyn HeadlineSource>,
    scorer: Arc<SentimentScorer>,
    cfg: PipelineConfig,
}

impl NewsAggregator {
    pub fn new(
        primary: Arc<dyn HeadlineSource>,
        secondary: Arc<dyn HeadlineSource>,
        tertiary: Arc<dyn HeadlineSource>,
        scorer: Arc<SentimentScorer>,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            tertiary,
            scorer,
            cfg,
        }
    }

    /// Production wiring: NewsAPI → CSV dataset → hardcoded headlines.
    pub fn from_config(app: &AppConfig, scorer: Arc<SentimentScorer>) -> anyhow::Result<Self> {
        let primary = NewsApiSource::new(app.news_api.clone())?;
        Ok(Self::new(
            Arc::new(primary),
            Arc::new(DatasetSource::new(&app.dataset_path)),
            Arc::new(FallbackSource),
            scorer,
            app.pipeline,
        ))
    }

    pub fn scorer(&self) -> &Arc<SentimentScorer> {
        &self.scorer
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Headlines with sentiment for one ticker. Never fails: internal errors
    /// degrade to an empty result tagged `EmptyReason::Failed`.
    pub async fn aggregate(&self, ticker: &str, days: u32, max_results: usize) -> Aggregation {
        ensure_metrics_described();
        counter!("news_aggregations_total").increment(1);

        let ticker = ticker.trim().to_ascii_uppercase();
        let days = days.max(1);
        let max_results = max_results.max(1);
        info!(target: "pipeline", %ticker, days, max_results, "aggregating news");

        let agg = match self.try_aggregate(&ticker, days, max_results).await {
            Ok(a) => a,
            Err(e) => {
                error!(target: "pipeline", %ticker, days, max_results, error = ?e, "aggregation failed");
                Aggregation::failed(ticker, format!("{e:#}"))
            }
        };
        if agg.is_empty() {
            counter!("news_aggregations_empty_total").increment(1);
        }
        agg
    }

    async fn try_aggregate(
        &self,
        ticker: &str,
        days: u32,
        max_results: usize,
    ) -> anyhow::Result<Aggregation> {
        if ticker.is_empty() {
            bail!("empty ticker symbol");
        }

        let mut set = HeadlineSet::default();
        let mut sources_used = Vec::new();

        if self.primary.is_available().await {
            let items = self.fetch_from(&*self.primary, ticker, days, max_results).await;
            if set.extend_unique(items) > 0 {
                sources_used.push(self.primary.name());
            }
        } else {
            warn!(target: "pipeline", source = self.primary.name(), "primary source unavailable, skipping");
        }

        if self.cfg.needs_supplement(days, set.len(), max_results) {
            info!(target: "pipeline", %ticker, primary = set.len(), days, "supplementing from secondary source");
            let items = self.fetch_from(&*self.secondary, ticker, days, max_results).await;
            if !items.is_empty() {
                sources_used.push(self.secondary.name());
            }
            set.extend_unique(items);
        }

        if self.cfg.needs_last_resort(set.len()) {
            info!(target: "pipeline", %ticker, merged = set.len(), "insufficient results, using last-resort source");
            let items = self.fetch_from(&*self.tertiary, ticker, days, max_results).await;
            if !items.is_empty() {
                sources_used.push(self.tertiary.name());
            }
            set.extend_unique(items);
        }

        if set.len() > max_results {
            info!(target: "pipeline", %ticker, from = set.len(), to = max_results, "truncating results");
            set.truncate(max_results);
        }

        let items: Vec<ScoredHeadline> = set
            .into_vec()
            .into_iter()
            .filter(|h| !h.title.trim().is_empty())
            .map(|h| self.score(h))
            .collect();

        info!(
            target: "pipeline",
            %ticker,
            count = items.len(),
            sources = %sources_used.join(", "),
            "aggregation finished"
        );

        let outcome = if items.is_empty() {
            AggregateOutcome::Empty(EmptyReason::NoHeadlines)
        } else {
            AggregateOutcome::Found
        };
        Ok(Aggregation {
            ticker: ticker.to_string(),
            items,
            sources_used,
            outcome,
        })
    }

    async fn fetch_from(
        &self,
        source: &dyn HeadlineSource,
        ticker: &str,
        days: u32,
        max_results: usize,
    ) -> Vec<HeadlineRecord> {
        match source.fetch(ticker, days, max_results).await {
            Ok(items) => {
                counter!("news_source_items_total", "source" => source.name())
                    .increment(items.len() as u64);
                items
            }
            Err(e) => {
                warn!(target: "pipeline", source = source.name(), %ticker, error = %e, "source failed, degrading");
                counter!("news_source_errors_total", "source" => source.name()).increment(1);
                Vec::new()
            }
        }
    }

    fn score(&self, headline: HeadlineRecord) -> ScoredHeadline {
        let preview: String = headline.title.chars().take(50).collect();
        debug!(target: "pipeline", title = %preview, "analyzing sentiment");
        let a = self.scorer.analyze(&headline.title);
        ScoredHeadline {
            headline,
            sentiment: a.sentiment,
            score: a.score,
        }
    }
}

/// Aggregate several tickers concurrently; results follow the input order.
/// Fails only if a ticker task panicked.
pub async fn aggregate_tickers(
    aggregator: Arc<NewsAggregator>,
    tickers: &[String],
    days: u32,
    max_results: usize,
) -> anyhow::Result<Vec<Aggregation>> {
    let mut set = JoinSet::new();
    for (idx, ticker) in tickers.iter().cloned().enumerate() {
        let agg = Arc::clone(&aggregator);
        set.spawn(async move { (idx, agg.aggregate(&ticker, days, max_results).await) });
    }

    let mut slots: Vec<Option<Aggregation>> = vec![None; tickers.len()];
    while let Some(joined) = set.join_next().await {
        let (idx, agg) = joined.context("ticker aggregation task failed")?;
        slots[idx] = Some(agg);
    }
    slots
        .into_iter()
        .map(|s| s.ok_or_else(|| anyhow!("missing aggregation result")))
        .collect()
}

//! # Sentiment scoring
//!
//! `SentimentScorer` wraps a pluggable [`SentimentModel`] with the operational
//! concerns every model needs: input truncation, latency/error accounting and
//! periodic snapshots into the metrics registry.
//!
//! The scorer is constructed once at startup and shared as an `Arc`; counters
//! are atomics so concurrent ticker runs can score in parallel.

pub mod registry;
pub mod rules;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use self::registry::{MetricsRegistry, MetricsSnapshot};
use self::rules::{KeywordConfig, RuleBasedModel};

pub const DEFAULT_MODEL_VERSION: &str = "rule-based-v1";
pub const DEFAULT_REGISTRY_DIR: &str = ".model_registry";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Signed value used for averaging (+1 / 0 / -1).
    pub fn polarity(self) -> f64 {
        match self {
            Sentiment::Positive => 1.0,
            Sentiment::Neutral => 0.0,
            Sentiment::Negative => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCounts {
    pub positive_count: usize,
    pub negative_count: usize,
}

/// Raw model output before the scorer attaches metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub score: f64,
    pub details: Option<KeywordCounts>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("model failure: {0}")]
    Model(String),

    #[error("model produced a non-finite score")]
    NonFiniteScore,
}

/// A replaceable sentiment model. Implementations may fail; the scorer turns
/// failures into a neutral fallback.
pub trait SentimentModel: Send + Sync {
    fn version(&self) -> &str;
    fn classify(&self, text: &str) -> Result<Classification, ScorerError>;
}

/// Result of one `analyze` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub sentiment: Sentiment,
    pub score: f64,
    pub latency_ms: f64,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<KeywordCounts>,
}

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub model_version: String,
    pub registry_dir: PathBuf,
    /// Optional keyword config (JSON or TOML); built-in lists otherwise.
    pub model_path: Option<PathBuf>,
    /// Input is cut to this many characters before classification.
    pub max_length: usize,
    pub flush_interval: Duration,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            registry_dir: PathBuf::from(DEFAULT_REGISTRY_DIR),
            model_path: None,
            max_length: 512,
            flush_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct ScorerStats {
    requests: AtomicU64,
    errors: AtomicU64,
    latency_us_sum: AtomicU64,
    last_flush: Mutex<Instant>,
}

pub struct SentimentScorer {
    model: Box<dyn SentimentModel>,
    max_length: usize,
    flush_interval: Duration,
    registry: MetricsRegistry,
    stats: ScorerStats,
}

impl SentimentScorer {
    pub fn new<M: SentimentModel + 'static>(model: M, cfg: &ScorerConfig) -> Self {
        Self {
            model: Box::new(model),
            max_length: cfg.max_length.max(1),
            flush_interval: cfg.flush_interval,
            registry: MetricsRegistry::new(&cfg.registry_dir),
            stats: ScorerStats {
                requests: AtomicU64::new(0),
                errors: AtomicU64::new(0),
                latency_us_sum: AtomicU64::new(0),
                last_flush: Mutex::new(Instant::now()),
            },
        }
    }

    /// Reference scorer: keyword lists are loaded once here and never reloaded.
    pub fn rule_based(cfg: &ScorerConfig) -> Self {
        let keywords = KeywordConfig::load(cfg.model_path.as_deref());
        let scorer = Self::new(RuleBasedModel::new(&cfg.model_version, keywords), cfg);
        tracing::info!(
            target: "sentiment",
            model_version = %cfg.model_version,
            registry = %cfg.registry_dir.display(),
            "initialized sentiment scorer"
        );
        scorer
    }

    pub fn model_version(&self) -> &str {
        self.model.version()
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Score one text. Never fails: model errors yield neutral/0.5 with
    /// `error` set and are counted.
    pub fn analyze(&self, text: &str) -> Analysis {
        let started = Instant::now();
        self.stats.requests.fetch_add(1, Ordering::Relaxed);
        counter!("sentiment_requests_total").increment(1);

        let text = truncate_chars(text, self.max_length);
        let outcome = self.model.classify(text).and_then(|c| {
            if c.score.is_finite() {
                Ok(c)
            } else {
                Err(ScorerError::NonFiniteScore)
            }
        });

        let elapsed = started.elapsed();
        let latency_ms = elapsed.as_secs_f64() * 1_000.0;

        let analysis = match outcome {
            Ok(c) => {
                self.stats
                    .latency_us_sum
                    .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
                histogram!("sentiment_latency_ms").record(latency_ms);
                Analysis {
                    sentiment: c.sentiment,
                    score: c.score.clamp(0.0, 1.0),
                    latency_ms,
                    model_version: self.model_version().to_string(),
                    error: None,
                    details: c.details,
                }
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                counter!("sentiment_errors_total").increment(1);
                error!(target: "sentiment", error = %e, "sentiment model failed, using neutral fallback");
                Analysis {
                    sentiment: Sentiment::Neutral,
                    score: 0.5,
                    latency_ms,
                    model_version: self.model_version().to_string(),
                    error: Some(e.to_string()),
                    details: None,
                }
            }
        };

        self.maybe_flush();
        analysis
    }

    /// Current aggregate counters (not persisted).
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.stats.requests.load(Ordering::Relaxed);
        let errors = self.stats.errors.load(Ordering::Relaxed);
        let latency_ms_sum = self.stats.latency_us_sum.load(Ordering::Relaxed) as f64 / 1_000.0;
        let denom = requests.max(1) as f64;
        MetricsSnapshot {
            model_version: self.model_version().to_string(),
            timestamp: Utc::now(),
            request_count: requests,
            error_count: errors,
            avg_latency_ms: latency_ms_sum / denom,
            error_rate: errors as f64 / denom,
        }
    }

    /// Append a snapshot right away and reset the flush timer.
    pub fn flush_now(&self) -> anyhow::Result<()> {
        *lock_ignoring_poison(&self.stats.last_flush) = Instant::now();
        self.write_snapshot()
    }

    fn maybe_flush(&self) {
        let due = {
            let mut last = lock_ignoring_poison(&self.stats.last_flush);
            if last.elapsed() > self.flush_interval {
                *last = Instant::now();
                true
            } else {
                false
            }
        };
        if due {
            if let Err(e) = self.write_snapshot() {
                warn!(target: "sentiment", error = ?e, "failed to save model metrics");
            }
        }
    }

    fn write_snapshot(&self) -> anyhow::Result<()> {
        let snap = self.snapshot();
        self.registry.append(&snap)?;
        debug!(
            target: "sentiment",
            avg_latency_ms = snap.avg_latency_ms,
            error_rate = snap.error_rate,
            "saved model metrics"
        );
        Ok(())
    }
}

fn lock_ignoring_poison<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poison) => poison.into_inner(),
    }
}

/// Cut `text` to at most `max` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

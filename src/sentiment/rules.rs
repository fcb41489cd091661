// src/sentiment/rules.rs
//! Keyword-based reference model.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{Classification, KeywordCounts, ScorerError, Sentiment, SentimentModel};

const DEFAULT_POSITIVE: &[&str] = &[
    "surge",
    "record",
    "exceeding",
    "strong",
    "grow",
    "growth",
    "breakthrough",
    "positive",
    "gain",
    "gains",
    "profit",
    "profitable",
    "success",
    "successful",
    "innovation",
    "innovative",
    "opportunity",
    "opportunities",
    "upbeat",
    "optimistic",
];

const DEFAULT_NEGATIVE: &[&str] = &[
    "downgrade",
    "concerns",
    "vulnerabilities",
    "issues",
    "challenges",
    "mount",
    "labor",
    "divided",
    "volatility",
    "fears",
    "recession",
    "loss",
    "losses",
    "debt",
    "decline",
    "fell",
    "fall",
    "drop",
    "bearish",
    "pessimistic",
    "bankruptcy",
    "lawsuit",
    "investigation",
    "regulatory",
    "scrutiny",
    "inflation",
    "shortage",
];

/// Keyword lists for the rule-based model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default = "default_model_type")]
    pub model_type: String,
    #[serde(default)]
    pub positive_keywords: Vec<String>,
    #[serde(default)]
    pub negative_keywords: Vec<String>,
}

fn default_model_type() -> String {
    "rule-based".to_string()
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            model_type: default_model_type(),
            positive_keywords: DEFAULT_POSITIVE.iter().map(|s| s.to_string()).collect(),
            negative_keywords: DEFAULT_NEGATIVE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl KeywordConfig {
    /// Load from `path` when given and present; otherwise (or on any error)
    /// use the built-in lists.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(p) = path else {
            return Self::default();
        };
        if !p.exists() {
            info!(target: "sentiment", path = %p.display(), "model config not found, using built-in keywords");
            return Self::default();
        }
        match Self::load_from(p) {
            Ok(cfg) => {
                info!(
                    target: "sentiment",
                    path = %p.display(),
                    positive = cfg.positive_keywords.len(),
                    negative = cfg.negative_keywords.len(),
                    "loaded keyword config"
                );
                cfg
            }
            Err(e) => {
                error!(target: "sentiment", error = ?e, path = %p.display(), "error loading model config");
                Self::default()
            }
        }
    }

    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading keyword config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_keywords(&content, ext.as_str())
    }

    fn cleaned(self) -> Self {
        Self {
            model_type: self.model_type,
            positive_keywords: clean_list(self.positive_keywords),
            negative_keywords: clean_list(self.negative_keywords),
        }
    }
}

fn parse_keywords(s: &str, hint_ext: &str) -> Result<KeywordConfig> {
    if hint_ext == "toml" {
        return Ok(toml::from_str::<KeywordConfig>(s)?.cleaned());
    }
    if hint_ext == "json" {
        return Ok(serde_json::from_str::<KeywordConfig>(s)?.cleaned());
    }
    // Unknown extension: sniff.
    if let Ok(v) = serde_json::from_str::<KeywordConfig>(s) {
        return Ok(v.cleaned());
    }
    if let Ok(v) = toml::from_str::<KeywordConfig>(s) {
        return Ok(v.cleaned());
    }
    Err(anyhow!("unsupported keyword config format"))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

/// Counts distinct keyword hits (case-insensitive substring, each keyword at
/// most once) and maps the balance to a label with a confidence score.
#[derive(Debug, Clone)]
pub struct RuleBasedModel {
    version: String,
    config: KeywordConfig,
}

impl RuleBasedModel {
    pub fn new(version: &str, config: KeywordConfig) -> Self {
        Self {
            version: version.to_string(),
            config: config.cleaned(),
        }
    }

    pub fn config(&self) -> &KeywordConfig {
        &self.config
    }

    pub fn count_keywords(&self, text: &str) -> KeywordCounts {
        let lowered = text.to_lowercase();
        let hits = |list: &[String]| list.iter().filter(|k| lowered.contains(k.as_str())).count();
        KeywordCounts {
            positive_count: hits(&self.config.positive_keywords),
            negative_count: hits(&self.config.negative_keywords),
        }
    }
}

impl SentimentModel for RuleBasedModel {
    fn version(&self) -> &str {
        &self.version
    }

    fn classify(&self, text: &str) -> Result<Classification, ScorerError> {
        let counts = self.count_keywords(text);
        let mut rng = rand::rng();

        let (sentiment, score) = match counts.positive_count.cmp(&counts.negative_count) {
            std::cmp::Ordering::Greater => {
                let diff = (counts.positive_count - counts.negative_count) as f64;
                (Sentiment::Positive, polar_score(diff) + rng.random_range(0.0..0.05))
            }
            std::cmp::Ordering::Less => {
                let diff = (counts.negative_count - counts.positive_count) as f64;
                (Sentiment::Negative, polar_score(diff) + rng.random_range(0.0..0.05))
            }
            std::cmp::Ordering::Equal => (Sentiment::Neutral, 0.5 + rng.random_range(0.0..0.1)),
        };

        Ok(Classification {
            sentiment,
            score,
            details: Some(counts),
        })
    }
}

fn polar_score(diff: f64) -> f64 {
    (0.7 + 0.1 * diff).min(0.95)
}

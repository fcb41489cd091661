//! # Ticker summary
//! Per-ticker statistics derived from scored headlines.
//!
//! Pure and deterministic; recomputed per request.

use serde::{Deserialize, Serialize};

use crate::ingest::types::ScoredHeadline;
use crate::sentiment::Sentiment;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub total_news: usize,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    /// Mean polarity in [-1, 1].
    pub avg_sentiment_score: f64,
    /// Confidence-weighted polarity in [-1, 1]; 0 when all scores are 0.
    pub weighted_avg_score: f64,
}

pub fn summarize(items: &[ScoredHeadline]) -> TickerSummary {
    if items.is_empty() {
        return TickerSummary::default();
    }

    let mut s = TickerSummary {
        total_news: items.len(),
        ..TickerSummary::default()
    };
    let mut polarity_sum = 0.0;
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for it in items {
        match it.sentiment {
            Sentiment::Positive => s.positive += 1,
            Sentiment::Negative => s.negative += 1,
            Sentiment::Neutral => s.neutral += 1,
        }
        let p = it.sentiment.polarity();
        polarity_sum += p;
        weighted_sum += p * it.score;
        weight_total += it.score;
    }

    s.avg_sentiment_score = polarity_sum / items.len() as f64;
    s.weighted_avg_score = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        0.0
    };
    s
}

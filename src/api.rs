// src/api.rs
//! HTTP surface: thin handlers over the aggregation pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::ingest::types::ScoredHeadline;
use crate::ingest::{aggregate_tickers, NewsAggregator};
use crate::sentiment::registry::MetricsSnapshot;
use crate::summary::{summarize, TickerSummary};

const NEWS_DEFAULT_DAYS: i64 = 7;
const NEWS_DEFAULT_LIMIT: i64 = 100;
const EXPORT_DEFAULT_DAYS: i64 = 30;
const EXPORT_DEFAULT_LIMIT: i64 = 500;
const EXPORT_MIN_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<NewsAggregator>,
}

impl AppState {
    pub fn new(aggregator: Arc<NewsAggregator>) -> Self {
        Self { aggregator }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/news", get(news))
        .route("/api/sentiment_summary", get(sentiment_summary))
        .route("/api/export", get(export))
        .route("/debug/model-metrics", get(debug_model_metrics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    NoTickers,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NoTickers => (
                StatusCode::BAD_REQUEST,
                "at least one ticker symbol is required".to_string(),
            ),
            ApiError::Internal(detail) => {
                error!(target: "api", %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error processing request".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct TickersQuery {
    #[serde(default)]
    tickers: String,
    days: Option<i64>,
    max_results: Option<i64>,
}

/// Split a comma-separated ticker list; trims, upper-cases, drops empties.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn coerce_days(days: Option<i64>, default: i64) -> u32 {
    days.unwrap_or(default).clamp(1, i64::from(u32::MAX)) as u32
}

fn coerce_limit(limit: Option<i64>, default: i64, min: i64) -> usize {
    limit.unwrap_or(default).max(min) as usize
}

async fn collect(
    state: &AppState,
    tickers: &[String],
    days: u32,
    limit: usize,
) -> Result<Vec<(String, Vec<ScoredHeadline>)>, ApiError> {
    if tickers.is_empty() {
        return Err(ApiError::NoTickers);
    }
    let runs = aggregate_tickers(Arc::clone(&state.aggregator), tickers, days, limit)
        .await
        .map_err(|e| ApiError::Internal(format!("{e:#}")))?;
    Ok(runs
        .into_iter()
        .map(|a| (a.ticker.clone(), a.into_items()))
        .collect())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn news(
    State(state): State<AppState>,
    Query(q): Query<TickersQuery>,
) -> Result<Json<Vec<ScoredHeadline>>, ApiError> {
    let tickers = parse_tickers(&q.tickers);
    let days = coerce_days(q.days, NEWS_DEFAULT_DAYS);
    let limit = coerce_limit(q.max_results, NEWS_DEFAULT_LIMIT, 1);

    let mut all: Vec<ScoredHeadline> = collect(&state, &tickers, days, limit)
        .await?
        .into_iter()
        .flat_map(|(_, items)| items)
        .collect();

    // newest first
    all.sort_by(|a, b| b.headline.published_date.cmp(&a.headline.published_date));
    let cap = limit.saturating_mul(2);
    if all.len() > cap {
        tracing::info!(target: "api", from = all.len(), to = cap, "limiting combined results");
        all.truncate(cap);
    }
    Ok(Json(all))
}

async fn sentiment_summary(
    State(state): State<AppState>,
    Query(q): Query<TickersQuery>,
) -> Result<Json<BTreeMap<String, TickerSummary>>, ApiError> {
    let tickers = parse_tickers(&q.tickers);
    let days = coerce_days(q.days, NEWS_DEFAULT_DAYS);
    let limit = coerce_limit(q.max_results, NEWS_DEFAULT_LIMIT, 1);

    let out = collect(&state, &tickers, days, limit)
        .await?
        .into_iter()
        .map(|(ticker, items)| (ticker, summarize(&items)))
        .collect();
    Ok(Json(out))
}

async fn export(
    State(state): State<AppState>,
    Query(q): Query<TickersQuery>,
) -> Result<Json<Vec<ScoredHeadline>>, ApiError> {
    let tickers = parse_tickers(&q.tickers);
    let days = coerce_days(q.days, EXPORT_DEFAULT_DAYS);
    let limit = coerce_limit(q.max_results, EXPORT_DEFAULT_LIMIT, EXPORT_MIN_LIMIT);

    let mut all: Vec<ScoredHeadline> = collect(&state, &tickers, days, limit)
        .await?
        .into_iter()
        .flat_map(|(_, items)| items)
        .collect();

    // chronological for exports
    all.sort_by(|a, b| a.headline.published_date.cmp(&b.headline.published_date));
    all.truncate(limit);
    Ok(Json(all))
}

#[derive(Serialize)]
struct ModelMetricsOut {
    current: MetricsSnapshot,
    history: Vec<MetricsSnapshot>,
}

async fn debug_model_metrics(State(state): State<AppState>) -> Json<ModelMetricsOut> {
    let scorer = state.aggregator.scorer();
    let history = match scorer.registry().load(scorer.model_version()) {
        Ok(h) => h,
        Err(e) => {
            warn!(target: "api", error = ?e, "could not read metrics registry");
            Vec::new()
        }
    };
    Json(ModelMetricsOut {
        current: scorer.snapshot(),
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickers_are_split_trimmed_and_uppercased() {
        assert_eq!(parse_tickers(" aapl, msft ,,TSLA"), vec!["AAPL", "MSFT", "TSLA"]);
        assert!(parse_tickers(" , ").is_empty());
    }

    #[test]
    fn coercion_applies_minimums() {
        assert_eq!(coerce_days(Some(0), 7), 1);
        assert_eq!(coerce_days(Some(-5), 7), 1);
        assert_eq!(coerce_days(None, 7), 7);
        assert_eq!(coerce_limit(Some(3), 500, 10), 10);
        assert_eq!(coerce_limit(None, 100, 1), 100);
        assert_eq!(coerce_limit(Some(-1), 100, 1), 1);
    }
}

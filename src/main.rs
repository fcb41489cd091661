//! Financial News Sentiment Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring config, the shared scorer and routes.

use financial_news_sentiment::{api, build_aggregator, metrics::Metrics, AppConfig, AppState};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Structured logs. `RUST_LOG` wins, then `LOG_LEVEL`, then `info`.
/// `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    // The runtime may already own the global subscriber; keep it in that case.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env();
    let aggregator = build_aggregator(&cfg)?;

    let mut router = api::router(AppState::new(aggregator));
    match Metrics::init(cfg.scorer.flush_interval.as_secs()) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "prometheus recorder not installed"),
    }

    Ok(router.into())
}

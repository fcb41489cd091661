// src/config/mod.rs
//! Runtime configuration assembled from the environment (and `.env` in dev).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::ingest::config::PipelineConfig;
use crate::ingest::providers::news_api::NewsApiConfig;
use crate::sentiment::ScorerConfig;

pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";
pub const ENV_NEWS_API_BASE_URL: &str = "NEWS_API_BASE_URL";
pub const ENV_NEWS_API_TIMEOUT_SECS: &str = "NEWS_API_TIMEOUT_SECS";
pub const ENV_NEWS_API_PROBE_TIMEOUT_SECS: &str = "NEWS_API_PROBE_TIMEOUT_SECS";
pub const ENV_DATASET_PATH: &str = "NEWS_DATASET_PATH";
pub const ENV_MODEL_VERSION: &str = "MODEL_VERSION";
pub const ENV_MODEL_REGISTRY: &str = "MODEL_REGISTRY";
pub const ENV_MODEL_PATH: &str = "MODEL_PATH";
pub const ENV_MODEL_MAX_LENGTH: &str = "MODEL_MAX_LENGTH";
pub const ENV_METRICS_FLUSH_SECS: &str = "MODEL_METRICS_FLUSH_SECS";

pub const DEFAULT_DATASET_PATH: &str = "data/demo_financial_news.csv";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub news_api: NewsApiConfig,
    pub dataset_path: PathBuf,
    pub scorer: ScorerConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Read every knob from the process environment. Missing or unparsable
    /// values fall back to defaults; nothing here fails.
    pub fn from_env() -> Self {
        let api_defaults = NewsApiConfig::default();
        let news_api = NewsApiConfig {
            api_key: env_string(ENV_NEWS_API_KEY).unwrap_or_default(),
            base_url: env_string(ENV_NEWS_API_BASE_URL).unwrap_or(api_defaults.base_url),
            timeout: Duration::from_secs(env_or(
                ENV_NEWS_API_TIMEOUT_SECS,
                api_defaults.timeout.as_secs(),
            )),
            probe_timeout: Duration::from_secs(env_or(
                ENV_NEWS_API_PROBE_TIMEOUT_SECS,
                api_defaults.probe_timeout.as_secs(),
            )),
        };

        let sc = ScorerConfig::default();
        let scorer = ScorerConfig {
            model_version: env_string(ENV_MODEL_VERSION).unwrap_or(sc.model_version),
            registry_dir: env_string(ENV_MODEL_REGISTRY)
                .map(PathBuf::from)
                .unwrap_or(sc.registry_dir),
            model_path: env_string(ENV_MODEL_PATH).map(PathBuf::from),
            max_length: env_or(ENV_MODEL_MAX_LENGTH, sc.max_length).max(1),
            flush_interval: Duration::from_secs(env_or(
                ENV_METRICS_FLUSH_SECS,
                sc.flush_interval.as_secs(),
            )),
        };

        Self {
            news_api,
            dataset_path: env_string(ENV_DATASET_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH)),
            scorer,
            pipeline: PipelineConfig::from_env(),
        }
    }
}

/// Non-empty, trimmed env value.
pub(crate) fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an env value, falling back to `default` when absent or invalid.
pub(crate) fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env_string(name)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[serial_test::serial]
    #[test]
    fn from_env_reads_overrides() {
        env::set_var(ENV_NEWS_API_KEY, "  abc123  ");
        env::set_var(ENV_NEWS_API_TIMEOUT_SECS, "3");
        env::set_var(ENV_MODEL_VERSION, "rule-based-v2");
        env::set_var(ENV_MODEL_MAX_LENGTH, "0");
        env::set_var(ENV_DATASET_PATH, "/tmp/news.csv");

        let cfg = AppConfig::from_env();
        assert_eq!(cfg.news_api.api_key, "abc123");
        assert_eq!(cfg.news_api.timeout, Duration::from_secs(3));
        assert_eq!(cfg.scorer.model_version, "rule-based-v2");
        assert_eq!(cfg.scorer.max_length, 1);
        assert_eq!(cfg.dataset_path, PathBuf::from("/tmp/news.csv"));

        for k in [
            ENV_NEWS_API_KEY,
            ENV_NEWS_API_TIMEOUT_SECS,
            ENV_MODEL_VERSION,
            ENV_MODEL_MAX_LENGTH,
            ENV_DATASET_PATH,
        ] {
            env::remove_var(k);
        }
    }

    #[serial_test::serial]
    #[test]
    fn defaults_without_env() {
        for k in [ENV_NEWS_API_KEY, ENV_MODEL_VERSION, ENV_MODEL_REGISTRY, ENV_DATASET_PATH] {
            env::remove_var(k);
        }
        let cfg = AppConfig::from_env();
        assert!(cfg.news_api.api_key.is_empty());
        assert_eq!(cfg.scorer.model_version, "rule-based-v1");
        assert_eq!(cfg.scorer.registry_dir, PathBuf::from(".model_registry"));
        assert_eq!(cfg.dataset_path, PathBuf::from(DEFAULT_DATASET_PATH));
    }
}

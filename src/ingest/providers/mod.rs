// src/ingest/providers/mod.rs
//! Source adapters in fallback priority order.

pub mod dataset;
pub mod fallback;
pub mod news_api;

pub use dataset::DatasetSource;
pub use fallback::FallbackSource;
pub use news_api::{NewsApiConfig, NewsApiSource};

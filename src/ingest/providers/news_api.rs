// src/ingest/providers/news_api.rs
//! Primary source: NewsAPI.org `everything` endpoint with internal paging.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::ingest::normalize_title;
use crate::ingest::types::{HeadlineRecord, HeadlineSource, SourceError};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";
/// Upstream page size ceiling.
pub const MAX_PAGE_SIZE: usize = 100;
/// Free plan only serves the last 30 days.
pub const MAX_WINDOW_DAYS: u32 = 30;

const FINANCE_TERMS: &str = "(stock OR shares OR market OR earnings OR investor OR financial)";

#[derive(Debug, Clone)]
pub struct NewsApiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Per-request timeout for article pages.
    pub timeout: Duration,
    /// Timeout for the availability probe.
    pub probe_timeout: Duration,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResp {
    #[serde(default)]
    total_results: usize,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

pub struct NewsApiSource {
    cfg: NewsApiConfig,
    client: Client,
}

impl NewsApiSource {
    pub fn new(cfg: NewsApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("financial-news-sentiment/0.1")
            .connect_timeout(cfg.probe_timeout.min(cfg.timeout))
            .timeout(cfg.timeout)
            .build()
            .context("building news api http client")?;
        Ok(Self { cfg, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/v2/everything", self.cfg.base_url.trim_end_matches('/'))
    }

    fn masked_key(&self) -> String {
        let chars: Vec<char> = self.cfg.api_key.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }

    /// Fetch one page; rate limiting and non-200 statuses are typed errors.
    async fn fetch_page(
        &self,
        query: &str,
        from: &str,
        to: &str,
        page_size: usize,
        page: usize,
    ) -> Result<EverythingResp, SourceError> {
        let page_size_s = page_size.to_string();
        let page_s = page.to_string();
        let resp = self
            .client
            .get(self.endpoint())
            .query(&[
                ("q", query),
                ("from", from),
                ("to", to),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size_s.as_str()),
                ("page", page_s.as_str()),
                ("apiKey", self.cfg.api_key.as_str()),
            ])
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => Ok(resp.json::<EverythingResp>().await?),
            StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimited),
            other => Err(SourceError::Status(other.as_u16())),
        }
    }
}

/// Richer search terms for well-known tickers.
pub fn company_name(ticker: &str) -> Option<&'static str> {
    Some(match ticker {
        "AAPL" => "Apple",
        "MSFT" => "Microsoft",
        "GOOGL" => "Google",
        "AMZN" => "Amazon",
        "TSLA" => "Tesla",
        "META" => "Facebook OR Meta",
        "NFLX" => "Netflix",
        "NVDA" => "Nvidia",
        "IBM" => "IBM",
        "INTC" => "Intel",
        "AMD" => "AMD",
        "ORCL" => "Oracle",
        "CRM" => "Salesforce",
        "ADBE" => "Adobe",
        "PYPL" => "PayPal",
        "CSCO" => "Cisco",
        _ => return None,
    })
}

/// Matches articles mentioning the company (or ticker) together with a finance term.
pub fn build_query(ticker: &str) -> String {
    let name = company_name(ticker).unwrap_or(ticker);
    format!("({name} AND {FINANCE_TERMS}) OR ({ticker} AND {FINANCE_TERMS})")
}

/// Turn raw articles into records: first `max_results`, non-empty titles,
/// unique normalized titles, parseable timestamps.
fn to_records(articles: Vec<Article>, ticker: &str, max_results: usize) -> Vec<HeadlineRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for a in articles.into_iter().take(max_results) {
        let title = a.title.unwrap_or_default();
        let key = normalize_title(&title);
        if key.is_empty() || !seen.insert(key) {
            continue;
        }

        let published = a
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));
        let Some(published) = published else {
            warn!(target: "news_api", %title, "dropping article with unparseable date");
            counter!("news_malformed_items_total", "source" => "news_api").increment(1);
            continue;
        };

        out.push(HeadlineRecord::new(
            title,
            a.source.and_then(|s| s.name).unwrap_or_default(),
            a.url.unwrap_or_default(),
            published,
            ticker,
        ));
    }
    out
}

#[async_trait]
impl HeadlineSource for NewsApiSource {
    fn name(&self) -> &'static str {
        "NewsAPI"
    }

    async fn is_available(&self) -> bool {
        if self.cfg.api_key.is_empty() {
            warn!(target: "news_api", "no NEWS_API_KEY configured");
            return false;
        }
        debug!(target: "news_api", key = %self.masked_key(), "probing news api");

        let res = self
            .client
            .get(self.endpoint())
            .timeout(self.cfg.probe_timeout)
            .query(&[
                ("q", "market"),
                ("pageSize", "1"),
                ("language", "en"),
                ("apiKey", self.cfg.api_key.as_str()),
            ])
            .send()
            .await;

        match res {
            Ok(r) if r.status().is_success() => true,
            Ok(r) if r.status() == StatusCode::UNAUTHORIZED => {
                error!(target: "news_api", "news api key rejected (401)");
                false
            }
            Ok(r) if r.status() == StatusCode::TOO_MANY_REQUESTS => {
                warn!(target: "news_api", "news api rate limit exceeded");
                false
            }
            Ok(r) => {
                warn!(target: "news_api", status = r.status().as_u16(), "news api probe failed");
                false
            }
            Err(e) if e.is_timeout() => {
                warn!(target: "news_api", "news api probe timed out");
                false
            }
            Err(e) => {
                warn!(target: "news_api", error = %e, "news api unreachable");
                false
            }
        }
    }

    async fn fetch(
        &self,
        ticker: &str,
        days: u32,
        max_results: usize,
    ) -> Result<Vec<HeadlineRecord>, SourceError> {
        let max_results = max_results.max(1);
        let search_days = days.clamp(1, MAX_WINDOW_DAYS);
        let to = Utc::now();
        let from = to - chrono::Duration::days(i64::from(search_days));
        let (from_s, to_s) = (
            from.format("%Y-%m-%d").to_string(),
            to.format("%Y-%m-%d").to_string(),
        );
        let query = build_query(ticker);
        let page_size = MAX_PAGE_SIZE.min(max_results);

        let mut articles: Vec<Article> = Vec::new();
        let mut page = 1usize;
        while articles.len() < max_results {
            debug!(target: "news_api", %ticker, page, "requesting page");
            let batch = match self.fetch_page(&query, &from_s, &to_s, page_size, page).await {
                Ok(b) => b,
                Err(SourceError::RateLimited) => {
                    warn!(target: "news_api", %ticker, page, "rate limited, keeping collected pages");
                    break;
                }
                Err(SourceError::Status(code)) => {
                    error!(target: "news_api", %ticker, page, status = code, "page request failed");
                    break;
                }
                Err(e) => {
                    warn!(target: "news_api", %ticker, page, error = %e, "page fetch error");
                    break;
                }
            };

            let got = batch.articles.len();
            articles.extend(batch.articles);
            if got < page_size || batch.total_results <= articles.len() {
                break;
            }
            page += 1;
        }

        let out = to_records(articles, ticker, max_results);
        info!(target: "news_api", %ticker, count = out.len(), "news api items");
        Ok(out)
    }
}

// src/search/exa.rs
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ensure_metrics_described, SearchHit, SearchService};
use crate::config::SearchConfig;
use crate::error::{AdvisorError, Result};

/// Exa "search and contents" client.
pub struct ExaSearch {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    max_results: u32,
    max_chars: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: u32,
    #[serde(rename = "type")]
    kind: &'a str,
    contents: Contents,
}

#[derive(Debug, Serialize)]
struct Contents {
    text: TextOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextOptions {
    max_characters: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl ExaSearch {
    /// Fails with [`AdvisorError::Credential`] when no Exa key is configured.
    pub fn new(cfg: &SearchConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(AdvisorError::Credential { service: "Exa" })?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("ipl-fantasy-advisor/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Search {
                message: format!("building http client: {e}"),
            })?;
        Ok(Self {
            http,
            api_key,
            endpoint: cfg.endpoint.clone(),
            max_results: cfg.max_results,
            max_chars: cfg.max_chars,
        })
    }

    fn request_body<'a>(&self, query: &'a str) -> SearchRequest<'a> {
        SearchRequest {
            query,
            num_results: self.max_results,
            kind: "auto",
            contents: Contents {
                text: TextOptions {
                    max_characters: self.max_chars,
                },
            },
        }
    }
}

fn parse_response(body: &str) -> Result<Vec<SearchHit>> {
    let parsed: SearchResponse = serde_json::from_str(body).map_err(|e| AdvisorError::Search {
        message: format!("parsing exa response: {e}"),
    })?;
    Ok(parsed.results)
}

#[async_trait::async_trait]
impl SearchService for ExaSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        ensure_metrics_described();
        counter!("search_requests_total").increment(1);
        let t0 = Instant::now();

        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&self.request_body(query))
            .send()
            .await
            .map_err(|e| {
                warn!(error = ?e, provider = "exa", "search http error");
                counter!("search_errors_total").increment(1);
                AdvisorError::Search {
                    message: format!("exa request failed: {e}"),
                }
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            counter!("search_errors_total").increment(1);
            AdvisorError::Search {
                message: format!("exa body: {e}"),
            }
        })?;
        if !status.is_success() {
            counter!("search_errors_total").increment(1);
            return Err(AdvisorError::Search {
                message: format!("exa returned {status}"),
            });
        }

        let hits = parse_response(&body).inspect_err(|_| {
            counter!("search_errors_total").increment(1);
        })?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("search_latency_ms").record(ms);
        counter!("search_results_total").increment(hits.len() as u64);
        debug!(hits = hits.len(), ms, "exa search done");
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "exa"
    }
}

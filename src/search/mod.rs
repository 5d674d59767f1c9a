// src/search/mod.rs
pub mod exa;

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use exa::ExaSearch;

/// One raw web search hit. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "publishedDate")]
    pub published_date: Option<String>,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            title: Some(title.into()),
            url: None,
            published_date: None,
        }
    }
}

#[async_trait::async_trait]
pub trait SearchService: Send + Sync {
    /// Ordered hits for a natural-language query.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
    fn name(&self) -> &'static str;
}

/// The queries the advisor sends to the search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CricketQuery {
    Player(String),
    Team(String),
    Match(String, String),
    Injuries,
}

impl CricketQuery {
    pub fn text(&self) -> String {
        match self {
            CricketQuery::Player(name) => {
                format!("IPL cricket player {name} recent performance statistics")
            }
            CricketQuery::Team(team) => {
                format!("IPL cricket team {team} recent news updates squad changes")
            }
            CricketQuery::Match(a, b) => format!("IPL cricket match prediction {a} vs {b} analysis"),
            CricketQuery::Injuries => {
                "IPL cricket recent player injuries updates team changes".to_string()
            }
        }
    }
}

impl fmt::Display for CricketQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// One-time metrics registration for search series.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("search_requests_total", "Search requests sent.");
        describe_counter!("search_results_total", "Hits returned by the search service.");
        describe_counter!("search_errors_total", "Search transport/parse errors.");
        describe_histogram!("search_latency_ms", "Search round trip in milliseconds.");
    });
}

/// Canned search service for tests and offline runs.
///
/// Returns the hits registered for an exact query, else the fallback list.
/// Every query is recorded in order.
#[derive(Debug, Default)]
pub struct StaticSearch {
    by_query: HashMap<String, Vec<SearchHit>>,
    fallback: Vec<SearchHit>,
    seen: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(fallback: Vec<SearchHit>) -> Self {
        Self {
            fallback,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: &CricketQuery, hits: Vec<SearchHit>) -> Self {
        self.by_query.insert(query.text(), hits);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.seen.lock().expect("search log poisoned").clone()
    }
}

#[async_trait::async_trait]
impl SearchService for StaticSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.seen
            .lock()
            .expect("search log poisoned")
            .push(query.to_string());
        Ok(self
            .by_query
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

// src/advisor/mod.rs
//! # Advisory orchestrator
//! Each request: search → aggregate → assess → prompt → language model → score.
//! Round trips are awaited one after another; nothing is cached between requests.
//!
//! The language-model credential is checked first, so a missing key fails the
//! request before any evidence is gathered or scored. Thin or missing evidence
//! is not an error: it simply yields a low confidence.

pub mod prompts;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::analyze::{assess, score_answer, ConfidenceResult, ConfidenceThresholds, QualityTriple};
use crate::config::{AdvisorConfig, CostConfig};
use crate::error::{AdvisorError, Result};
use crate::evidence::{aggregate, aggregate_subjects, AggregatedContext, EvidenceSnippet, SnippetKind};
use crate::llm::{LanguageModel, OpenAiChat};
use crate::monitor::{build_monitor, DynMonitor, RunLog};
use crate::search::{CricketQuery, ExaSearch, SearchService};
use crate::store::{Metadata, OpenAiEmbedder, SimilarityStore, StoreHit};

/// Hits kept per candidate in a captain comparison.
pub const CAPTAIN_HITS_PER_PLAYER: usize = 2;

/// Seed phrase for the general knowledge-base refresh (sent through the player query).
pub const KB_GENERAL_SEED: &str = "Latest IPL cricket updates news player performance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    Player,
    Team,
    Captain,
    Match,
}

impl AdvisoryKind {
    pub fn run_type(&self) -> &'static str {
        match self {
            AdvisoryKind::Player => "player_recommendation",
            AdvisoryKind::Team => "team_advice",
            AdvisoryKind::Captain => "captain_recommendation",
            AdvisoryKind::Match => "match_analysis",
        }
    }

    /// Heading used when printing the answer.
    pub fn heading(&self) -> &'static str {
        match self {
            AdvisoryKind::Player => "RECOMMENDATION",
            AdvisoryKind::Team => "TEAM ADVICE",
            AdvisoryKind::Captain => "CAPTAIN RECOMMENDATION",
            AdvisoryKind::Match => "MATCH ANALYSIS",
        }
    }
}

/// Round-trip usage behind one result, for cost estimation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Usage {
    pub search_hits: usize,
    pub total_tokens: Option<u32>,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryResult {
    pub kind: AdvisoryKind,
    pub subjects: Vec<String>,
    pub answer: String,
    pub confidence: ConfidenceResult,
    pub sources_used: usize,
    pub quality: QualityTriple,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeBaseUpdate {
    pub status: &'static str,
    /// Hits returned by both refresh searches, including ones without text.
    pub docs_added: usize,
    /// Documents actually embedded and appended.
    pub stored: usize,
    pub total_docs: usize,
}

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("advisor_requests_total", "Advisory requests by kind.");
        describe_counter!("advisor_errors_total", "Advisory requests that failed.");
        describe_histogram!("advisor_confidence", "Confidence score of answered requests.");
        describe_counter!("store_documents_added_total", "Documents appended to the knowledge base.");
    });
}

pub struct Advisor {
    search: Arc<dyn SearchService>,
    llm: Arc<dyn LanguageModel>,
    store: SimilarityStore,
    monitor: DynMonitor,
    thresholds: ConfidenceThresholds,
    costs: CostConfig,
}

impl Advisor {
    pub fn new(
        search: Arc<dyn SearchService>,
        llm: Arc<dyn LanguageModel>,
        store: SimilarityStore,
        monitor: DynMonitor,
    ) -> Self {
        Self {
            search,
            llm,
            store,
            monitor,
            thresholds: ConfidenceThresholds::default(),
            costs: CostConfig::default(),
        }
    }

    /// Wire the production collaborators. Each one receives its own key from `cfg`.
    pub fn from_config(cfg: &AdvisorConfig) -> Result<Self> {
        let search = Arc::new(ExaSearch::new(&cfg.search)?);
        let llm = Arc::new(OpenAiChat::new(&cfg.llm)?);
        let embedder = Arc::new(OpenAiEmbedder::new(&cfg.embeddings, &cfg.llm)?);
        let store = SimilarityStore::open(&cfg.store.path, embedder)?;
        let monitor = build_monitor(&cfg.monitoring);
        info!(
            search = search.name(),
            model = llm.model_name(),
            monitor = monitor.name(),
            kb_docs = store.len(),
            "advisor initialized"
        );
        Ok(Self::new(search, llm, store, monitor)
            .with_thresholds(cfg.thresholds)
            .with_costs(cfg.costs))
    }

    pub fn with_thresholds(mut self, thresholds: ConfidenceThresholds) -> Self {
        self.thresholds = thresholds.sanitized();
        self
    }

    pub fn with_costs(mut self, costs: CostConfig) -> Self {
        self.costs = costs;
        self
    }

    pub fn store(&self) -> &SimilarityStore {
        &self.store
    }

    /// Should `player` be in the fantasy team?
    pub async fn player_recommendation(&self, player: &str) -> Result<AdvisoryResult> {
        let started = Utc::now();
        let subjects = vec![player.to_string()];
        let res = async {
            self.llm.check_credentials()?;
            let hits = self.search.search(&CricketQuery::Player(player.to_string()).text()).await?;
            let agg = aggregate(&EvidenceSnippet::from_hits(&hits, SnippetKind::General));
            let prompt = prompts::player(player, &agg.context);
            self.answer(AdvisoryKind::Player, subjects.clone(), agg, hits.len(), &prompt)
                .await
        }
        .await;
        self.record(AdvisoryKind::Player, json!({ "player": player }), started, &res)
            .await;
        res
    }

    /// Which players from `team` are worth picking?
    pub async fn team_advice(&self, team: &str) -> Result<AdvisoryResult> {
        let started = Utc::now();
        let subjects = vec![team.to_string()];
        let res = async {
            self.llm.check_credentials()?;
            let hits = self.search.search(&CricketQuery::Team(team.to_string()).text()).await?;
            let agg = aggregate(&EvidenceSnippet::from_hits(&hits, SnippetKind::General));
            let prompt = prompts::team(team, &agg.context);
            self.answer(AdvisoryKind::Team, subjects.clone(), agg, hits.len(), &prompt)
                .await
        }
        .await;
        self.record(AdvisoryKind::Team, json!({ "team": team }), started, &res)
            .await;
        res
    }

    /// Captain pick among `players`; one search per candidate, in order.
    pub async fn captain_recommendation(&self, players: &[String]) -> Result<AdvisoryResult> {
        let started = Utc::now();
        let res = async {
            if players.is_empty() {
                return Err(AdvisorError::InvalidRequest {
                    message: "captain comparison needs at least one player".to_string(),
                });
            }
            self.llm.check_credentials()?;

            let mut groups: Vec<(&str, Vec<EvidenceSnippet>)> = Vec::with_capacity(players.len());
            let mut total_hits = 0usize;
            for player in players {
                let hits = self.search.search(&CricketQuery::Player(player.clone()).text()).await?;
                total_hits += hits.len();
                let top = &hits[..hits.len().min(CAPTAIN_HITS_PER_PLAYER)];
                groups.push((player.as_str(), EvidenceSnippet::from_hits(top, SnippetKind::General)));
            }

            let agg = aggregate_subjects(&groups);
            let prompt = prompts::captain(players, &agg.context);
            self.answer(AdvisoryKind::Captain, players.to_vec(), agg, total_hits, &prompt)
                .await
        }
        .await;
        self.record(AdvisoryKind::Captain, json!({ "players": players }), started, &res)
            .await;
        res
    }

    /// Fantasy angle on `team1` vs `team2`.
    pub async fn match_analysis(&self, team1: &str, team2: &str) -> Result<AdvisoryResult> {
        let started = Utc::now();
        let subjects = vec![team1.to_string(), team2.to_string()];
        let res = async {
            self.llm.check_credentials()?;
            let query = CricketQuery::Match(team1.to_string(), team2.to_string());
            let hits = self.search.search(&query.text()).await?;
            let agg = aggregate(&EvidenceSnippet::from_hits(&hits, SnippetKind::General));
            let prompt = prompts::match_up(team1, team2, &agg.context);
            self.answer(AdvisoryKind::Match, subjects.clone(), agg, hits.len(), &prompt)
                .await
        }
        .await;
        self.record(
            AdvisoryKind::Match,
            json!({ "team1": team1, "team2": team2 }),
            started,
            &res,
        )
        .await;
        res
    }

    /// Shared tail: assess the evidence, ask the model, score the answer.
    async fn answer(
        &self,
        kind: AdvisoryKind,
        subjects: Vec<String>,
        agg: AggregatedContext,
        search_hits: usize,
        prompt: &str,
    ) -> Result<AdvisoryResult> {
        let quality = assess(&agg.context);
        let generation = self.llm.generate(prompt).await?;
        let confidence = score_answer(&quality, &generation.content, &self.thresholds);

        let estimated_cost = self
            .costs
            .estimate(generation.total_tokens.unwrap_or(0), search_hits);

        Ok(AdvisoryResult {
            kind,
            subjects,
            answer: generation.content,
            confidence,
            sources_used: agg.sources_used,
            quality,
            usage: Usage {
                search_hits,
                total_tokens: generation.total_tokens,
                estimated_cost,
            },
        })
    }

    /// Metrics + monitor run for one finished request.
    async fn record(
        &self,
        kind: AdvisoryKind,
        inputs: serde_json::Value,
        started: DateTime<Utc>,
        res: &Result<AdvisoryResult>,
    ) {
        ensure_metrics_described();
        counter!("advisor_requests_total", "kind" => kind.run_type()).increment(1);

        let run = RunLog::new(kind.run_type(), inputs).started_at(started);
        let run = match res {
            Ok(r) => {
                histogram!("advisor_confidence").record(r.confidence.score);
                info!(
                    kind = kind.run_type(),
                    sources = r.sources_used,
                    score = r.confidence.score,
                    label = %r.confidence.label,
                    "advisory answered"
                );
                run.outputs(json!({
                    "answer": r.answer,
                    "confidence_score": r.confidence.score,
                    "confidence_label": r.confidence.label,
                    "sources_used": r.sources_used,
                }))
                .metric("confidence", r.confidence.score)
                .metric("data_quality", r.quality.data_quality)
                .metric("data_recency", r.quality.data_recency)
                .metric("data_relevance", r.quality.data_relevance)
                .metric("estimated_cost", r.usage.estimated_cost)
            }
            Err(e) => {
                counter!("advisor_errors_total", "kind" => kind.run_type()).increment(1);
                warn!(kind = kind.run_type(), error = %e, "advisory failed");
                run.error(e)
            }
        };
        self.monitor.log_run(run).await;
    }

    /// Refresh the knowledge base with general IPL news and injury updates.
    pub async fn update_knowledge_base(&mut self) -> Result<KnowledgeBaseUpdate> {
        let general = self
            .search
            .search(&CricketQuery::Player(KB_GENERAL_SEED.to_string()).text())
            .await?;
        let injuries = self.search.search(&CricketQuery::Injuries.text()).await?;

        let mut stored = 0usize;
        for (hits, kind) in [(&general, SnippetKind::General), (&injuries, SnippetKind::Injury)] {
            for snippet in EvidenceSnippet::from_hits(hits, kind) {
                if !snippet.has_text() {
                    continue;
                }
                self.store.add(&snippet.text, snippet_metadata(&snippet)).await?;
                stored += 1;
            }
        }

        let update = KnowledgeBaseUpdate {
            status: "success",
            docs_added: general.len() + injuries.len(),
            stored,
            total_docs: self.store.len(),
        };
        info!(
            docs_added = update.docs_added,
            stored = update.stored,
            total = update.total_docs,
            "knowledge base updated"
        );
        self.monitor
            .log_simple_event(
                "knowledge_base_update",
                json!({
                    "docs_added": update.docs_added,
                    "stored": update.stored,
                    "total_docs": update.total_docs,
                }),
            )
            .await;
        Ok(update)
    }

    /// Nearest knowledge-base documents for `query`.
    pub async fn recall(&self, query: &str, k: usize) -> Result<Vec<StoreHit>> {
        self.store.search(query, k).await
    }
}

fn snippet_metadata(s: &EvidenceSnippet) -> Metadata {
    let mut m = Metadata::new();
    m.insert("title".into(), s.title.clone());
    m.insert("url".into(), s.url.clone());
    if s.kind == SnippetKind::Injury {
        m.insert("type".into(), "injury".into());
    }
    m.insert(
        "date".into(),
        s.retrieved_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    m
}

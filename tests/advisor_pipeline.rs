// tests/advisor_pipeline.rs
//
// End-to-end advisory requests over in-memory collaborators:
// canned search hits, scripted model answers, hash embeddings, recording monitor.

use std::sync::Arc;

use chrono::Datelike;
use fantasy_advisor::advisor::{Advisor, AdvisoryKind};
use fantasy_advisor::analyze::assess;
use fantasy_advisor::llm::ScriptedModel;
use fantasy_advisor::monitor::RecordingMonitor;
use fantasy_advisor::search::{CricketQuery, SearchHit, SearchService, StaticSearch};
use fantasy_advisor::store::{HashEmbedder, SimilarityStore};
use fantasy_advisor::{AdvisorError, ConfidenceLabel};
use tempfile::TempDir;

struct Harness {
    advisor: Advisor,
    search: Arc<StaticSearch>,
    model: Arc<ScriptedModel>,
    monitor: Arc<RecordingMonitor>,
    _dir: TempDir,
}

fn harness(search: StaticSearch, model: ScriptedModel) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = SimilarityStore::open(dir.path(), Arc::new(HashEmbedder::new(64))).unwrap();
    let search = Arc::new(search);
    let model = Arc::new(model);
    let monitor = Arc::new(RecordingMonitor::default());
    let advisor = Advisor::new(search.clone(), model.clone(), store, monitor.clone());
    Harness {
        advisor,
        search,
        model,
        monitor,
        _dir: dir,
    }
}

fn this_year() -> i32 {
    chrono::Local::now().year()
}

#[tokio::test]
async fn player_request_aggregates_scores_and_logs() {
    let q = CricketQuery::Player("Shubman Gill".into());
    let search = StaticSearch::default().with_query(
        &q,
        vec![
            SearchHit::new("Cricbuzz", "Gill made 890 runs at a 59.3 average"),
            SearchHit {
                title: Some("No body".into()),
                ..SearchHit::default()
            },
            SearchHit::new("ESPN", "Strike rate 155 and 3 points per over"),
        ],
    );
    let h = harness(search, ScriptedModel::new(["Include him as a top-order anchor."]));

    let r = h.advisor.player_recommendation("Shubman Gill").await.unwrap();

    assert_eq!(r.kind, AdvisoryKind::Player);
    assert_eq!(r.subjects, vec!["Shubman Gill".to_string()]);
    assert_eq!(r.sources_used, 2);
    assert_eq!(r.usage.search_hits, 3);
    assert_eq!(h.search.queries(), vec![q.text()]);

    let expected_ctx = "Source: Cricbuzz\nGill made 890 runs at a 59.3 average\n\n\
                        Source: ESPN\nStrike rate 155 and 3 points per over\n\n";
    let prompts = h.model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].ends_with(expected_ctx));
    assert!(prompts[0].contains("about Shubman Gill, should I include them"));

    assert_eq!(r.quality, assess(expected_ctx));
    assert_eq!(r.confidence.certainty_factor, 1.0);
    let raw = 0.4 * r.quality.data_quality + 0.3 * r.quality.data_recency + 0.3 * r.quality.data_relevance;
    assert!((r.confidence.score - raw).abs() < 1e-12);

    let runs = h.monitor.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_type, "player_recommendation");
    assert!(runs[0].error.is_none());
    assert!(runs[0].metrics.contains_key("confidence"));
    assert!(runs[0].metrics.contains_key("estimated_cost"));
}

#[tokio::test]
async fn empty_evidence_is_a_very_low_result_not_an_error() {
    let h = harness(StaticSearch::default(), ScriptedModel::new(["Pick him."]));
    let r = h.advisor.team_advice("Gujarat Titans").await.unwrap();
    assert_eq!(r.sources_used, 0);
    assert_eq!(r.quality.data_quality, 0.0);
    assert_eq!(r.quality.data_recency, 0.5);
    assert_eq!(r.quality.data_relevance, 0.0);
    assert_eq!(r.confidence.label, ConfidenceLabel::VeryLow);
    assert!(h.model.prompts()[0].contains("which players from this team"));
}

#[tokio::test]
async fn rich_recent_evidence_with_two_hedges_is_high() {
    let y = this_year();
    let text = format!("In {y} he scored 50 runs. ").repeat(400);
    let search = StaticSearch::new(vec![SearchHit::new("Stats", text)]);
    let h = harness(
        search,
        ScriptedModel::new(["He might lead well, though his form is unclear."]),
    );

    let r = h.advisor.player_recommendation("Virat Kohli").await.unwrap();
    assert!((r.quality.data_quality - 1.0).abs() < 1e-12);
    assert_eq!(r.quality.data_recency, 1.0);
    assert_eq!(r.quality.data_relevance, 1.0);
    assert!((r.confidence.certainty_factor - 0.81).abs() < 1e-12);
    assert!((r.confidence.score - 0.81).abs() < 1e-12);
    assert_eq!(r.confidence.label, ConfidenceLabel::High);
}

#[tokio::test]
async fn missing_credentials_fail_before_search() {
    let h = harness(
        StaticSearch::new(vec![SearchHit::new("x", "y")]),
        ScriptedModel::without_credentials(),
    );
    let err = h.advisor.match_analysis("MI", "CSK").await.unwrap_err();
    assert!(matches!(err, AdvisorError::Credential { .. }));
    assert!(h.search.queries().is_empty());

    let runs = h.monitor.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_type, "match_analysis");
    assert!(runs[0].error.is_some());
}

#[tokio::test]
async fn captain_searches_each_player_in_order_and_truncates() {
    let long = "x".repeat(1500);
    let gill = CricketQuery::Player("Gill".into());
    let pant = CricketQuery::Player("Pant".into());
    let search = StaticSearch::default()
        .with_query(
            &gill,
            vec![
                SearchHit::new("G1", long.clone()),
                SearchHit::new("G2", "Gill 60 runs"),
                SearchHit::new("G3", "never used"),
            ],
        )
        .with_query(&pant, vec![SearchHit::new("P1", "Pant 2 wickets? no, 40 runs")]);
    let h = harness(search, ScriptedModel::new(["Gill."]));

    let players = vec!["Gill".to_string(), "Pant".to_string()];
    let r = h.advisor.captain_recommendation(&players).await.unwrap();

    assert_eq!(h.search.queries(), vec![gill.text(), pant.text()]);
    assert_eq!(r.sources_used, 3);
    assert_eq!(r.usage.search_hits, 4);
    assert_eq!(r.subjects, players);

    let prompt = &h.model.prompts()[0];
    assert!(prompt.contains("Given these players: Gill, Pant, who should I select as captain"));
    assert!(prompt.contains(&format!("Player: Gill\nSource: G1\n{}\n\n", "x".repeat(1000))));
    assert!(!prompt.contains(&"x".repeat(1001)));
    assert!(prompt.contains("Player: Gill\nSource: G2\nGill 60 runs\n\n"));
    assert!(prompt.contains("Player: Pant\nSource: P1\n"));
    assert!(!prompt.contains("never used"));
}

#[tokio::test]
async fn captain_without_players_is_rejected() {
    let h = harness(StaticSearch::default(), ScriptedModel::new(["-"]));
    let err = h.advisor.captain_recommendation(&[]).await.unwrap_err();
    assert!(matches!(err, AdvisorError::InvalidRequest { .. }));
    assert!(h.model.prompts().is_empty());
}

#[tokio::test]
async fn match_request_uses_match_query_and_both_teams() {
    let q = CricketQuery::Match("MI".into(), "RCB".into());
    let search = StaticSearch::default().with_query(&q, vec![SearchHit::new("Preview", "Bumrah 20 wickets")]);
    let h = harness(search, ScriptedModel::new(["Back Bumrah; perhaps Kohli too."]));

    let r = h.advisor.match_analysis("MI", "RCB").await.unwrap();
    assert_eq!(h.search.queries(), vec![q.text()]);
    assert_eq!(r.subjects, vec!["MI".to_string(), "RCB".to_string()]);
    assert!((r.confidence.certainty_factor - 0.9).abs() < 1e-12);
    assert!(h.model.prompts()[0].contains("between MI and RCB"));
}

struct FailingSearch;

#[async_trait::async_trait]
impl SearchService for FailingSearch {
    async fn search(&self, _query: &str) -> fantasy_advisor::Result<Vec<SearchHit>> {
        Err(AdvisorError::Search {
            message: "offline".into(),
        })
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn search_failures_propagate_and_are_logged() {
    let dir = tempfile::tempdir().unwrap();
    let store = SimilarityStore::open(dir.path(), Arc::new(HashEmbedder::new(8))).unwrap();
    let model = Arc::new(ScriptedModel::new(["unused"]));
    let monitor = Arc::new(RecordingMonitor::default());
    let advisor = Advisor::new(Arc::new(FailingSearch), model.clone(), store, monitor.clone());

    let err = advisor.player_recommendation("Gill").await.unwrap_err();
    assert!(matches!(err, AdvisorError::Search { .. }));
    assert!(model.prompts().is_empty());
    assert_eq!(monitor.runs()[0].error.as_deref(), Some("Search provider error: offline"));
}

struct SlowSearch;

#[async_trait::async_trait]
impl SearchService for SlowSearch {
    async fn search(&self, _query: &str) -> fantasy_advisor::Result<Vec<SearchHit>> {
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        Ok(vec![SearchHit::new("Slow", "Gill 50 runs")])
    }
    fn name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test]
async fn run_start_is_taken_before_the_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = SimilarityStore::open(dir.path(), Arc::new(HashEmbedder::new(8))).unwrap();
    let monitor = Arc::new(RecordingMonitor::default());
    let advisor = Advisor::new(
        Arc::new(SlowSearch),
        Arc::new(ScriptedModel::new(["Pick him."])),
        store,
        monitor.clone(),
    );

    let before = chrono::Utc::now();
    advisor.team_advice("GT").await.unwrap();
    let after = chrono::Utc::now();

    let started = monitor.runs()[0].started_at.unwrap();
    assert!(started >= before);
    assert!(after - started >= chrono::Duration::milliseconds(50));
}

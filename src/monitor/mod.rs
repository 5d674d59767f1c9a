// src/monitor/mod.rs
//! Run/event monitoring behind one capability trait.
//!
//! `LangSmithMonitor` ships runs to LangSmith; `ConsoleMonitor` writes them to
//! the tracing log. [`build_monitor`] picks one at construction time. Monitor
//! failures are never surfaced to the caller.

pub mod langsmith;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::MonitoringConfig;

pub use langsmith::LangSmithMonitor;

/// One finished unit of work.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    pub run_type: String,
    pub inputs: Value,
    pub outputs: Option<Value>,
    pub error: Option<String>,
    pub metrics: BTreeMap<String, f64>,
    pub parent_run_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl RunLog {
    pub fn new(run_type: impl Into<String>, inputs: Value) -> Self {
        Self {
            run_type: run_type.into(),
            inputs,
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn outputs(mut self, outputs: Value) -> Self {
        self.outputs = Some(outputs);
        self
    }

    pub fn error(mut self, err: impl ToString) -> Self {
        self.error = Some(err.to_string());
        self
    }

    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn parent(mut self, run_id: impl Into<String>) -> Self {
        self.parent_run_id = Some(run_id.into());
        self
    }
}

#[async_trait::async_trait]
pub trait Monitor: Send + Sync {
    /// Record a run and return its id (a fresh id even if recording failed).
    async fn log_run(&self, run: RunLog) -> String;
    /// Record a standalone event without run tracking.
    async fn log_simple_event(&self, event_name: &str, data: Value);
    fn name(&self) -> &'static str;
}

pub type DynMonitor = Arc<dyn Monitor>;

/// LangSmith when enabled and keyed, otherwise console.
pub fn build_monitor(cfg: &MonitoringConfig) -> DynMonitor {
    if !cfg.enabled {
        return Arc::new(ConsoleMonitor);
    }
    match LangSmithMonitor::new(cfg) {
        Ok(m) => {
            info!(project = %cfg.project, "LangSmith monitoring enabled");
            Arc::new(m)
        }
        Err(e) => {
            warn!(error = %e, "LangSmith initialization failed; falling back to console monitor");
            Arc::new(ConsoleMonitor)
        }
    }
}

pub(crate) fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Short sha256 prefix; lets logs correlate texts without carrying them.
pub fn anon_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

// raw answers stay out of the log
fn redact_outputs(outputs: &Value) -> Value {
    let mut v = outputs.clone();
    if let Some(answer) = v.get("answer").and_then(Value::as_str) {
        let hashed = format!("sha256:{}", anon_hash(answer));
        v["answer"] = Value::String(hashed);
    }
    v
}

/// Writes runs and events to the tracing log under target `monitor`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMonitor;

#[async_trait::async_trait]
impl Monitor for ConsoleMonitor {
    async fn log_run(&self, run: RunLog) -> String {
        let run_id = new_run_id();
        info!(
            target: "monitor",
            %run_id,
            run_type = %run.run_type,
            parent_run_id = ?run.parent_run_id,
            inputs = %run.inputs,
            "run"
        );
        if let Some(outputs) = &run.outputs {
            let outputs = redact_outputs(outputs);
            info!(target: "monitor", %run_id, %outputs, "run outputs");
        }
        if let Some(error) = &run.error {
            warn!(target: "monitor", %run_id, %error, "run error");
        }
        if !run.metrics.is_empty() {
            info!(target: "monitor", %run_id, metrics = ?run.metrics, "run metrics");
        }
        run_id
    }

    async fn log_simple_event(&self, event_name: &str, data: Value) {
        info!(target: "monitor", event = event_name, %data, "event");
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Keeps everything in memory; for tests.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    runs: Mutex<Vec<RunLog>>,
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingMonitor {
    pub fn runs(&self) -> Vec<RunLog> {
        self.runs.lock().expect("monitor poisoned").clone()
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().expect("monitor poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Monitor for RecordingMonitor {
    async fn log_run(&self, run: RunLog) -> String {
        self.runs.lock().expect("monitor poisoned").push(run);
        new_run_id()
    }

    async fn log_simple_event(&self, event_name: &str, data: Value) {
        self.events
            .lock()
            .expect("monitor poisoned")
            .push((event_name.to_string(), data));
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disabled_config_selects_console() {
        let m = build_monitor(&MonitoringConfig::default());
        assert_eq!(m.name(), "console");
    }

    #[test]
    fn enabled_without_key_falls_back_to_console() {
        let cfg = MonitoringConfig {
            enabled: true,
            ..MonitoringConfig::default()
        };
        assert_eq!(build_monitor(&cfg).name(), "console");
    }

    #[test]
    fn enabled_with_key_selects_langsmith() {
        let cfg = MonitoringConfig {
            enabled: true,
            api_key: Some("ls-key".into()),
            ..MonitoringConfig::default()
        };
        assert_eq!(build_monitor(&cfg).name(), "langsmith");
    }

    #[tokio::test]
    async fn console_monitor_returns_fresh_ids() {
        let m = ConsoleMonitor;
        let a = m.log_run(RunLog::new("player", json!({"player": "Gill"}))).await;
        let b = m
            .log_run(RunLog::new("player", json!({})).error("boom").metric("x", 1.0))
            .await;
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn console_outputs_hide_the_answer() {
        let out = redact_outputs(&json!({"answer": "Pick Gill", "sources_used": 2}));
        assert_eq!(out["answer"], format!("sha256:{}", anon_hash("Pick Gill")));
        assert_eq!(out["sources_used"], 2);
        assert_eq!(anon_hash("Pick Gill").len(), 12);
    }

    #[tokio::test]
    async fn recording_monitor_keeps_runs_and_events() {
        let m = RecordingMonitor::default();
        m.log_run(RunLog::new("team", json!({"team": "CSK"})).parent("p-1"))
            .await;
        m.log_simple_event("kb_update", json!({"docs": 3})).await;
        assert_eq!(m.runs()[0].parent_run_id.as_deref(), Some("p-1"));
        assert_eq!(m.events()[0].0, "kb_update");
    }
}

// src/monitor/langsmith.rs
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::warn;

use super::{new_run_id, Monitor, RunLog};
use crate::config::MonitoringConfig;
use crate::error::{AdvisorError, Result};

/// Posts runs to `{endpoint}/runs` and metrics to `{endpoint}/feedback`.
pub struct LangSmithMonitor {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    project: String,
}

impl LangSmithMonitor {
    pub fn new(cfg: &MonitoringConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(AdvisorError::Credential {
                service: "LangSmith",
            })?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AdvisorError::monitor(format!("langsmith http client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            project: cfg.project.clone(),
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}{}", self.endpoint, path))
            .header("x-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AdvisorError::monitor(format!("langsmith {path}: {e}")))?;
        if !resp.status().is_success() {
            return Err(AdvisorError::monitor(format!(
                "langsmith {path} returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

pub(crate) fn run_body(
    run_id: &str,
    project: &str,
    run: &RunLog,
    now: DateTime<Utc>,
) -> Value {
    let (outputs, error) = match &run.error {
        Some(e) => (json!({ "error": e }), Some(e.clone())),
        None => (run.outputs.clone().unwrap_or_else(|| json!({})), None),
    };
    let mut body = json!({
        "id": run_id,
        "name": format!("{}_{}", run.run_type, now.timestamp()),
        "run_type": "chain",
        "inputs": run.inputs,
        "outputs": outputs,
        "session_name": project,
        "start_time": run.started_at.unwrap_or(now).to_rfc3339(),
        "end_time": now.to_rfc3339(),
    });
    if let Some(e) = error {
        body["error"] = json!(e);
    }
    if let Some(parent) = &run.parent_run_id {
        body["parent_run_id"] = json!(parent);
    }
    body
}

pub(crate) fn feedback_body(run_id: &str, metric: &str, score: f64) -> Value {
    json!({
        "run_id": run_id,
        "key": format!("metric_{metric}"),
        "score": score,
        "comment": format!("Automated metric: {metric}"),
    })
}

pub(crate) fn event_body(
    run_id: &str,
    project: &str,
    event_name: &str,
    data: Value,
    now: DateTime<Utc>,
) -> Value {
    json!({
        "id": run_id,
        "name": format!("event_{}_{}", event_name, now.timestamp()),
        "run_type": "chain",
        "inputs": {
            "event_name": event_name,
            "timestamp": now.to_rfc3339(),
            "data": data,
            "project_name": project,
        },
        "outputs": { "status": "logged" },
        "session_name": project,
        "start_time": now.to_rfc3339(),
        "end_time": now.to_rfc3339(),
    })
}

#[async_trait::async_trait]
impl Monitor for LangSmithMonitor {
    async fn log_run(&self, run: RunLog) -> String {
        let run_id = new_run_id();
        let body = run_body(&run_id, &self.project, &run, Utc::now());
        if let Err(e) = self.post("/runs", &body).await {
            warn!(error = %e, "LangSmith logging failed");
            return new_run_id();
        }
        for (name, value) in &run.metrics {
            if let Err(e) = self
                .post("/feedback", &feedback_body(&run_id, name, *value))
                .await
            {
                warn!(metric = %name, error = %e, "could not log metric");
            }
        }
        run_id
    }

    async fn log_simple_event(&self, event_name: &str, data: Value) {
        let body = event_body(&new_run_id(), &self.project, event_name, data, Utc::now());
        if let Err(e) = self.post("/runs", &body).await {
            warn!(event = event_name, error = %e, "event logging failed");
        }
    }

    fn name(&self) -> &'static str {
        "langsmith"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn run_body_success_shape() {
        let run = RunLog {
            run_type: "player_recommendation".into(),
            inputs: json!({"player": "Gill"}),
            outputs: Some(json!({"confidence_score": 0.7})),
            started_at: Some(at()),
            ..RunLog::default()
        }
        .parent("parent-1");
        let b = run_body("rid", "ipl-advisor", &run, at());
        assert_eq!(b["id"], "rid");
        assert_eq!(b["name"], format!("player_recommendation_{}", at().timestamp()));
        assert_eq!(b["run_type"], "chain");
        assert_eq!(b["session_name"], "ipl-advisor");
        assert_eq!(b["outputs"]["confidence_score"], 0.7);
        assert_eq!(b["parent_run_id"], "parent-1");
        assert!(b.get("error").is_none());
    }

    #[test]
    fn run_body_error_replaces_outputs() {
        let run = RunLog::new("team_advice", json!({})).error("boom");
        let b = run_body("rid", "p", &run, at());
        assert_eq!(b["error"], "boom");
        assert_eq!(b["outputs"], json!({"error": "boom"}));
        assert!(b.get("parent_run_id").is_none());
    }

    #[test]
    fn feedback_and_event_bodies() {
        let f = feedback_body("rid", "confidence", 0.5);
        assert_eq!(f["key"], "metric_confidence");
        assert_eq!(f["comment"], "Automated metric: confidence");

        let e = event_body("eid", "p", "kb_update", json!({"docs": 2}), at());
        assert_eq!(e["inputs"]["event_name"], "kb_update");
        assert_eq!(e["inputs"]["data"]["docs"], 2);
        assert_eq!(e["outputs"]["status"], "logged");
    }

    #[test]
    fn missing_key_is_credential_error() {
        let err = LangSmithMonitor::new(&MonitoringConfig::default()).err().unwrap();
        assert!(matches!(err, AdvisorError::Credential { .. }));
    }

    #[tokio::test]
    async fn transport_failure_is_a_monitor_error() {
        let cfg = MonitoringConfig {
            enabled: true,
            api_key: Some("k".into()),
            endpoint: "http://127.0.0.1:9".into(),
            ..MonitoringConfig::default()
        };
        let m = LangSmithMonitor::new(&cfg).unwrap();
        let err = m.post("/runs", &json!({})).await.unwrap_err();
        assert!(matches!(err, AdvisorError::Monitor { .. }));
        assert!(err.to_string().starts_with("Monitoring error: langsmith /runs"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_still_returns_an_id() {
        let cfg = MonitoringConfig {
            enabled: true,
            api_key: Some("k".into()),
            endpoint: "http://127.0.0.1:9".into(),
            ..MonitoringConfig::default()
        };
        let m = LangSmithMonitor::new(&cfg).unwrap();
        let id = m.log_run(RunLog::new("x", json!({})).metric("a", 1.0)).await;
        assert_eq!(id.len(), 36);
        m.log_simple_event("e", json!({})).await;
    }
}

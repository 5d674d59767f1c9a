// src/config/mod.rs
//! Advisor configuration: one TOML file plus environment overrides.
//!
//! Resolution order for the file path:
//! 1) explicit path (CLI `--config`)
//! 2) $ADVISOR_CONFIG_PATH
//! 3) config/advisor.toml (optional; built-in defaults when absent)
//!
//! API keys may be written literally or as `"ENV"`, which reads them from the
//! provider's usual environment variable. Keys are handed to each
//! collaborator's constructor; nothing is stored globally.

pub mod keys;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::analyze::scoring::ConfidenceThresholds;
use crate::error::{AdvisorError, Result};
use keys::{resolve_key, OPENAI_KEY_VARS, EXA_KEY_VARS, LANGSMITH_KEY_VARS};

pub const DEFAULT_CONFIG_PATH: &str = "config/advisor.toml";
pub const ENV_CONFIG_PATH: &str = "ADVISOR_CONFIG_PATH";

pub const ENV_MODEL: &str = "ADVISOR_MODEL";
pub const ENV_HIGH_CONFIDENCE: &str = "ADVISOR_HIGH_CONFIDENCE";
pub const ENV_MEDIUM_CONFIDENCE: &str = "ADVISOR_MEDIUM_CONFIDENCE";
pub const ENV_LOW_CONFIDENCE: &str = "ADVISOR_LOW_CONFIDENCE";
pub const ENV_TRACING: &str = "LANGSMITH_TRACING";
pub const ENV_PROJECT: &str = "LANGSMITH_PROJECT";
pub const ENV_ENDPOINT: &str = "LANGSMITH_ENDPOINT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub search: SearchConfig,
    pub llm: LlmConfig,
    pub embeddings: EmbeddingConfig,
    pub store: StoreConfig,
    pub thresholds: ConfidenceThresholds,
    pub monitoring: MonitoringConfig,
    pub costs: CostConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub max_results: u32,
    pub max_chars: u32,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.exa.ai/search".to_string(),
            max_results: 10,
            max_chars: 5000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Embeddings reuse the `[llm]` API key.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub endpoint: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            dimension: 1536,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cricket_data_store"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub project: String,
    pub endpoint: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            project: "ipl-advisor".to_string(),
            endpoint: "https://api.smith.langchain.com".to_string(),
        }
    }
}

/// Unit prices used for the per-run cost estimate.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub llm_per_1k_tokens: f64,
    pub search_per_result: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            llm_per_1k_tokens: 0.002,
            search_per_result: 0.0001,
        }
    }
}

impl CostConfig {
    pub fn estimate(&self, total_tokens: u32, search_hits: usize) -> f64 {
        f64::from(total_tokens) / 1000.0 * self.llm_per_1k_tokens
            + search_hits as f64 * self.search_per_result
    }
}

impl AdvisorConfig {
    /// Load from file (see module docs) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var(ENV_CONFIG_PATH) {
                Ok(p) => (PathBuf::from(p), true),
                Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
            },
        };

        let mut cfg = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                AdvisorError::config(format!(
                    "failed to read advisor config at {}: {}",
                    path.display(),
                    e
                ))
            })?;
            info!(path = %path.display(), "advisor config loaded");
            Self::from_toml_str(&content)?
        } else if explicit {
            return Err(AdvisorError::config(format!(
                "advisor config {} does not exist",
                path.display()
            )));
        } else {
            Self::default()
        };

        cfg.apply_env();
        Ok(cfg)
    }

    /// Parse a TOML document. Keys are left unresolved; see [`AdvisorConfig::load`].
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let mut cfg: AdvisorConfig = toml::from_str(toml_str)?;
        cfg.thresholds = cfg.thresholds.sanitized();
        Ok(cfg)
    }

    /// Resolve `"ENV"`/missing keys and apply value overrides from the environment.
    pub fn apply_env(&mut self) {
        self.search.api_key = resolve_key(self.search.api_key.take(), EXA_KEY_VARS);
        self.llm.api_key = resolve_key(self.llm.api_key.take(), OPENAI_KEY_VARS);
        self.monitoring.api_key = resolve_key(self.monitoring.api_key.take(), LANGSMITH_KEY_VARS);

        if let Ok(model) = std::env::var(ENV_MODEL) {
            let model = model.trim();
            if !model.is_empty() {
                self.llm.model = model.to_string();
            }
        }

        if let Some(v) = parse_unit_env(ENV_HIGH_CONFIDENCE) {
            self.thresholds.high = v;
        }
        if let Some(v) = parse_unit_env(ENV_MEDIUM_CONFIDENCE) {
            self.thresholds.medium = v;
        }
        if let Some(v) = parse_unit_env(ENV_LOW_CONFIDENCE) {
            self.thresholds.low = v;
        }
        let sane = self.thresholds.sanitized();
        if sane != self.thresholds {
            warn!(
                high = self.thresholds.high,
                medium = self.thresholds.medium,
                low = self.thresholds.low,
                "confidence thresholds must descend within [0,1]; using defaults"
            );
        }
        self.thresholds = sane;

        if let Ok(flag) = std::env::var(ENV_TRACING) {
            self.monitoring.enabled = parse_flag(&flag);
        }
        if let Ok(project) = std::env::var(ENV_PROJECT) {
            if !project.trim().is_empty() {
                self.monitoring.project = project.trim().to_string();
            }
        }
        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            if !endpoint.trim().is_empty() {
                self.monitoring.endpoint = endpoint.trim().to_string();
            }
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_unit_env(name: &str) -> Option<f64> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

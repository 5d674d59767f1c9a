// src/lib.rs
// Public library surface for the CLI and integration tests.

pub mod advisor;
pub mod analyze;
pub mod config;
pub mod error;
pub mod evidence;
pub mod llm;
pub mod monitor;
pub mod search;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::advisor::{Advisor, AdvisoryKind, AdvisoryResult, KnowledgeBaseUpdate};
pub use crate::analyze::{ConfidenceLabel, ConfidenceResult, ConfidenceThresholds, QualityTriple};
pub use crate::config::AdvisorConfig;
pub use crate::error::{AdvisorError, Result};

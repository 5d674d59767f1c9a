// src/analyze/mod.rs
//! Scoring pipeline: aggregated context → quality triple → answer confidence.

pub mod quality;
pub mod scoring;

pub use crate::analyze::quality::{assess, assess_at, QualityTriple};
pub use crate::analyze::scoring::{
    score_answer, ConfidenceLabel, ConfidenceResult, ConfidenceThresholds,
};

/// Both stages at once, for callers that already hold the answer.
pub fn evaluate(
    context: &str,
    answer: &str,
    thresholds: &ConfidenceThresholds,
) -> (QualityTriple, ConfidenceResult) {
    let triple = assess(context);
    let confidence = score_answer(&triple, answer, thresholds);
    (triple, confidence)
}

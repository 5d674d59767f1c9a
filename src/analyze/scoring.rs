//! Answer confidence: quality triple + hedging language → bounded score + label.
//!
//! raw   = 0.4*quality + 0.3*recency + 0.3*relevance
//! score = clamp(raw * 0.9^k, 0, 1)
//!
//! where `k` is the number of distinct uncertainty phrases found anywhere in
//! the answer (case-insensitive substring, so overlapping hits are possible).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::quality::QualityTriple;

pub const UNCERTAINTY_PHRASES: [&str; 9] = [
    "uncertain",
    "unclear",
    "might",
    "may",
    "could be",
    "possibly",
    "perhaps",
    "not enough data",
    "limited information",
];

/// Multiplier applied once per distinct phrase present.
pub const CERTAINTY_DISCOUNT: f64 = 0.9;

pub const W_QUALITY: f64 = 0.4;
pub const W_RECENCY: f64 = 0.3;
pub const W_RELEVANCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    #[serde(rename = "High Confidence")]
    High,
    #[serde(rename = "Medium Confidence")]
    Medium,
    #[serde(rename = "Low Confidence")]
    Low,
    #[serde(rename = "Very Low Confidence")]
    VeryLow,
}

impl ConfidenceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::High => "High Confidence",
            ConfidenceLabel::Medium => "Medium Confidence",
            ConfidenceLabel::Low => "Low Confidence",
            ConfidenceLabel::VeryLow => "Very Low Confidence",
        }
    }
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (inclusive) of the High / Medium / Low bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.6,
            low: 0.4,
        }
    }
}

impl ConfidenceThresholds {
    /// Defaults unless all bounds lie in [0,1] and descend `high >= medium >= low`.
    pub fn sanitized(self) -> Self {
        let in_unit = |x: f64| x.is_finite() && (0.0..=1.0).contains(&x);
        if in_unit(self.high)
            && in_unit(self.medium)
            && in_unit(self.low)
            && self.high >= self.medium
            && self.medium >= self.low
        {
            self
        } else {
            Self::default()
        }
    }

    pub fn label_for(&self, score: f64) -> ConfidenceLabel {
        if score >= self.high {
            ConfidenceLabel::High
        } else if score >= self.medium {
            ConfidenceLabel::Medium
        } else if score >= self.low {
            ConfidenceLabel::Low
        } else {
            ConfidenceLabel::VeryLow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    pub score: f64,
    pub label: ConfidenceLabel,
    pub certainty_factor: f64,
}

/// Phrases from [`UNCERTAINTY_PHRASES`] present in `answer`.
pub fn hedging_phrases(answer: &str) -> Vec<&'static str> {
    let lower = answer.to_lowercase();
    UNCERTAINTY_PHRASES
        .iter()
        .copied()
        .filter(|p| lower.contains(p))
        .collect()
}

pub fn certainty_factor(answer: &str) -> f64 {
    hedging_phrases(answer)
        .iter()
        .fold(1.0, |acc, _| acc * CERTAINTY_DISCOUNT)
}

/// Weighted sum before the certainty discount.
pub fn raw_score(t: &QualityTriple) -> f64 {
    W_QUALITY * t.data_quality + W_RECENCY * t.data_recency + W_RELEVANCE * t.data_relevance
}

/// Score an answer against the quality of the evidence it was generated from.
pub fn score_answer(
    triple: &QualityTriple,
    answer: &str,
    thresholds: &ConfidenceThresholds,
) -> ConfidenceResult {
    let factor = certainty_factor(answer);
    let score = (raw_score(triple) * factor).clamp(0.0, 1.0);
    ConfidenceResult {
        score,
        label: thresholds.label_for(score),
        certainty_factor: factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(q: f64, r: f64, rel: f64) -> QualityTriple {
        QualityTriple {
            data_quality: q,
            data_recency: r,
            data_relevance: rel,
        }
    }

    #[test]
    fn two_hedges_on_perfect_evidence_stays_high() {
        let t = ConfidenceThresholds::default();
        let res = score_answer(
            &triple(1.0, 1.0, 1.0),
            "Gill might captain well, though form is unclear.",
            &t,
        );
        assert!((res.certainty_factor - 0.81).abs() < 1e-12);
        assert!((res.score - 0.81).abs() < 1e-12);
        assert_eq!(res.label, ConfidenceLabel::High);
    }

    #[test]
    fn half_evidence_without_hedges_is_low() {
        let res = score_answer(
            &triple(0.5, 0.5, 0.5),
            "Pick him.",
            &ConfidenceThresholds::default(),
        );
        assert_eq!(res.certainty_factor, 1.0);
        assert!((res.score - 0.5).abs() < 1e-12);
        assert_eq!(res.label, ConfidenceLabel::Low);
    }

    #[test]
    fn phrases_count_once_and_overlap_as_substrings() {
        // "may" appears three times but discounts once.
        assert!((certainty_factor("may may MAY") - 0.9).abs() < 1e-12);
        // "uncertainty" contains "uncertain"; "Mayank" contains "may".
        let hits = hedging_phrases("Mayank's uncertainty");
        assert_eq!(hits, vec!["uncertain", "may"]);
        assert!((certainty_factor("Mayank's uncertainty") - 0.81).abs() < 1e-12);
    }

    #[test]
    fn every_phrase_discounts() {
        let all = UNCERTAINTY_PHRASES.join(" ");
        let expected = CERTAINTY_DISCOUNT.powi(UNCERTAINTY_PHRASES.len() as i32);
        assert!((certainty_factor(&all) - expected).abs() < 1e-12);
    }

    #[test]
    fn labels_partition_unit_interval() {
        let t = ConfidenceThresholds::default();
        for i in 0..=1000 {
            let s = i as f64 / 1000.0;
            let expected = if s < 0.4 {
                ConfidenceLabel::VeryLow
            } else if s < 0.6 {
                ConfidenceLabel::Low
            } else if s < 0.8 {
                ConfidenceLabel::Medium
            } else {
                ConfidenceLabel::High
            };
            assert_eq!(t.label_for(s), expected, "score {s}");
        }
        assert_eq!(t.label_for(0.8), ConfidenceLabel::High);
        assert_eq!(t.label_for(0.6), ConfidenceLabel::Medium);
        assert_eq!(t.label_for(0.4), ConfidenceLabel::Low);
        assert_eq!(t.label_for(0.3999), ConfidenceLabel::VeryLow);
    }

    #[test]
    fn score_is_clamped_for_out_of_range_triples() {
        let t = ConfidenceThresholds::default();
        let hi = score_answer(&triple(3.0, 3.0, 3.0), "", &t);
        assert_eq!(hi.score, 1.0);
        let lo = score_answer(&triple(-1.0, -1.0, -1.0), "", &t);
        assert_eq!(lo.score, 0.0);
        assert_eq!(lo.label, ConfidenceLabel::VeryLow);
    }

    #[test]
    fn score_stays_in_unit_interval_on_a_grid() {
        let t = ConfidenceThresholds::default();
        let steps = [0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0];
        for &q in &steps {
            for &r in &steps {
                for &rel in &steps {
                    let res = score_answer(&triple(q, r, rel), "perhaps it may be unclear", &t);
                    assert!((0.0..=1.0).contains(&res.score));
                }
            }
        }
    }

    #[test]
    fn degenerate_evidence_is_very_low() {
        let res = score_answer(
            &triple(0.0, 0.5, 0.0),
            "Strong pick.",
            &ConfidenceThresholds::default(),
        );
        assert!((res.score - 0.15).abs() < 1e-12);
        assert_eq!(res.label, ConfidenceLabel::VeryLow);
    }

    #[test]
    fn labels_serialize_as_human_text() {
        let v = serde_json::to_value(ConfidenceLabel::VeryLow).unwrap();
        assert_eq!(v, serde_json::json!("Very Low Confidence"));
        assert_eq!(ConfidenceLabel::Medium.to_string(), "Medium Confidence");
    }

    #[test]
    fn custom_thresholds_shift_bands() {
        let t = ConfidenceThresholds {
            high: 0.9,
            medium: 0.5,
            low: 0.1,
        }
        .sanitized();
        assert_eq!(t.label_for(0.85), ConfidenceLabel::Medium);
        assert_eq!(t.label_for(0.15), ConfidenceLabel::Low);
    }
}

//! Data-quality assessment of an aggregated context.
//!
//! Three normalized signals in [0,1]:
//! - `data_quality`   : 0.6 * length score + 0.4 * stat density
//! - `data_recency`   : share of year mentions that are this year or last year
//! - `data_relevance` : stat density (same value as the stats score)
//!
//! Pure: the only ambient input is the current year, and [`assess_at`] takes
//! that explicitly.

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Context length (in chars) that earns a full length score.
pub const FULL_LENGTH_CHARS: f64 = 10_000.0;
/// Stat mentions that earn a full stats score.
pub const FULL_STAT_MENTIONS: f64 = 20.0;
/// Recency when the context mentions no year at all.
pub const NEUTRAL_RECENCY: f64 = 0.5;

static STAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:runs|wickets|average|strike rate|economy|points)\b")
        .expect("stat regex")
});

// ASCII digits only; other scripts never count as a year.
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20[0-9]{2})\b").expect("year regex"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityTriple {
    pub data_quality: f64,
    pub data_recency: f64,
    pub data_relevance: f64,
}

/// Intermediate scores, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityBreakdown {
    pub length_score: f64,
    pub stats_score: f64,
    pub recency_score: f64,
}

impl QualityBreakdown {
    pub fn triple(&self) -> QualityTriple {
        QualityTriple {
            data_quality: 0.6 * self.length_score + 0.4 * self.stats_score,
            data_recency: self.recency_score,
            data_relevance: self.stats_score,
        }
    }
}

/// Assess against the local wall-clock year.
pub fn assess(context: &str) -> QualityTriple {
    assess_at(context, chrono::Local::now().year())
}

pub fn assess_at(context: &str, current_year: i32) -> QualityTriple {
    breakdown_at(context, current_year).triple()
}

pub fn breakdown_at(context: &str, current_year: i32) -> QualityBreakdown {
    let length_score = (context.chars().count() as f64 / FULL_LENGTH_CHARS).min(1.0);
    let stats_score = (count_stat_mentions(context) as f64 / FULL_STAT_MENTIONS).min(1.0);
    let recency_score = recency_score(&extract_years(context), current_year);
    QualityBreakdown {
        length_score,
        stats_score,
        recency_score,
    }
}

/// Number like `45`, `7.5` followed by runs / wickets / average / strike rate / economy / points.
pub fn count_stat_mentions(context: &str) -> usize {
    STAT_RE.find_iter(context).count()
}

/// Every standalone `20xx` token, in order of appearance.
pub fn extract_years(context: &str) -> Vec<i32> {
    YEAR_RE
        .captures_iter(context)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .collect()
}

/// Fraction of year mentions `>= current_year - 1`; neutral when there are none.
pub fn recency_score(years: &[i32], current_year: i32) -> f64 {
    if years.is_empty() {
        return NEUTRAL_RECENCY;
    }
    let recent = years.iter().filter(|&&y| y >= current_year - 1).count();
    recent as f64 / years.len() as f64
}

//! Retrieved snippets and the context string built from them.
//!
//! The aggregated context is the only input of the data-quality assessor, so
//! block layout here directly affects scoring (length, stat mentions, years).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::search::SearchHit;

/// Per-snippet character cap used for multi-subject (captain) contexts.
pub const SUBJECT_SNIPPET_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetKind {
    General,
    Injury,
}

/// One retrieved search-result fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    pub text: String,
    pub title: String,
    pub url: String,
    pub retrieved_at: DateTime<Utc>,
    pub kind: SnippetKind,
}

impl EvidenceSnippet {
    /// Missing fields on the raw hit become empty strings.
    pub fn from_hit(hit: &SearchHit, kind: SnippetKind, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            text: hit.text.clone().unwrap_or_default(),
            title: hit.title.clone().unwrap_or_default(),
            url: hit.url.clone().unwrap_or_default(),
            retrieved_at,
            kind,
        }
    }

    pub fn from_hits(hits: &[SearchHit], kind: SnippetKind) -> Vec<Self> {
        let now = Utc::now();
        hits.iter().map(|h| Self::from_hit(h, kind, now)).collect()
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Concatenated evidence plus the number of snippets that contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedContext {
    pub context: String,
    pub sources_used: usize,
}

impl AggregatedContext {
    pub fn is_empty(&self) -> bool {
        self.sources_used == 0
    }
}

/// Incremental builder; input order is preserved.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    out: AggregatedContext,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `Source: {title}\n{text}\n\n`. Snippets without text are skipped.
    pub fn push(&mut self, snippet: &EvidenceSnippet) -> &mut Self {
        if snippet.has_text() {
            self.out.context.push_str("Source: ");
            self.out.context.push_str(&snippet.title);
            self.out.context.push('\n');
            self.out.context.push_str(&snippet.text);
            self.out.context.push_str("\n\n");
            self.out.sources_used += 1;
        }
        self
    }

    /// Same as [`ContextBuilder::push`] but prefixed with `Player: {subject}\n`
    /// and with the text cut to its first [`SUBJECT_SNIPPET_CHARS`] characters.
    pub fn push_for_subject(&mut self, subject: &str, snippet: &EvidenceSnippet) -> &mut Self {
        if snippet.has_text() {
            self.out.context.push_str("Player: ");
            self.out.context.push_str(subject);
            self.out.context.push_str("\nSource: ");
            self.out.context.push_str(&snippet.title);
            self.out.context.push('\n');
            self.out.context.push_str(truncate_chars(&snippet.text, SUBJECT_SNIPPET_CHARS));
            self.out.context.push_str("\n\n");
            self.out.sources_used += 1;
        }
        self
    }

    pub fn finish(self) -> AggregatedContext {
        self.out
    }
}

/// Aggregate a single-subject snippet list.
pub fn aggregate(snippets: &[EvidenceSnippet]) -> AggregatedContext {
    let mut b = ContextBuilder::new();
    for s in snippets {
        b.push(s);
    }
    b.finish()
}

/// Aggregate `(subject, snippets)` groups with the multi-subject block layout.
pub fn aggregate_subjects<S: AsRef<str>>(groups: &[(S, Vec<EvidenceSnippet>)]) -> AggregatedContext {
    let mut b = ContextBuilder::new();
    for (subject, snippets) in groups {
        for s in snippets {
            b.push_for_subject(subject.as_ref(), s);
        }
    }
    b.finish()
}

/// Prefix of `s` holding at most `max` chars (never splits a code point).
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

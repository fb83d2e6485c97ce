//! Query Relevance Gate
//!
//! Decides whether a free-text question is a data-analysis question worth
//! sending to the language model. Matching is case-insensitive substring
//! matching against lexicon terms.
//!
//! Two modes:
//! - context-aware, when column names are known: the question needs a
//!   question indicator and a reference to the dataset (a column name, a
//!   column-name fragment, a term of a bucket the columns activate, or as a
//!   fallback a basic data term)
//! - context-free, otherwise: a domain term, or an indicator together with a
//!   basic data term

use crate::config::{DEFAULT_MAX_QUESTION_LENGTH, DEFAULT_MIN_QUESTION_LENGTH};
use crate::error::Result;
use crate::lexicon::Lexicon;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Column-name fragments must be longer than this to count as a reference
const MIN_FRAGMENT_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateMode {
    ContextAware,
    ContextFree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceDecision {
    pub relevant: bool,
    pub mode: GateMode,
    pub reason: String,
}

impl RelevanceDecision {
    fn accept(mode: GateMode, reason: impl Into<String>) -> Self {
        Self { relevant: true, mode, reason: reason.into() }
    }

    fn reject(mode: GateMode, reason: impl Into<String>) -> Self {
        Self { relevant: false, mode, reason: reason.into() }
    }
}

#[derive(Debug, Clone)]
pub struct RelevanceGate {
    lexicon: Lexicon,
    min_len: usize,
    max_len: usize,
    /// Session-scoped columns used when a call passes none
    active_columns: Option<Vec<String>>,
}

impl RelevanceGate {
    pub fn new(lexicon: Lexicon) -> Self {
        Self {
            lexicon,
            min_len: DEFAULT_MIN_QUESTION_LENGTH,
            max_len: DEFAULT_MAX_QUESTION_LENGTH,
            active_columns: None,
        }
    }

    /// Gate over the built-in lexicon with default length bounds
    pub fn with_builtin_lexicon() -> Result<Self> {
        Ok(Self::new(Lexicon::builtin()?))
    }

    pub fn with_length_bounds(mut self, min_len: usize, max_len: usize) -> Self {
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn set_active_columns<S: AsRef<str>>(&mut self, columns: &[S]) {
        self.active_columns = Some(columns.iter().map(|c| c.as_ref().to_string()).collect());
    }

    pub fn clear_active_columns(&mut self) {
        self.active_columns = None;
    }

    pub fn active_columns(&self) -> Option<&[String]> {
        self.active_columns.as_deref()
    }

    pub fn is_relevant<S: AsRef<str>>(&self, query: &str, columns: Option<&[S]>) -> bool {
        self.evaluate(query, columns).relevant
    }

    /// Explicit columns take precedence over the active columns.
    pub fn evaluate<S: AsRef<str>>(&self, query: &str, columns: Option<&[S]>) -> RelevanceDecision {
        let columns: Option<Vec<String>> = match columns {
            Some(cols) => Some(cols.iter().map(|c| c.as_ref().to_lowercase()).collect()),
            None => self
                .active_columns
                .as_ref()
                .map(|cols| cols.iter().map(|c| c.to_lowercase()).collect()),
        };

        let decision = match columns {
            Some(cols) if !cols.is_empty() => self.evaluate_with_columns(query, &cols),
            _ => self.evaluate_without_columns(query),
        };
        debug!(
            "Relevance gate ({:?}): relevant={} ({})",
            decision.mode, decision.relevant, decision.reason
        );
        decision
    }

    fn evaluate_with_columns(&self, query: &str, columns: &[String]) -> RelevanceDecision {
        let mode = GateMode::ContextAware;
        let q = query.trim().to_lowercase();

        if !self.length_ok(&q) {
            return RelevanceDecision::reject(mode, "question length out of bounds");
        }
        if !contains_any(&q, self.lexicon.question_indicators()) {
            return RelevanceDecision::reject(mode, "no question indicator");
        }

        // 1. whole column names
        if let Some(col) = columns.iter().find(|c| q.contains(c.as_str())) {
            return RelevanceDecision::accept(mode, format!("mentions column '{}'", col));
        }

        // 2. fragments of underscore-separated column names
        let fragment = columns
            .iter()
            .flat_map(|c| c.split('_'))
            .filter(|f| f.chars().count() > MIN_FRAGMENT_LEN)
            .find(|f| q.contains(f));
        if let Some(f) = fragment {
            return RelevanceDecision::accept(mode, format!("mentions column fragment '{}'", f));
        }

        // 3. terms of buckets activated by the columns
        for bucket in self.lexicon.active_buckets(columns) {
            if let Some(term) = self.lexicon.bucket_terms(&bucket.name).find(|t| q.contains(t)) {
                return RelevanceDecision::accept(
                    mode,
                    format!("{} term '{}'", bucket.name, term),
                );
            }
        }

        if let Some(term) = self.lexicon.basic_terms().find(|t| q.contains(t)) {
            return RelevanceDecision::accept(mode, format!("basic data term '{}'", term));
        }

        RelevanceDecision::reject(mode, "no reference to the dataset")
    }

    fn evaluate_without_columns(&self, query: &str) -> RelevanceDecision {
        let mode = GateMode::ContextFree;
        let q = query.trim().to_lowercase();

        if !self.length_ok(&q) {
            return RelevanceDecision::reject(mode, "question length out of bounds");
        }
        if let Some(term) = self.lexicon.domain_terms().find(|t| q.contains(t)) {
            return RelevanceDecision::accept(mode, format!("domain term '{}'", term));
        }
        if contains_any(&q, self.lexicon.question_indicators())
            && contains_any(&q, self.lexicon.basic_terms())
        {
            return RelevanceDecision::accept(mode, "question about data");
        }

        RelevanceDecision::reject(mode, "no data-analysis terms")
    }

    fn length_ok(&self, trimmed: &str) -> bool {
        let len = trimmed.chars().count();
        len >= self.min_len && len <= self.max_len
    }
}

fn contains_any<'a>(haystack: &str, mut terms: impl Iterator<Item = &'a str>) -> bool {
    terms.any(|t| !t.is_empty() && haystack.contains(t))
}

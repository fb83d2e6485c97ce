//! Lexicon tables for the relevance gate and the assistant.
//!
//! Structured as language -> category -> terms. The built-in tables are
//! embedded from `config/lexicon.json`; a replacement file with the same
//! shape can be loaded at startup.

use crate::error::{AnalystError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

const BUILTIN_LEXICON: &str = include_str!("../config/lexicon.json");

/// A column-name family and the substrings that identify it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBucket {
    pub name: String,
    pub markers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguagePack {
    pub question_indicators: Vec<String>,
    pub basic_terms: Vec<String>,
    /// Domain category -> terms
    pub domains: BTreeMap<String, Vec<String>>,
    /// Bucket name -> terms that refer to that bucket in a question
    #[serde(default)]
    pub bucket_terms: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub opinion_requests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    pub languages: BTreeMap<String, LanguagePack>,
    #[serde(default)]
    pub buckets: Vec<ColumnBucket>,
}

impl Lexicon {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_LEXICON)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let lexicon = Self::from_json(&raw)?;
        info!("Loaded lexicon from {}", path.display());
        Ok(lexicon)
    }

    /// The file at `path` when given, otherwise the built-in tables.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let lexicon: Lexicon = serde_json::from_str(raw)?;
        lexicon.validate()?;
        Ok(lexicon.normalized())
    }

    fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            return Err(AnalystError::Lexicon("no languages defined".to_string()));
        }
        for (lang, pack) in &self.languages {
            if pack.question_indicators.is_empty() {
                return Err(AnalystError::Lexicon(format!(
                    "language '{}' has no question indicators",
                    lang
                )));
            }
            if let Some(unknown) = pack
                .bucket_terms
                .keys()
                .find(|name| !self.buckets.iter().any(|b| &b.name == *name))
            {
                return Err(AnalystError::Lexicon(format!(
                    "language '{}' has terms for undefined bucket '{}'",
                    lang, unknown
                )));
            }
        }
        Ok(())
    }

    /// Lowercase every term so matching can assume lowercase input.
    fn normalized(mut self) -> Self {
        fn lower(terms: &mut [String]) {
            for t in terms.iter_mut() {
                *t = t.trim().to_lowercase();
            }
        }

        for bucket in &mut self.buckets {
            lower(&mut bucket.markers);
        }
        for pack in self.languages.values_mut() {
            lower(&mut pack.question_indicators);
            lower(&mut pack.basic_terms);
            lower(&mut pack.opinion_requests);
            pack.domains.values_mut().for_each(|t| lower(t));
            pack.bucket_terms.values_mut().for_each(|t| lower(t));
        }
        self
    }

    pub fn question_indicators(&self) -> impl Iterator<Item = &str> {
        self.languages
            .values()
            .flat_map(|p| p.question_indicators.iter().map(String::as_str))
    }

    pub fn basic_terms(&self) -> impl Iterator<Item = &str> {
        self.languages
            .values()
            .flat_map(|p| p.basic_terms.iter().map(String::as_str))
    }

    pub fn domain_terms(&self) -> impl Iterator<Item = &str> {
        self.languages
            .values()
            .flat_map(|p| p.domains.values().flatten().map(String::as_str))
    }

    pub fn opinion_requests(&self) -> impl Iterator<Item = &str> {
        self.languages
            .values()
            .flat_map(|p| p.opinion_requests.iter().map(String::as_str))
    }

    /// Terms for one bucket across every language
    pub fn bucket_terms<'a>(&'a self, bucket: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.languages
            .values()
            .filter_map(move |p| p.bucket_terms.get(bucket))
            .flatten()
            .map(String::as_str)
    }

    /// Buckets whose markers appear in at least one of the column names
    pub fn active_buckets<S: AsRef<str>>(&self, columns: &[S]) -> Vec<&ColumnBucket> {
        let lowered: Vec<String> = columns.iter().map(|c| c.as_ref().to_lowercase()).collect();
        self.buckets
            .iter()
            .filter(|b| {
                b.markers
                    .iter()
                    .any(|m| lowered.iter().any(|c| c.contains(m.as_str())))
            })
            .collect()
    }
}

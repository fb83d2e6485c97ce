//! Context Assembler
//!
//! Builds the LLM-ready text context for a dataset by concatenating the
//! rendered sections of the other analysis components. Section order is
//! fixed per profile and sections are separated by one blank line.

use crate::dataset::Dataset;
use crate::error::{AnalystError, Result};
use crate::patterns::analyze_patterns;
use crate::quality::assess_quality;
use crate::sampler::Sampler;
use crate::summary::summarize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextProfile {
    /// Overview + sample
    Quick,
    /// Overview + statistical summary
    Statistical,
    /// Every section
    Comprehensive,
}

impl FromStr for ContextProfile {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "quick" => Ok(ContextProfile::Quick),
            "statistical" => Ok(ContextProfile::Statistical),
            "comprehensive" => Ok(ContextProfile::Comprehensive),
            other => Err(AnalystError::UnsupportedProfile(other.to_string())),
        }
    }
}

impl fmt::Display for ContextProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextProfile::Quick => write!(f, "quick"),
            ContextProfile::Statistical => write!(f, "statistical"),
            ContextProfile::Comprehensive => write!(f, "comprehensive"),
        }
    }
}

/// Assembles context text with a configured sampler.
pub struct ContextAssembler {
    sampler: Sampler,
}

impl ContextAssembler {
    pub fn new(sampler: Sampler) -> Self {
        Self { sampler }
    }

    pub fn assemble(&self, dataset: &Dataset, profile: ContextProfile) -> Result<String> {
        let mut sections = vec![overview(dataset)];

        match profile {
            ContextProfile::Quick => {
                sections.push(self.sampler.sample(dataset)?.render()?);
            }
            ContextProfile::Statistical => {
                sections.push(summarize(dataset)?.render());
            }
            ContextProfile::Comprehensive => {
                sections.push(assess_quality(dataset)?.render());
                sections.push(summarize(dataset)?.render());
                sections.push(self.sampler.sample(dataset)?.render()?);
                sections.push(analyze_patterns(dataset)?.render());
            }
        }

        let context = sections.join("\n\n");
        debug!(
            "Assembled {} context: {} sections, {} chars",
            profile,
            sections.len(),
            context.len()
        );
        Ok(context)
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(Sampler::new(crate::config::DEFAULT_MAX_SAMPLE_SIZE))
    }
}

/// Build context for a profile name (`quick`, `statistical`, `comprehensive`).
pub fn build_context(dataset: &Dataset, profile: &str) -> Result<String> {
    let profile: ContextProfile = profile.parse()?;
    ContextAssembler::default().assemble(dataset, profile)
}

/// The `=== DATASET OVERVIEW ===` section
pub fn overview(dataset: &Dataset) -> String {
    format!(
        "=== DATASET OVERVIEW ===\n\
         • Total rows: {}\n\
         • Total columns: {}\n\
         • Memory usage: {:.2} MB\n\
         • Columns: {}",
        thousands(dataset.height()),
        dataset.width(),
        dataset.estimated_size_mb(),
        dataset.column_names().join(", ")
    )
}

/// `1234567` -> `1,234,567`
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Which section to compute per chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkAnalysis {
    Summary,
    Quality,
    Patterns,
}

impl FromStr for ChunkAnalysis {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(ChunkAnalysis::Summary),
            "quality" => Ok(ChunkAnalysis::Quality),
            "patterns" => Ok(ChunkAnalysis::Patterns),
            other => Err(AnalystError::InvalidInput(format!(
                "unknown chunk analysis: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkReport {
    /// 1-based
    pub chunk_id: usize,
    /// 1-based, inclusive
    pub start_row: usize,
    /// 1-based, inclusive
    pub end_row: usize,
    pub size: usize,
    pub analysis: String,
}

/// Run one analysis over consecutive row chunks of at most `chunk_size` rows.
pub fn chunked_analysis(
    dataset: &Dataset,
    analysis: ChunkAnalysis,
    chunk_size: usize,
) -> Result<Vec<ChunkReport>> {
    if chunk_size == 0 {
        return Err(AnalystError::InvalidInput(
            "chunk size must be positive".to_string(),
        ));
    }

    let total_rows = dataset.height();
    let mut reports = Vec::with_capacity(total_rows.div_ceil(chunk_size));

    for (i, start) in (0..total_rows).step_by(chunk_size).enumerate() {
        let chunk = dataset.slice(start, chunk_size);
        let size = chunk.height();

        let text = match analysis {
            ChunkAnalysis::Summary => summarize(&chunk)?.render(),
            ChunkAnalysis::Quality => assess_quality(&chunk)?.render(),
            ChunkAnalysis::Patterns => analyze_patterns(&chunk)?.render(),
        };

        reports.push(ChunkReport {
            chunk_id: i + 1,
            start_row: start + 1,
            end_row: start + size,
            size,
            analysis: text,
        });
    }

    debug!(
        "Chunked {:?} analysis: {} rows in {} chunks",
        analysis,
        total_rows,
        reports.len()
    );
    Ok(reports)
}

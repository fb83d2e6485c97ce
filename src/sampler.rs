//! Intelligent Sampler
//!
//! Reduces a dataset to at most `max_sample_size` rows for an LLM prompt while
//! keeping it representative. Larger datasets go through an ordered list of
//! candidate strategies; each either produces a selection or reports itself
//! unavailable, and the first available one wins:
//!
//! 1. Stratified by the first categorical column
//! 2. Head + random + tail (always available)
//!
//! A candidate failing is never an error for the caller; it only shows up in
//! the strategy label and rationale of the result.

use crate::dataset::{render_cells, Dataset, SemanticType};
use crate::error::{AnalystError, Result};
use crate::table::TextTable;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Fixed seed so the same dataset always yields the same sample
pub const DEFAULT_SEED: u64 = 42;

/// Rows and columns shown when a sample is rendered into the context
pub const DISPLAY_MAX_ROWS: usize = 50;
pub const DISPLAY_MAX_COLS: usize = 10;

/// Helper column carrying row positions through group-by and unique
const POSITION_COLUMN: &str = "__row_position";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleStrategy {
    /// Dataset already fits the budget
    Complete,
    HeadRandomTail,
    Stratified { column: String },
}

impl SampleStrategy {
    /// Short machine-friendly label
    pub fn label(&self) -> String {
        match self {
            SampleStrategy::Complete => "complete".to_string(),
            SampleStrategy::HeadRandomTail => "head-random-tail".to_string(),
            SampleStrategy::Stratified { column } => format!("stratified-by-{}", column),
        }
    }
}

impl fmt::Display for SampleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleStrategy::Complete => write!(f, "Complete dataset (small size)"),
            SampleStrategy::HeadRandomTail => write!(f, "Head + Random + Tail sampling"),
            SampleStrategy::Stratified { column } => write!(f, "Stratified sampling by {}", column),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleResult {
    pub data: Dataset,
    pub strategy: SampleStrategy,
    /// Human-readable explanation of what the sample contains
    pub rationale: Option<String>,
    /// Source row position of every sampled row, in sample order
    pub source_rows: Vec<usize>,
}

/// A candidate strategy declined to produce a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyUnavailable {
    pub strategy: &'static str,
    pub reason: String,
}

impl fmt::Display for StrategyUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unavailable: {}", self.strategy, self.reason)
    }
}

/// Row positions chosen by a strategy, plus how to describe them
#[derive(Debug, Clone)]
pub struct Selection {
    pub rows: Vec<usize>,
    pub strategy: SampleStrategy,
    pub rationale: String,
}

pub trait SamplingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Select at most `budget` rows, or report why this strategy does not apply.
    fn select(
        &self,
        dataset: &Dataset,
        budget: usize,
        seed: u64,
    ) -> std::result::Result<Selection, StrategyUnavailable>;
}

/// Stratify by the first categorical column in column order.
pub struct StratifiedByCategory;

impl SamplingStrategy for StratifiedByCategory {
    fn name(&self) -> &'static str {
        "stratified"
    }

    fn select(
        &self,
        dataset: &Dataset,
        budget: usize,
        seed: u64,
    ) -> std::result::Result<Selection, StrategyUnavailable> {
        let unavailable = |reason: String| StrategyUnavailable {
            strategy: "stratified",
            reason,
        };

        let column = dataset
            .columns_of(SemanticType::Categorical)
            .into_iter()
            .next()
            .ok_or_else(|| unavailable("no categorical column".to_string()))?;
        let column_name = column.name().to_string();

        let groups = strata(column).map_err(|e| unavailable(e.to_string()))?;

        let distinct = groups.len();
        if distinct == 0 {
            return Err(unavailable(format!("column {} has no non-null values", column_name)));
        }
        if distinct > budget {
            return Err(unavailable(format!(
                "column {} has {} categories, more than the {} row budget",
                column_name, distinct, budget
            )));
        }

        let per_group = (budget / distinct).max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut rows = Vec::with_capacity(budget);
        for members in &groups {
            let take = members.len().min(per_group);
            let mut picked: Vec<usize> = index::sample(&mut rng, members.len(), take)
                .into_iter()
                .map(|i| members[i])
                .collect();
            picked.sort_unstable();
            rows.extend(picked);
        }
        rows.truncate(budget);

        Ok(Selection {
            rows,
            strategy: SampleStrategy::Stratified {
                column: column_name.clone(),
            },
            rationale: format!("Stratified by {} with {} categories", column_name, distinct),
        })
    }
}

/// Row positions of every non-null value of `column`, grouped by value in
/// order of first appearance.
fn strata(column: &Series) -> Result<Vec<Vec<usize>>> {
    let grouped = DataFrame::new(vec![column.clone().with_name("stratum")])?
        .with_row_index(POSITION_COLUMN, None)?
        .lazy()
        .filter(col("stratum").is_not_null())
        .group_by_stable([col("stratum")])
        .agg([col(POSITION_COLUMN)])
        .collect()?;

    let mut groups = Vec::with_capacity(grouped.height());
    for members in grouped.column(POSITION_COLUMN)?.list()?.into_iter().flatten() {
        let members = members.cast(&DataType::Int64)?;
        groups.push(members.i64()?.into_iter().flatten().map(|r| r as usize).collect());
    }
    Ok(groups)
}

/// First rows, uniformly random rows, and last rows, without exact duplicates.
pub struct HeadRandomTail;

impl SamplingStrategy for HeadRandomTail {
    fn name(&self) -> &'static str {
        "head-random-tail"
    }

    fn select(
        &self,
        dataset: &Dataset,
        budget: usize,
        seed: u64,
    ) -> std::result::Result<Selection, StrategyUnavailable> {
        let total = dataset.height();
        let third = budget / 3;
        // budgets below three rows are taken from the head
        let head = if third == 0 { budget } else { third }.min(total);
        let random = third.min(total);
        let tail = third.min(total);

        let mut rng = StdRng::seed_from_u64(seed);
        let mut random_rows = index::sample(&mut rng, total, random).into_vec();
        random_rows.sort_unstable();

        let candidates: Vec<usize> = (0..head)
            .chain(random_rows)
            .chain(total - tail..total)
            .collect();

        let rows = match first_distinct(dataset, &candidates) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Could not compare rows for de-duplication, keeping all picks: {}", e);
                let mut seen = HashSet::with_capacity(candidates.len());
                candidates.into_iter().filter(|row| seen.insert(*row)).collect()
            }
        };

        Ok(Selection {
            rows,
            strategy: SampleStrategy::HeadRandomTail,
            rationale: format!(
                "Includes first {}, random {}, and last {} rows",
                head, random, tail
            ),
        })
    }
}

/// Candidate rows whose content differs from every earlier candidate, in
/// candidate order.
fn first_distinct(dataset: &Dataset, candidates: &[usize]) -> Result<Vec<usize>> {
    let subset = dataset.column_names();
    let kept = dataset
        .take_rows(candidates)?
        .into_frame()
        .with_row_index(POSITION_COLUMN, None)?
        .lazy()
        .unique_stable(Some(subset), UniqueKeepStrategy::First)
        .collect()?;

    let positions = kept.column(POSITION_COLUMN)?.cast(&DataType::Int64)?;
    let rows = positions
        .i64()?
        .into_iter()
        .flatten()
        .map(|p| candidates[p as usize])
        .collect();
    Ok(rows)
}

pub struct Sampler {
    max_sample_size: usize,
    seed: u64,
    candidates: Vec<Box<dyn SamplingStrategy>>,
}

impl Sampler {
    /// Default candidate order: stratified first, head/random/tail as fallback
    pub fn new(max_sample_size: usize) -> Self {
        Self {
            max_sample_size,
            seed: DEFAULT_SEED,
            candidates: vec![Box::new(StratifiedByCategory), Box::new(HeadRandomTail)],
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the candidate list. `HeadRandomTail` is appended when missing so
    /// there is always an available strategy.
    pub fn with_candidates(mut self, mut candidates: Vec<Box<dyn SamplingStrategy>>) -> Self {
        if !candidates.iter().any(|c| c.name() == HeadRandomTail.name()) {
            candidates.push(Box::new(HeadRandomTail));
        }
        self.candidates = candidates;
        self
    }

    pub fn max_sample_size(&self) -> usize {
        self.max_sample_size
    }

    pub fn sample(&self, dataset: &Dataset) -> Result<SampleResult> {
        if self.max_sample_size == 0 {
            return Err(AnalystError::InvalidInput(
                "max_sample_size must be positive".to_string(),
            ));
        }

        let total = dataset.height();
        if total <= self.max_sample_size {
            debug!("Dataset has {} rows, within budget {}", total, self.max_sample_size);
            return Ok(SampleResult {
                data: dataset.clone(),
                strategy: SampleStrategy::Complete,
                rationale: None,
                source_rows: (0..total).collect(),
            });
        }

        let mut declined: Vec<StrategyUnavailable> = Vec::new();
        for candidate in &self.candidates {
            match candidate.select(dataset, self.max_sample_size, self.seed) {
                Ok(selection) => {
                    info!(
                        "Sampled {} of {} rows using {}",
                        selection.rows.len(),
                        total,
                        selection.strategy.label()
                    );
                    let mut rationale = selection.rationale;
                    for d in &declined {
                        rationale.push_str(&format!("; {}", d));
                    }
                    return Ok(SampleResult {
                        data: dataset.take_rows(&selection.rows)?,
                        strategy: selection.strategy,
                        rationale: Some(rationale),
                        source_rows: selection.rows,
                    });
                }
                Err(unavailable) => {
                    warn!("Sampling strategy degraded: {}", unavailable);
                    declined.push(unavailable);
                }
            }
        }

        Err(AnalystError::InvalidInput(format!(
            "no sampling strategy available for {} rows",
            total
        )))
    }
}

/// Sample with the default strategy order and seed
pub fn sample(dataset: &Dataset, max_size: usize) -> Result<SampleResult> {
    Sampler::new(max_size).sample(dataset)
}

impl SampleResult {
    /// The `=== INTELLIGENT DATA SAMPLE ===` context section
    pub fn render(&self) -> Result<String> {
        let mut info = String::from("=== INTELLIGENT DATA SAMPLE ===\n");
        info.push_str(&format!("Sample strategy: {}\n", self.strategy));
        info.push_str(&format!("Sample size: {} rows\n\n", self.data.height()));
        info.push_str("Sample data:\n");
        info.push_str(&self.table()?.render_truncated(Some(DISPLAY_MAX_ROWS), Some(DISPLAY_MAX_COLS)));

        if let Some(rationale) = &self.rationale {
            info.push_str(&format!("\n\nAdditional sampling info:\n{}", rationale));
        }
        Ok(info)
    }

    /// Sample rows as a text table indexed by source row position
    pub fn table(&self) -> Result<TextTable> {
        let columns = self
            .data
            .columns()
            .iter()
            .map(render_cells)
            .collect::<Result<Vec<_>>>()?;

        let mut table = TextTable::new(self.data.column_names());
        for (pos, source_row) in self.source_rows.iter().enumerate() {
            let cells = columns
                .iter()
                .map(|c| c[pos].clone().unwrap_or_else(|| "null".to_string()))
                .collect();
            table.push_row(source_row.to_string(), cells);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn numeric_frame(rows: usize) -> Dataset {
        let values: Vec<i64> = (0..rows as i64).collect();
        Dataset::new(df!("v" => values).unwrap()).unwrap()
    }

    #[test]
    fn test_small_dataset_is_returned_whole() {
        let ds = numeric_frame(20);
        let result = sample(&ds, 100).unwrap();
        assert_eq!(result.strategy, SampleStrategy::Complete);
        assert_eq!(result.strategy.to_string(), "Complete dataset (small size)");
        assert!(result.data.frame().equals(ds.frame()));
        assert!(result.rationale.is_none());
    }

    #[test]
    fn test_head_random_tail_without_categories() {
        let ds = numeric_frame(1000);
        let result = sample(&ds, 30).unwrap();
        assert_eq!(result.strategy, SampleStrategy::HeadRandomTail);
        assert!(result.data.height() <= 30);
        assert_eq!(&result.source_rows[..10], &(0..10).collect::<Vec<_>>()[..]);
        assert!(result.source_rows.contains(&999));
        let rationale = result.rationale.unwrap();
        assert!(rationale.contains("Includes first 10, random 10, and last 10 rows"));
        assert!(rationale.contains("no categorical column"));
    }

    #[test]
    fn test_head_random_tail_takes_equal_thirds() {
        let ds = numeric_frame(1000);
        let result = sample(&ds, 100).unwrap();
        assert!(result.data.height() <= 99);
        assert_eq!(&result.source_rows[..33], &(0..33).collect::<Vec<_>>()[..]);
        assert!((967..1000).all(|r| result.source_rows.contains(&r)));
        assert!(result
            .rationale
            .unwrap()
            .contains("Includes first 33, random 33, and last 33 rows"));

        let tiny = sample(&ds, 2).unwrap();
        assert_eq!(tiny.source_rows, vec![0, 1]);
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let ds = numeric_frame(500);
        let a = sample(&ds, 40).unwrap();
        let b = sample(&ds, 40).unwrap();
        assert_eq!(a.source_rows, b.source_rows);
    }

    #[test]
    fn test_head_random_tail_drops_duplicate_rows() {
        let values: Vec<i64> = vec![7; 200];
        let ds = Dataset::new(df!("v" => values).unwrap()).unwrap();
        let result = sample(&ds, 30).unwrap();
        assert_eq!(result.data.height(), 1);
    }

    #[test]
    fn test_stratified_falls_back_when_all_categories_null() {
        let regions: Vec<Option<&str>> = vec![None; 120];
        let values: Vec<i64> = (0..120).collect();
        let ds = Dataset::new(df!("region" => regions, "v" => values).unwrap()).unwrap();

        let result = sample(&ds, 30).unwrap();
        assert_eq!(result.strategy, SampleStrategy::HeadRandomTail);
        assert!(result.rationale.unwrap().contains("no non-null values"));
    }

    #[test]
    fn test_stratified_falls_back_with_too_many_categories() {
        let ids: Vec<String> = (0..200).map(|i| format!("id-{}", i)).collect();
        let ds = Dataset::new(df!("id" => ids).unwrap()).unwrap();
        let result = sample(&ds, 50).unwrap();
        assert_eq!(result.strategy, SampleStrategy::HeadRandomTail);
        assert_eq!(result.strategy.label(), "head-random-tail");
    }

    #[test]
    fn test_stratified_covers_every_category() {
        let regions: Vec<&str> = (0..150)
            .map(|i| match i % 10 {
                0 => "rare",
                1..=4 => "east",
                _ => "west",
            })
            .collect();
        let ds = Dataset::new(df!("region" => regions).unwrap()).unwrap();

        let result = sample(&ds, 30).unwrap();
        assert_eq!(result.strategy.label(), "stratified-by-region");
        assert_eq!(result.data.height(), 30);

        let counts = crate::summary::value_counts(result.data.column("region").unwrap()).unwrap();
        assert_eq!(counts.len(), 3);
        assert!(counts.iter().all(|c| c.count == 10));
    }

    #[test]
    fn test_zero_budget_is_invalid() {
        let ds = numeric_frame(10);
        assert!(matches!(sample(&ds, 0), Err(AnalystError::InvalidInput(_))));
    }

    #[test]
    fn test_render_reports_strategy_and_rationale() {
        let ds = numeric_frame(300);
        let text = sample(&ds, 30).unwrap().render().unwrap();
        assert!(text.starts_with("=== INTELLIGENT DATA SAMPLE ===\n"));
        assert!(text.contains("Sample strategy: Head + Random + Tail sampling"));
        assert!(text.contains("Sample size: "));
        assert!(text.contains("Additional sampling info:"));
    }
}

//! Pattern Analyzer
//!
//! Three independent analyses over a dataset:
//! - strong pairwise Pearson correlations between numeric columns
//! - category spread of every categorical column
//! - heavily skewed numeric columns
//!
//! An analysis with nothing to report renders an explicit statement instead
//! of being dropped.

use crate::dataset::{Dataset, SemanticType};
use crate::error::Result;
use crate::stats::{aggregate, scalar, spread_is_degenerate};
use crate::summary::value_counts;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// |r| must exceed this for a pair to be reported
pub const CORRELATION_THRESHOLD: f64 = 0.7;
/// |skew| must exceed this for a column to be flagged
pub const SKEW_THRESHOLD: f64 = 1.0;
/// Categorical columns with at most this many values count as evenly spread
pub const EVEN_CATEGORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub column_a: String,
    pub column_b: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkewDirection {
    Right,
    Left,
}

impl fmt::Display for SkewDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkewDirection::Right => write!(f, "right"),
            SkewDirection::Left => write!(f, "left"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DistributionInsight {
    EvenCategories {
        column: String,
        categories: usize,
    },
    DominantCategory {
        column: String,
        categories: usize,
        /// Share of all rows held by the most frequent value, in percent
        top_share: f64,
    },
    Skewed {
        column: String,
        skew: f64,
        direction: SkewDirection,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    /// `None` when fewer than two numeric columns exist
    pub correlations: Option<Vec<CorrelationPair>>,
    pub distributions: Vec<DistributionInsight>,
}

pub fn analyze_patterns(dataset: &Dataset) -> Result<PatternReport> {
    Ok(PatternReport {
        correlations: strong_correlations(dataset)?,
        distributions: distribution_insights(dataset)?,
    })
}

/// Every unordered numeric column pair with |r| above the threshold, once.
pub fn strong_correlations(dataset: &Dataset) -> Result<Option<Vec<CorrelationPair>>> {
    let numeric = dataset.columns_of(SemanticType::Numeric);
    if numeric.len() < 2 {
        return Ok(None);
    }

    let names: Vec<&str> = numeric.iter().map(|s| s.name()).collect();
    let float = |name: &str| col(name).cast(DataType::Float64);
    let mut exprs = Vec::new();
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            exprs.push(pearson_corr(float(names[i]), float(names[j]), 1).alias(&format!("{}_{}", i, j)));
        }
    }
    let coefficients = dataset.frame().clone().lazy().select(exprs).collect()?;

    let mut pairs = Vec::new();
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            // constant columns give NaN, which reads as no coefficient
            if let Some(r) = scalar(&coefficients, &format!("{}_{}", i, j))? {
                if r.abs() > CORRELATION_THRESHOLD {
                    pairs.push(CorrelationPair {
                        column_a: names[i].to_string(),
                        column_b: names[j].to_string(),
                        coefficient: r.clamp(-1.0, 1.0),
                    });
                }
            }
        }
    }
    Ok(Some(pairs))
}

/// Adjusted Fisher-Pearson skewness (G1) of the non-null values.
/// `None` below three values; constant columns have zero skew.
pub fn column_skew(series: &Series) -> Result<Option<f64>> {
    let present = series.drop_nulls();
    if present.len() < 3 {
        return Ok(None);
    }
    let name = present.name();
    let out = aggregate(
        &present,
        vec![
            col(name).skew(false).alias("skew"),
            col(name).std(0).alias("spread"),
            col(name).mean().alias("mean"),
        ],
    )?;

    match (scalar(&out, "spread")?, scalar(&out, "mean")?) {
        (Some(spread), Some(mean)) if spread_is_degenerate(spread, mean) => Ok(Some(0.0)),
        _ => scalar(&out, "skew"),
    }
}

/// Category spread and skew flags, in column order
pub fn distribution_insights(dataset: &Dataset) -> Result<Vec<DistributionInsight>> {
    let total_rows = dataset.height();
    let mut insights = Vec::new();

    for series in dataset.columns() {
        let column = series.name().to_string();
        match SemanticType::of(series.dtype()) {
            SemanticType::Categorical => {
                let counts = value_counts(series)?;
                if counts.len() <= EVEN_CATEGORY_LIMIT {
                    insights.push(DistributionInsight::EvenCategories {
                        column,
                        categories: counts.len(),
                    });
                } else {
                    let top_share = counts[0].count as f64 / total_rows as f64 * 100.0;
                    insights.push(DistributionInsight::DominantCategory {
                        column,
                        categories: counts.len(),
                        top_share,
                    });
                }
            }
            SemanticType::Numeric => {
                if let Some(skew) = column_skew(series)? {
                    if skew.abs() > SKEW_THRESHOLD {
                        let direction = if skew > 0.0 {
                            SkewDirection::Right
                        } else {
                            SkewDirection::Left
                        };
                        insights.push(DistributionInsight::Skewed {
                            column,
                            skew,
                            direction,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(insights)
}

impl PatternReport {
    /// The `=== PATTERN ANALYSIS ===` context section
    pub fn render(&self) -> String {
        let mut info = String::from("=== PATTERN ANALYSIS ===\n");

        match &self.correlations {
            Some(pairs) if !pairs.is_empty() => {
                info.push_str(&format!(
                    "Strong correlations (|r| > {}):\n",
                    CORRELATION_THRESHOLD
                ));
                for p in pairs {
                    info.push_str(&format!(
                        "  • {} ↔ {}: {:.3}\n",
                        p.column_a, p.column_b, p.coefficient
                    ));
                }
            }
            Some(_) => info.push_str("• No strong correlations detected\n"),
            None => info.push_str(
                "• No strong correlations detected (fewer than 2 numeric columns)\n",
            ),
        }

        info.push_str("\nValue distribution insights:\n");
        if self.distributions.is_empty() {
            info.push_str("  • No notable distribution patterns detected\n");
        }
        for insight in &self.distributions {
            let line = match insight {
                DistributionInsight::EvenCategories { column, categories } => format!(
                    "  • {}: Evenly distributed across {} categories\n",
                    column, categories
                ),
                DistributionInsight::DominantCategory {
                    column,
                    categories,
                    top_share,
                } => format!(
                    "  • {}: {} categories, top category: {:.1}%\n",
                    column, categories, top_share
                ),
                DistributionInsight::Skewed {
                    column,
                    skew,
                    direction,
                } => format!(
                    "  • {}: Highly skewed {} (skew: {:.2})\n",
                    column, direction, skew
                ),
            };
            info.push_str(&line);
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_correlations_reported_once_per_pair() {
        let df = df!(
            "x" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "y" => [2.0, 4.1, 6.0, 8.2, 10.0],
            "z" => [5.0, 4.0, 3.0, 2.0, 1.0],
            "noise" => [1.0, -1.0, 1.0, -1.0, 1.0]
        )
        .unwrap();
        let pairs = strong_correlations(&Dataset::new(df).unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(pairs.len(), 3);
        for p in &pairs {
            assert_ne!(p.column_a, p.column_b);
            assert!(p.coefficient.abs() > CORRELATION_THRESHOLD);
        }
        let mut keys: Vec<(String, String)> = pairs
            .iter()
            .map(|p| {
                let mut k = [p.column_a.clone(), p.column_b.clone()];
                k.sort();
                (k[0].clone(), k[1].clone())
            })
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), pairs.len());
    }

    #[test]
    fn test_single_numeric_column_has_no_correlation_analysis() {
        let df = df!("x" => [1.0, 2.0, 3.0], "c" => ["a", "b", "a"]).unwrap();
        let report = analyze_patterns(&Dataset::new(df).unwrap()).unwrap();
        assert!(report.correlations.is_none());
        assert!(report
            .render()
            .contains("No strong correlations detected (fewer than 2 numeric columns)"));
    }

    #[test]
    fn test_skew_direction_follows_tail() {
        let df = df!(
            "right" => [1.0, 1.0, 1.0, 1.0, 100.0],
            "left" => [100.0, 100.0, 100.0, 100.0, 1.0]
        )
        .unwrap();
        let insights = distribution_insights(&Dataset::new(df).unwrap()).unwrap();

        let directions: Vec<(String, SkewDirection)> = insights
            .into_iter()
            .filter_map(|i| match i {
                DistributionInsight::Skewed {
                    column, direction, ..
                } => Some((column, direction)),
                _ => None,
            })
            .collect();
        assert_eq!(
            directions,
            vec![
                ("right".to_string(), SkewDirection::Right),
                ("left".to_string(), SkewDirection::Left)
            ]
        );
    }

    #[test]
    fn test_skew_does_not_depend_on_scale() {
        let tail = [1.0, 1.0, 1.0, 1.0, 100.0];
        let tiny: Vec<f64> = tail.iter().map(|v| v * 1e-10).collect();
        let large = column_skew(&Series::new("large", &tail)).unwrap().unwrap();
        let small = column_skew(&Series::new("small", tiny)).unwrap().unwrap();
        assert!(large > SKEW_THRESHOLD);
        assert!((large - small).abs() < 1e-6);

        let df = df!("micro_amount" => tail.iter().map(|v| v * 1e-10).collect::<Vec<_>>()).unwrap();
        let text = analyze_patterns(&Dataset::new(df).unwrap()).unwrap().render();
        assert!(text.contains("  • micro_amount: Highly skewed right"));
    }

    #[test]
    fn test_constant_and_short_columns_are_not_skewed() {
        assert_eq!(column_skew(&Series::new("c", &[3.0, 3.0, 3.0])).unwrap(), Some(0.0));
        assert_eq!(column_skew(&Series::new("c", &[0.1, 0.1, 0.1])).unwrap(), Some(0.0));
        assert_eq!(column_skew(&Series::new("c", &[1.0, 2.0])).unwrap(), None);
    }

    #[test]
    fn test_correlation_ignores_rows_with_missing_values() {
        let df = df!(
            "a" => [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)],
            "b" => [Some(2.0), Some(4.0), Some(100.0), Some(8.0), Some(10.0)],
            "flat" => [1.0, 1.0, 1.0, 1.0, 1.0]
        )
        .unwrap();
        let pairs = strong_correlations(&Dataset::new(df).unwrap()).unwrap().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].column_a.as_str(), pairs[0].column_b.as_str()), ("a", "b"));
        assert!((pairs[0].coefficient - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_many_categories_report_top_share() {
        let values: Vec<String> = (0..20)
            .map(|i| if i < 9 { "big".to_string() } else { format!("v{}", i) })
            .collect();
        let df = df!("cat" => values).unwrap();
        let insights = distribution_insights(&Dataset::new(df).unwrap()).unwrap();

        match &insights[0] {
            DistributionInsight::DominantCategory {
                categories,
                top_share,
                ..
            } => {
                assert_eq!(*categories, 12);
                assert!((top_share - 45.0).abs() < 1e-9);
            }
            other => panic!("unexpected insight: {:?}", other),
        }
    }

    #[test]
    fn test_render_even_categories() {
        let df = df!("region" => ["n", "s", "e"]).unwrap();
        let text = analyze_patterns(&Dataset::new(df).unwrap()).unwrap().render();
        assert!(text.contains("  • region: Evenly distributed across 3 categories"));
    }
}

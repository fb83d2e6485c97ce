//! Statistical Summarizer
//!
//! describe()-style statistics for numeric columns and top-K value counts for
//! categorical columns. Undefined statistics stay `None` and render as `n/a`.

use crate::dataset::{Dataset, SemanticType};
use crate::error::Result;
use crate::stats::{aggregate, scalar};
use crate::table::TextTable;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of most frequent values reported per categorical column
pub const TOP_K: usize = 3;

/// Placeholder rendered for an undefined statistic
pub const UNDEFINED: &str = "n/a";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl NumericStats {
    /// Rows in describe() order: label + value
    fn rows(&self) -> [(&'static str, Option<f64>); 8] {
        [
            ("count", Some(self.count as f64)),
            ("mean", self.mean),
            ("std", self.std),
            ("min", self.min),
            ("25%", self.q25),
            ("50%", self.median),
            ("75%", self.q75),
            ("max", self.max),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    pub unique_count: usize,
    pub top_values: Vec<ValueCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    /// (column, stats) for numeric columns, in column order
    pub numeric: Vec<(String, NumericStats)>,
    /// (column, stats) for categorical columns, in column order
    pub categorical: Vec<(String, CategoricalStats)>,
}

pub fn summarize(dataset: &Dataset) -> Result<StatisticalSummary> {
    let numeric = dataset
        .columns_of(SemanticType::Numeric)
        .into_iter()
        .map(|s| Ok((s.name().to_string(), numeric_stats(s)?)))
        .collect::<Result<Vec<_>>>()?;

    let categorical = dataset
        .columns_of(SemanticType::Categorical)
        .into_iter()
        .map(|s| Ok((s.name().to_string(), categorical_stats(s, TOP_K)?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(StatisticalSummary { numeric, categorical })
}

/// describe()-style statistics; quartiles interpolate linearly, std uses ddof = 1.
pub fn numeric_stats(series: &Series) -> Result<NumericStats> {
    let name = series.name();
    let quantile = |q: f64| col(name).quantile(lit(q), QuantileInterpolOptions::Linear);
    let out = aggregate(
        series,
        vec![
            col(name).mean().alias("mean"),
            col(name).std(1).alias("std"),
            col(name).min().alias("min"),
            quantile(0.25).alias("q25"),
            quantile(0.5).alias("median"),
            quantile(0.75).alias("q75"),
            col(name).max().alias("max"),
        ],
    )?;

    Ok(NumericStats {
        count: series.len() - series.null_count(),
        mean: scalar(&out, "mean")?,
        std: scalar(&out, "std")?,
        min: scalar(&out, "min")?,
        q25: scalar(&out, "q25")?,
        median: scalar(&out, "median")?,
        q75: scalar(&out, "q75")?,
        max: scalar(&out, "max")?,
    })
}

pub fn categorical_stats(series: &Series, k: usize) -> Result<CategoricalStats> {
    let counts = value_counts(series)?;
    Ok(CategoricalStats {
        unique_count: counts.len(),
        top_values: counts.into_iter().take(k).collect(),
    })
}

/// Frequency of every non-null value, most frequent first.
/// Ties keep the order in which values were first encountered.
pub fn value_counts(series: &Series) -> Result<Vec<ValueCount>> {
    let values = series.cast(&DataType::String)?.with_name("value");
    let counted = DataFrame::new(vec![values])?
        .lazy()
        .filter(col("value").is_not_null())
        .group_by_stable([col("value")])
        .agg([len().alias("count")])
        .collect()?;

    let counts = counted.column("count")?.cast(&DataType::Int64)?;
    let mut order: Vec<ValueCount> = counted
        .column("value")?
        .str()?
        .into_iter()
        .zip(counts.i64()?.into_iter())
        .filter_map(|(value, count)| {
            Some(ValueCount {
                value: value?.to_string(),
                count: count? as usize,
            })
        })
        .collect();

    // stable sort keeps encounter order among equal counts
    order.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(order)
}

/// Format one statistic; undefined values get the explicit placeholder.
pub fn format_stat(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.6}", v),
        _ => UNDEFINED.to_string(),
    }
}

impl StatisticalSummary {
    /// The `=== STATISTICAL SUMMARY ===` context section
    pub fn render(&self) -> String {
        let mut info = String::from("=== STATISTICAL SUMMARY ===\n");

        if !self.numeric.is_empty() {
            info.push_str("Numeric columns summary:\n");
            let headers = self.numeric.iter().map(|(name, _)| name.clone()).collect();
            let mut table = TextTable::new(headers);
            let columns: Vec<_> = self.numeric.iter().map(|(_, stats)| stats.rows()).collect();
            for row in 0..columns[0].len() {
                let cells = columns.iter().map(|c| format_stat(c[row].1)).collect();
                table.push_row(columns[0][row].0, cells);
            }
            info.push_str(&table.render());
            info.push_str("\n\n");
        }

        if !self.categorical.is_empty() {
            info.push_str("Categorical columns summary:\n");
            for (name, stats) in &self.categorical {
                info.push_str(&format!("  • {}: {} unique values\n", name, stats.unique_count));
                let top: Vec<String> = stats
                    .top_values
                    .iter()
                    .map(|vc| format!("'{}': {}", vc.value, vc.count))
                    .collect();
                info.push_str(&format!("    Top values: {{{}}}\n", top.join(", ")));
            }
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_stats_match_describe() {
        let s = Series::new("v", &[Some(1.0), Some(2.0), None, Some(3.0), Some(4.0)]);
        let stats = numeric_stats(&s).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, Some(2.5));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.q25, Some(1.75));
        assert_eq!(stats.median, Some(2.5));
        assert_eq!(stats.q75, Some(3.25));
        assert_eq!(stats.max, Some(4.0));
        assert!((stats.std.unwrap() - 1.2909944487358056).abs() < 1e-12);
    }

    #[test]
    fn test_integer_columns_are_described() {
        let s = Series::new("n", &[10i64, 20, 30]);
        let stats = numeric_stats(&s).unwrap();
        assert_eq!(stats.mean, Some(20.0));
        assert_eq!(stats.max, Some(30.0));
        assert_eq!(stats.std, Some(10.0));
    }

    #[test]
    fn test_empty_numeric_column_is_undefined() {
        let s = Series::new("v", &[None::<f64>, None]);
        let stats = numeric_stats(&s).unwrap();
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_none() && stats.std.is_none() && stats.max.is_none());
        assert_eq!(format_stat(stats.mean), "n/a");

        let single = numeric_stats(&Series::new("v", &[5.0])).unwrap();
        assert_eq!(single.mean, Some(5.0));
        assert_eq!(format_stat(single.std), "n/a");
    }

    #[test]
    fn test_value_counts_ties_keep_encounter_order() {
        let s = Series::new("c", &[Some("b"), Some("a"), None, Some("a"), Some("b"), Some("c")]);
        let counts = value_counts(&s).unwrap();
        let values: Vec<&str> = counts.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(values, vec!["b", "a", "c"]);
        assert_eq!(counts[0].count, 2);
    }

    #[test]
    fn test_render_lists_numeric_and_categorical() {
        let df = df!(
            "amount" => [Some(1.0), None, Some(3.0)],
            "region" => ["n", "s", "n"]
        )
        .unwrap();
        let summary = summarize(&Dataset::new(df).unwrap()).unwrap();
        let text = summary.render();

        assert!(text.starts_with("=== STATISTICAL SUMMARY ===\n"));
        assert!(text.contains("Numeric columns summary:"));
        assert!(text.contains("2.000000"));
        assert!(text.contains("  • region: 2 unique values"));
        assert!(text.contains("Top values: {'n': 2, 's': 1}"));
    }
}

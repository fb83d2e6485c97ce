//! Dataset-level insights for fraud-style transaction data.
//!
//! Looks for three well-known column families by name:
//! - a class column (`Class`, `fraud`, `is_fraud`) with 0 = regular, 1 = fraudulent
//! - the first column whose name contains `time` or `date`
//! - the first column whose name contains `amount` or `value`
//!
//! Every part degrades to a neutral result when its column is missing.

use crate::context::thousands;
use crate::dataset::{numeric_values, render_cells, Dataset, SemanticType};
use crate::error::Result;
use crate::quality::count_duplicate_rows;
use crate::stats::scalar;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const FRAUD_COLUMN_NAMES: &[&str] = &["class", "fraud", "is_fraud"];
pub const TIME_MARKERS: &[&str] = &["time", "date"];
pub const AMOUNT_MARKERS: &[&str] = &["amount", "value"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBreakdown {
    pub total: usize,
    pub regular: usize,
    pub fraudulent: usize,
    pub regular_percentage: f64,
    pub fraud_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub column: String,
    pub total_seconds: f64,
    pub total_hours: f64,
    pub total_days: f64,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountStats {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub total: f64,
    pub std: Option<f64>,
}

impl AmountStats {
    /// Statistics of the non-null values of `column` in `frame`
    fn of(frame: LazyFrame, column: &str) -> Result<Self> {
        let out = frame
            .filter(col(column).is_not_null())
            .select([
                len().alias("count"),
                col(column).min().alias("min"),
                col(column).max().alias("max"),
                col(column).mean().alias("avg"),
                col(column).sum().alias("total"),
                col(column).std(1).alias("std"),
            ])
            .collect()?;

        Ok(Self {
            count: scalar(&out, "count")?.unwrap_or(0.0) as usize,
            min: scalar(&out, "min")?,
            max: scalar(&out, "max")?,
            avg: scalar(&out, "avg")?,
            total: scalar(&out, "total")?.unwrap_or(0.0),
            std: scalar(&out, "std")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AmountAnalysis {
    Overall {
        column: String,
        stats: AmountStats,
    },
    ByClass {
        column: String,
        regular: AmountStats,
        fraud: AmountStats,
        /// Share of the summed amount, in percent
        regular_share: f64,
        fraud_share: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInsights {
    pub records: RecordBreakdown,
    pub time: Option<TimeSpan>,
    pub amounts: Option<AmountAnalysis>,
}

pub fn analyze_dataset(dataset: &Dataset) -> Result<DatasetInsights> {
    let classes = match fraud_column(dataset) {
        Some(series) => Some(numeric_values(series)?),
        None => None,
    };

    Ok(DatasetInsights {
        records: record_breakdown(dataset.height(), classes.as_deref()),
        time: time_span(dataset)?,
        amounts: amount_analysis(dataset)?,
    })
}

/// The class column, matched case-insensitively by name
pub fn fraud_column(dataset: &Dataset) -> Option<&Series> {
    dataset
        .columns()
        .iter()
        .find(|s| FRAUD_COLUMN_NAMES.contains(&s.name().to_lowercase().as_str()))
}

pub(crate) fn first_column_containing<'a>(dataset: &'a Dataset, markers: &[&str]) -> Option<&'a Series> {
    dataset.columns().iter().find(|s| {
        let name = s.name().to_lowercase();
        markers.iter().any(|m| name.contains(m))
    })
}

fn record_breakdown(total: usize, classes: Option<&[Option<f64>]>) -> RecordBreakdown {
    let (regular, fraudulent) = match classes {
        Some(values) => (
            values.iter().filter(|v| **v == Some(0.0)).count(),
            values.iter().filter(|v| **v == Some(1.0)).count(),
        ),
        None => (total, 0),
    };

    let pct = |n: usize| if total > 0 { n as f64 / total as f64 * 100.0 } else { 0.0 };
    RecordBreakdown {
        total,
        regular,
        fraudulent,
        regular_percentage: pct(regular),
        fraud_percentage: pct(fraudulent),
    }
}

/// Span of the first time-like column; `None` when fewer than two values parse.
pub fn time_span(dataset: &Dataset) -> Result<Option<TimeSpan>> {
    let Some(series) = first_column_containing(dataset, TIME_MARKERS) else {
        return Ok(None);
    };

    let Some((per_row, elapsed)) = row_seconds(series)? else {
        return Ok(None);
    };
    let seconds: Vec<f64> = per_row.into_iter().flatten().collect();

    if seconds.len() < 2 {
        return Ok(None);
    }

    let start = seconds.iter().copied().fold(f64::INFINITY, f64::min);
    let end = seconds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let total_seconds = end - start;

    let label = |secs: f64| {
        if elapsed {
            format!("{}s", secs)
        } else {
            DateTime::from_timestamp(secs.floor() as i64, 0)
                .map(|dt| dt.naive_utc().to_string())
                .unwrap_or_else(|| secs.to_string())
        }
    };

    Ok(Some(TimeSpan {
        column: series.name().to_string(),
        total_seconds,
        total_hours: total_seconds / 3600.0,
        total_days: total_seconds / 86_400.0,
        start: label(start),
        end: label(end),
    }))
}

/// Seconds of every row of a time-like column (`None` where a cell is null or
/// does not parse), and whether they are elapsed seconds rather than epoch
/// seconds. `None` for column types that carry no time.
pub(crate) fn row_seconds(series: &Series) -> Result<Option<(Vec<Option<f64>>, bool)>> {
    let converted = match series.dtype() {
        DataType::Date => {
            let days = series.cast(&DataType::Int32)?;
            let values: Vec<Option<f64>> = days
                .i32()?
                .into_iter()
                .map(|d| d.map(|d| d as f64 * 86_400.0))
                .collect();
            (values, false)
        }
        DataType::Datetime(unit, _) => {
            let per_second = match unit {
                TimeUnit::Nanoseconds => 1e9,
                TimeUnit::Microseconds => 1e6,
                TimeUnit::Milliseconds => 1e3,
            };
            let raw = series.cast(&DataType::Int64)?;
            let values: Vec<Option<f64>> = raw
                .i64()?
                .into_iter()
                .map(|v| v.map(|v| v as f64 / per_second))
                .collect();
            (values, false)
        }
        dt if dt.is_numeric() => (numeric_values(series)?, true),
        DataType::String => {
            let values: Vec<Option<f64>> = render_cells(series)?
                .into_iter()
                .map(|cell| cell.and_then(|s| parse_timestamp(&s)))
                .collect();
            (values, false)
        }
        _ => return Ok(None),
    };
    Ok(Some(converted))
}

/// Seconds since the Unix epoch for the supported text formats
pub(crate) fn parse_timestamp(text: &str) -> Option<f64> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| dt.and_utc().timestamp() as f64)
}

fn amount_analysis(dataset: &Dataset) -> Result<Option<AmountAnalysis>> {
    let Some(series) = first_column_containing(dataset, AMOUNT_MARKERS) else {
        return Ok(None);
    };
    let column = series.name().to_string();
    let amount = || {
        dataset
            .frame()
            .clone()
            .lazy()
            .with_column(col(&column).cast(DataType::Float64))
    };

    let analysis = match fraud_column(dataset) {
        Some(class) => {
            let in_class = |value: f64| col(class.name()).cast(DataType::Float64).eq(lit(value));
            let regular = AmountStats::of(amount().filter(in_class(0.0)), &column)?;
            let fraud = AmountStats::of(amount().filter(in_class(1.0)), &column)?;

            let total = regular.total + fraud.total;
            let (regular_share, fraud_share) = if total > 0.0 {
                (regular.total / total * 100.0, fraud.total / total * 100.0)
            } else {
                (0.0, 0.0)
            };
            AmountAnalysis::ByClass {
                column,
                regular,
                fraud,
                regular_share,
                fraud_share,
            }
        }
        None => {
            let stats = AmountStats::of(amount(), &column)?;
            AmountAnalysis::Overall { column, stats }
        }
    };
    Ok(Some(analysis))
}

fn money(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

impl DatasetInsights {
    pub fn render(&self) -> String {
        let r = &self.records;
        let mut out = String::from("**Dataset insights:**\n\n");
        out.push_str(&format!("• Total records: {}\n", thousands(r.total)));
        if r.fraudulent > 0 {
            out.push_str(&format!(
                "• Regular: {} ({:.2}%), fraudulent: {} ({:.2}%)\n",
                thousands(r.regular),
                r.regular_percentage,
                thousands(r.fraudulent),
                r.fraud_percentage
            ));
        }

        if let Some(t) = &self.time {
            out.push_str(&format!(
                "• Time span ({}): {:.2} days / {:.2} hours, from {} to {}\n",
                t.column, t.total_days, t.total_hours, t.start, t.end
            ));
        }

        match &self.amounts {
            Some(AmountAnalysis::Overall { column, stats }) => out.push_str(&format!(
                "• {}: min {}, max {}, avg {}, total {:.2}, std {}\n",
                column,
                money(stats.min),
                money(stats.max),
                money(stats.avg),
                stats.total,
                money(stats.std)
            )),
            Some(AmountAnalysis::ByClass {
                column,
                regular,
                fraud,
                regular_share,
                fraud_share,
            }) => {
                out.push_str(&format!(
                    "• {} (regular): min {}, max {}, avg {}, total {:.2} ({:.2}% of total)\n",
                    column,
                    money(regular.min),
                    money(regular.max),
                    money(regular.avg),
                    regular.total,
                    regular_share
                ));
                out.push_str(&format!(
                    "• {} (fraudulent): min {}, max {}, avg {}, total {:.2} ({:.2}% of total)\n",
                    column,
                    money(fraud.min),
                    money(fraud.max),
                    money(fraud.avg),
                    fraud.total,
                    fraud_share
                ));
            }
            None => {}
        }

        out
    }
}

/// Short technical assessment of the dataset as a whole
pub fn technical_opinion(dataset: &Dataset) -> Result<String> {
    let rows = dataset.height();
    let missing: usize = dataset.null_counts().iter().map(|(_, n)| n).sum();
    let duplicates = count_duplicate_rows(dataset)?;

    let mut opinion = String::from("**Technical Assessment:**\n\n");
    opinion.push_str(&format!(
        "• Dataset dimensions: {} records × {} features\n",
        thousands(rows),
        dataset.width()
    ));

    if let Some(series) = fraud_column(dataset) {
        let fraud_count = numeric_values(series)?
            .into_iter()
            .filter(|v| *v == Some(1.0))
            .count();
        let fraud_rate = fraud_count as f64 / rows as f64 * 100.0;
        opinion.push_str(&format!(
            "• Fraud detection dataset with {:.2}% fraud rate\n",
            fraud_rate
        ));
    }

    opinion.push_str(&format!(
        "• Data quality: {} missing values, {} duplicates\n",
        missing, duplicates
    ));
    opinion.push_str(&format!(
        "• Feature composition: {} numeric, {} categorical\n",
        dataset.columns_of(SemanticType::Numeric).len(),
        dataset.columns_of(SemanticType::Categorical).len()
    ));

    if missing > 0 {
        opinion.push_str("• Recommendation: Address missing values before analysis\n");
    }
    if duplicates > 0 {
        opinion.push_str(&format!(
            "• Recommendation: Consider removing {} duplicate records\n",
            duplicates
        ));
    }

    let verdict = if missing == 0 && duplicates == 0 {
        "Well-structured"
    } else {
        "Requires preprocessing"
    };
    opinion.push_str(&format!("• Overall: {} dataset suitable for analysis", verdict));

    Ok(opinion)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fraud_data() -> Dataset {
        Dataset::new(
            df!(
                "Time" => [0.0, 3600.0, 7200.0, 86400.0],
                "Amount" => [10.0, 20.0, 30.0, 100.0],
                "Class" => [0i64, 0, 0, 1]
            )
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_records_split_by_class() {
        let insights = analyze_dataset(&fraud_data()).unwrap();
        assert_eq!(insights.records.regular, 3);
        assert_eq!(insights.records.fraudulent, 1);
        assert_eq!(insights.records.fraud_percentage, 25.0);
    }

    #[test]
    fn test_numeric_time_is_elapsed_seconds() {
        let span = analyze_dataset(&fraud_data()).unwrap().time.unwrap();
        assert_eq!(span.column, "Time");
        assert_eq!(span.total_days, 1.0);
        assert_eq!(span.total_hours, 24.0);
    }

    #[test]
    fn test_text_dates_are_parsed() {
        let ds = Dataset::new(
            df!("order_date" => ["2024-01-01", "2024-01-03", "bad"], "x" => [1, 2, 3]).unwrap(),
        )
        .unwrap();
        let span = time_span(&ds).unwrap().unwrap();
        assert_eq!(span.total_days, 2.0);
        assert_eq!(span.start, "2024-01-01 00:00:00");
    }

    #[test]
    fn test_amounts_by_class() {
        match analyze_dataset(&fraud_data()).unwrap().amounts.unwrap() {
            AmountAnalysis::ByClass {
                regular,
                fraud,
                fraud_share,
                ..
            } => {
                assert_eq!(regular.total, 60.0);
                assert_eq!(regular.avg, Some(20.0));
                assert_eq!(fraud.max, Some(100.0));
                assert!((fraud_share - 62.5).abs() < 1e-9);
            }
            other => panic!("unexpected analysis: {:?}", other),
        }
    }

    #[test]
    fn test_general_dataset_has_no_fraud() {
        let ds = Dataset::new(df!("price_value" => [1.0, 3.0], "name" => ["a", "b"]).unwrap())
            .unwrap();
        let insights = analyze_dataset(&ds).unwrap();
        assert_eq!(insights.records.regular, 2);
        assert_eq!(insights.records.fraudulent, 0);
        assert!(insights.time.is_none());
        assert!(matches!(
            insights.amounts,
            Some(AmountAnalysis::Overall { ref stats, .. }) if stats.total == 4.0
        ));
    }

    #[test]
    fn test_technical_opinion() {
        let opinion = technical_opinion(&fraud_data()).unwrap();
        assert!(opinion.contains("• Dataset dimensions: 4 records × 3 features"));
        assert!(opinion.contains("25.00% fraud rate"));
        assert!(opinion.ends_with("• Overall: Well-structured dataset suitable for analysis"));
    }
}

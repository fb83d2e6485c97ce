//! Chart data
//!
//! Aggregates behind the three supported charts. Nothing is drawn here: each
//! chart comes back as labelled counts, histogram bins or daily series that a
//! front end can plot and that serialize to JSON.

use crate::dataset::{Dataset, SemanticType};
use crate::error::{AnalystError, Result};
use crate::insights::{first_column_containing, fraud_column, row_seconds, AMOUNT_MARKERS, TIME_MARKERS};
use crate::stats::scalar;
use crate::summary::{value_counts, ValueCount};
use chrono::DateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Bins of the first-column histogram drawn when there is no class column
pub const DISTRIBUTION_BINS: usize = 30;
/// Bins of every amount histogram
pub const AMOUNT_BINS: usize = 50;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    FraudDistribution,
    AmountDistribution,
    TimeSeries,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::FraudDistribution,
        ChartKind::AmountDistribution,
        ChartKind::TimeSeries,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ChartKind::FraudDistribution => "fraud_distribution",
            ChartKind::AmountDistribution => "amount_distribution",
            ChartKind::TimeSeries => "time_series",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ChartKind::FraudDistribution => "Fraud vs Regular Distribution",
            ChartKind::AmountDistribution => "Amount Distribution",
            ChartKind::TimeSeries => "Transactions Over Time",
        }
    }
}

impl FromStr for ChartKind {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim().to_lowercase();
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.id() == id)
            .ok_or_else(|| AnalystError::InvalidInput(format!("Unsupported chart type: {}", s)))
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Every chart type with its description
pub fn supported_chart_types() -> Vec<(ChartKind, &'static str)> {
    ChartKind::ALL.iter().map(|k| (*k, k.description())).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSeries {
    pub label: String,
    pub bins: Vec<Bin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub day: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub label: String,
    pub points: Vec<DailyCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chart", rename_all = "snake_case")]
pub enum ChartData {
    Shares {
        title: String,
        slices: Vec<ValueCount>,
    },
    Histogram {
        title: String,
        x_label: String,
        series: Vec<HistogramSeries>,
    },
    Line {
        title: String,
        series: Vec<LineSeries>,
    },
}

/// Whether `dataset` has the columns `kind` needs
pub fn check_requirements(dataset: &Dataset, kind: ChartKind) -> Result<()> {
    match kind {
        ChartKind::FraudDistribution => Ok(()),
        ChartKind::AmountDistribution => amount_column(dataset).map(|_| ()).ok_or_else(|| {
            AnalystError::InvalidInput("No numeric columns found for amount distribution".to_string())
        }),
        ChartKind::TimeSeries => first_column_containing(dataset, TIME_MARKERS)
            .map(|_| ())
            .ok_or_else(|| {
                AnalystError::InvalidInput("No time columns found for time series chart".to_string())
            }),
    }
}

pub fn chart_data(dataset: &Dataset, kind: ChartKind) -> Result<ChartData> {
    check_requirements(dataset, kind)?;
    match kind {
        ChartKind::FraudDistribution => fraud_distribution(dataset),
        ChartKind::AmountDistribution => amount_distribution(dataset),
        ChartKind::TimeSeries => time_series(dataset),
    }
}

/// First numeric column named like an amount, else the first numeric column
fn amount_column(dataset: &Dataset) -> Option<&Series> {
    let numeric = dataset.columns_of(SemanticType::Numeric);
    numeric
        .iter()
        .find(|s| {
            let name = s.name().to_lowercase();
            AMOUNT_MARKERS.iter().any(|m| name.contains(m))
        })
        .or_else(|| numeric.first())
        .copied()
}

fn class_label(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(v) if v == 0.0 => "Regular".to_string(),
        Ok(v) if v == 1.0 => "Fraudulent".to_string(),
        _ => value.to_string(),
    }
}

fn fraud_distribution(dataset: &Dataset) -> Result<ChartData> {
    if let Some(class) = fraud_column(dataset) {
        let slices = value_counts(class)?
            .into_iter()
            .map(|vc| ValueCount {
                value: class_label(&vc.value),
                count: vc.count,
            })
            .collect();
        return Ok(ChartData::Shares {
            title: "Fraud vs Regular Transactions Distribution".to_string(),
            slices,
        });
    }

    let first = dataset
        .columns()
        .first()
        .ok_or_else(|| AnalystError::InvalidInput("dataset has no columns".to_string()))?;
    if first.dtype().is_numeric() {
        Ok(ChartData::Histogram {
            title: "Data Distribution".to_string(),
            x_label: "Values".to_string(),
            series: vec![histogram(first, DISTRIBUTION_BINS, first.name())?],
        })
    } else {
        Ok(ChartData::Shares {
            title: format!("{} Distribution", first.name()),
            slices: value_counts(first)?,
        })
    }
}

fn amount_distribution(dataset: &Dataset) -> Result<ChartData> {
    let Some(amount) = amount_column(dataset) else {
        return Err(AnalystError::InvalidInput(
            "No numeric columns found for amount distribution".to_string(),
        ));
    };
    let column = amount.name();

    let Some(class) = fraud_column(dataset) else {
        return Ok(ChartData::Histogram {
            title: format!("{} Distribution", column),
            x_label: column.to_string(),
            series: vec![histogram(amount, AMOUNT_BINS, column)?],
        });
    };

    let amounts_of = |value: f64| -> Result<Series> {
        let picked = dataset
            .frame()
            .clone()
            .lazy()
            .filter(col(class.name()).cast(DataType::Float64).eq(lit(value)))
            .select([col(column)])
            .collect()?;
        Ok(picked.column(column)?.clone())
    };

    let mut series = vec![histogram(&amounts_of(0.0)?, AMOUNT_BINS, "Regular")?];
    let fraud = amounts_of(1.0)?;
    if !fraud.is_empty() {
        series.push(histogram(&fraud, AMOUNT_BINS, "Fraudulent")?);
    }

    Ok(ChartData::Histogram {
        title: "Amount Distribution by Transaction Type".to_string(),
        x_label: "Amount".to_string(),
        series,
    })
}

/// Equal-width bins between the smallest and largest value. The last bin is
/// closed on both ends; a single distinct value gets a range one unit wide.
pub fn histogram(series: &Series, bins: usize, label: &str) -> Result<HistogramSeries> {
    let values = series.cast(&DataType::Float64)?.with_name("value");
    let frame = DataFrame::new(vec![values])?
        .lazy()
        .filter(col("value").is_not_null());

    let bounds = frame
        .clone()
        .select([col("value").min().alias("min"), col("value").max().alias("max")])
        .collect()?;
    let (Some(min), Some(max)) = (scalar(&bounds, "min")?, scalar(&bounds, "max")?) else {
        return Ok(HistogramSeries {
            label: label.to_string(),
            bins: Vec::new(),
        });
    };

    let (lower, upper) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
    let width = (upper - lower) / bins as f64;
    let last = bins as i64 - 1;

    let index = ((col("value") - lit(lower)) / lit(width)).cast(DataType::Int64);
    let counted = frame
        .select([when(index.clone().gt(lit(last)))
            .then(lit(last))
            .otherwise(index)
            .alias("bin")])
        .group_by([col("bin")])
        .agg([len().alias("count")])
        .collect()?;

    let mut counts = vec![0usize; bins];
    let ids = counted.column("bin")?.cast(&DataType::Int64)?;
    let totals = counted.column("count")?.cast(&DataType::Int64)?;
    for (id, total) in ids.i64()?.into_iter().zip(totals.i64()?.into_iter()) {
        if let (Some(id), Some(total)) = (id, total) {
            if let Some(slot) = counts.get_mut(id as usize) {
                *slot += total as usize;
            }
        }
    }

    Ok(HistogramSeries {
        label: label.to_string(),
        bins: counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| Bin {
                lower: lower + i as f64 * width,
                upper: lower + (i + 1) as f64 * width,
                count,
            })
            .collect(),
    })
}

/// Rows per day, split into regular and fraudulent lines when a class column
/// exists. Days without rows of a class count zero for that class.
fn time_series(dataset: &Dataset) -> Result<ChartData> {
    let invalid = || AnalystError::InvalidInput("No valid time data found".to_string());
    let time = first_column_containing(dataset, TIME_MARKERS).ok_or_else(invalid)?;
    let (seconds, elapsed) = row_seconds(time)?.ok_or_else(invalid)?;

    let days: Vec<Option<i64>> = seconds
        .into_iter()
        .map(|s| s.map(|s| (s / SECONDS_PER_DAY).floor() as i64))
        .collect();
    if days.iter().all(Option::is_none) {
        return Err(invalid());
    }

    let class = fraud_column(dataset);
    let mut columns = vec![Series::new("day", days)];
    let mut keys = vec![col("day")];
    if let Some(class) = class {
        columns.push(class.cast(&DataType::Int64)?.with_name("class"));
        keys.push(col("class"));
    }

    let grouped = DataFrame::new(columns)?
        .lazy()
        .filter(col("day").is_not_null())
        .group_by(keys)
        .agg([len().alias("count")])
        .collect()?;

    let day_ids = grouped.column("day")?.i64()?;
    let totals = grouped.column("count")?.cast(&DataType::Int64)?;
    let classes = match class {
        Some(_) => Some(grouped.column("class")?.i64()?.into_iter().collect::<Vec<_>>()),
        None => None,
    };

    // day -> (regular or all rows, fraudulent)
    let mut per_day: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
    let (mut has_regular, mut has_fraud) = (false, false);
    for (row, (day, total)) in day_ids.into_iter().zip(totals.i64()?.into_iter()).enumerate() {
        let (Some(day), Some(total)) = (day, total) else {
            continue;
        };
        let entry = per_day.entry(day).or_default();
        match classes.as_ref().map(|c| c[row]) {
            None => entry.0 += total as usize,
            Some(Some(0)) => {
                entry.0 += total as usize;
                has_regular = true;
            }
            Some(Some(1)) => {
                entry.1 += total as usize;
                has_fraud = true;
            }
            Some(_) => {}
        }
    }

    let first_day = per_day.keys().next().copied().unwrap_or(0);
    let day_label = |day: i64| {
        if elapsed {
            format!("day {}", day - first_day + 1)
        } else {
            DateTime::from_timestamp(day * SECONDS_PER_DAY as i64, 0)
                .map(|dt| dt.date_naive().to_string())
                .unwrap_or_else(|| day.to_string())
        }
    };
    let line = |label: &str, pick: fn(&(usize, usize)) -> usize| LineSeries {
        label: label.to_string(),
        points: per_day
            .iter()
            .map(|(day, counts)| DailyCount {
                day: day_label(*day),
                count: pick(counts),
            })
            .collect(),
    };

    if class.is_none() {
        return Ok(ChartData::Line {
            title: "Data Points Over Time".to_string(),
            series: vec![line("Count", |c| c.0)],
        });
    }

    let mut series = Vec::new();
    if has_regular {
        series.push(line("Regular", |c| c.0));
    }
    if has_fraud {
        series.push(line("Fraudulent", |c| c.1));
    }
    Ok(ChartData::Line {
        title: "Transactions Over Time".to_string(),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transactions() -> Dataset {
        Dataset::new(
            df!(
                "Time" => [0.0, 3600.0, 90_000.0, 100_000.0, 180_000.0],
                "Amount" => [10.0, 20.0, 30.0, 40.0, 500.0],
                "Class" => [0i64, 0, 1, 0, 1]
            )
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_chart_kinds_parse_by_id() {
        assert_eq!("time_series".parse::<ChartKind>().unwrap(), ChartKind::TimeSeries);
        assert!(matches!(
            "pie".parse::<ChartKind>(),
            Err(AnalystError::InvalidInput(msg)) if msg == "Unsupported chart type: pie"
        ));
        let types = supported_chart_types();
        assert_eq!(types.len(), 3);
        assert_eq!(types[0], (ChartKind::FraudDistribution, "Fraud vs Regular Distribution"));
    }

    #[test]
    fn test_class_shares() {
        match chart_data(&transactions(), ChartKind::FraudDistribution).unwrap() {
            ChartData::Shares { slices, .. } => {
                assert_eq!(slices[0], ValueCount { value: "Regular".to_string(), count: 3 });
                assert_eq!(slices[1], ValueCount { value: "Fraudulent".to_string(), count: 2 });
            }
            other => panic!("unexpected chart: {:?}", other),
        }
    }

    #[test]
    fn test_first_column_histogram_without_class() {
        let ds = Dataset::new(df!("reading" => (0..60).map(|i| i as f64).collect::<Vec<_>>()).unwrap())
            .unwrap();
        match chart_data(&ds, ChartKind::FraudDistribution).unwrap() {
            ChartData::Histogram { series, .. } => {
                let bins = &series[0].bins;
                assert_eq!(bins.len(), DISTRIBUTION_BINS);
                assert!(bins.iter().all(|b| b.count == 2));
                assert_eq!(bins[0].lower, 0.0);
                assert!((bins[DISTRIBUTION_BINS - 1].upper - 59.0).abs() < 1e-9);
            }
            other => panic!("unexpected chart: {:?}", other),
        }
    }

    #[test]
    fn test_histogram_keeps_every_value() {
        let s = Series::new("v", &[Some(1.0), Some(1.0), None, Some(2.5), Some(4.0)]);
        let h = histogram(&s, 3, "v").unwrap();
        let counts: Vec<usize> = h.bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1, 1]);

        let constant = histogram(&Series::new("c", &[7.0, 7.0]), 4, "c").unwrap();
        assert_eq!(constant.bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert_eq!(constant.bins[0].lower, 6.5);
    }

    #[test]
    fn test_amounts_split_by_class() {
        match chart_data(&transactions(), ChartKind::AmountDistribution).unwrap() {
            ChartData::Histogram { title, series, .. } => {
                assert_eq!(title, "Amount Distribution by Transaction Type");
                let totals: Vec<(String, usize)> = series
                    .iter()
                    .map(|s| (s.label.clone(), s.bins.iter().map(|b| b.count).sum()))
                    .collect();
                assert_eq!(
                    totals,
                    vec![("Regular".to_string(), 3), ("Fraudulent".to_string(), 2)]
                );
                assert_eq!(series[0].bins.len(), AMOUNT_BINS);
            }
            other => panic!("unexpected chart: {:?}", other),
        }
    }

    #[test]
    fn test_daily_counts_per_class() {
        match chart_data(&transactions(), ChartKind::TimeSeries).unwrap() {
            ChartData::Line { series, .. } => {
                let regular: Vec<(&str, usize)> = series[0]
                    .points
                    .iter()
                    .map(|p| (p.day.as_str(), p.count))
                    .collect();
                assert_eq!(series[0].label, "Regular");
                assert_eq!(regular, vec![("day 1", 2), ("day 2", 1), ("day 3", 0)]);
                let fraud: Vec<usize> = series[1].points.iter().map(|p| p.count).collect();
                assert_eq!(fraud, vec![0, 1, 1]);
            }
            other => panic!("unexpected chart: {:?}", other),
        }
    }

    #[test]
    fn test_text_dates_group_by_calendar_day() {
        let ds = Dataset::new(
            df!(
                "order_date" => ["2024-01-01 08:00:00", "2024-01-01 17:30:00", "2024-01-03", "n/a"],
                "qty" => [1i64, 2, 3, 4]
            )
            .unwrap(),
        )
        .unwrap();
        match chart_data(&ds, ChartKind::TimeSeries).unwrap() {
            ChartData::Line { title, series } => {
                assert_eq!(title, "Data Points Over Time");
                let points: Vec<(String, usize)> =
                    series[0].points.iter().map(|p| (p.day.clone(), p.count)).collect();
                assert_eq!(
                    points,
                    vec![("2024-01-01".to_string(), 2), ("2024-01-03".to_string(), 1)]
                );
            }
            other => panic!("unexpected chart: {:?}", other),
        }
    }

    #[test]
    fn test_requirements() {
        let text_only = Dataset::new(df!("name" => ["a", "b"]).unwrap()).unwrap();
        assert!(check_requirements(&text_only, ChartKind::FraudDistribution).is_ok());
        assert!(matches!(
            check_requirements(&text_only, ChartKind::AmountDistribution),
            Err(AnalystError::InvalidInput(msg)) if msg.contains("No numeric columns")
        ));
        assert!(matches!(
            chart_data(&text_only, ChartKind::TimeSeries),
            Err(AnalystError::InvalidInput(msg)) if msg.contains("No time columns")
        ));

        let bad_times = Dataset::new(df!("time_label" => ["soon", "later"]).unwrap()).unwrap();
        assert!(matches!(
            chart_data(&bad_times, ChartKind::TimeSeries),
            Err(AnalystError::InvalidInput(msg)) if msg == "No valid time data found"
        ));
    }
}

//! Column statistics evaluated as polars expressions.
//!
//! Each aggregate runs as a one-row `select` over a lazy frame; the helpers
//! here read the results back and cover the numeric guards polars leaves to
//! the caller.

use crate::error::Result;
use polars::prelude::*;

/// Relative resolution of f64 used to tell real spread from rounding noise
pub const SPREAD_RESOLUTION: f64 = 1e-15;

/// Evaluate aggregate expressions over a single column.
pub fn aggregate(series: &Series, exprs: Vec<Expr>) -> Result<DataFrame> {
    Ok(DataFrame::new(vec![series.clone()])?
        .lazy()
        .select(exprs)
        .collect()?)
}

/// First value of an aggregate column as f64. Nulls, NaN and infinities read as `None`.
pub fn scalar(frame: &DataFrame, name: &str) -> Result<Option<f64>> {
    let values = frame.column(name)?.cast(&DataType::Float64)?;
    Ok(values.f64()?.get(0).filter(|v| v.is_finite()))
}

/// Values whose spread is below the precision of their mean are constant.
/// Comparing standard deviation with the mean keeps the check scale-free.
pub fn spread_is_degenerate(std: f64, mean: f64) -> bool {
    std <= SPREAD_RESOLUTION * mean.abs()
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_reads_aggregates() {
        let s = Series::new("v", &[Some(1i64), None, Some(3)]);
        let out = aggregate(
            &s,
            vec![
                col("v").mean().alias("mean"),
                col("v").std(1).alias("std"),
                col("v").filter(col("v").gt(lit(10))).mean().alias("empty"),
            ],
        )
        .unwrap();
        assert_eq!(scalar(&out, "mean").unwrap(), Some(2.0));
        assert!((scalar(&out, "std").unwrap().unwrap() - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(scalar(&out, "empty").unwrap(), None);
    }

    #[test]
    fn test_degenerate_spread_is_relative_to_scale() {
        assert!(spread_is_degenerate(0.0, 0.0));
        assert!(spread_is_degenerate(1.4e-17, 0.1));
        // a right-tailed column scaled down stays a real spread
        assert!(!spread_is_degenerate(4.4e-9, 2.08e-9));
        assert!(!spread_is_degenerate(1e-12, 0.0));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(33.33333, 2), 33.33);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}

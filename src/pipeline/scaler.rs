//! Per-tier standardization with zero-variance column elimination

use faer::Mat;
use polars::prelude::*;
use serde::Serialize;

use super::domain::{MissingPolicy, ScalingSpec};
use super::error::{DegenerateInputError, Result, SchemaError};

/// Relative tolerance under which a standard deviation counts as zero.
const ZERO_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Standardized feature matrix aligned row-for-row with its tier table.
#[derive(Debug, Clone)]
pub struct ScaledMatrix {
    /// Retained column names, in matrix column order.
    pub columns: Vec<String>,
    pub data: Mat<f64>,
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
    /// Columns dropped because they were constant over the tier.
    pub zero_variance: Vec<String>,
}

impl ScaledMatrix {
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Copy of one row as a plain vector.
    pub fn row(&self, i: usize) -> Vec<f64> {
        (0..self.ncols()).map(|j| self.data[(i, j)]).collect()
    }

    /// Copy of one column as a plain vector.
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.nrows()).map(|i| self.data[(i, j)]).collect()
    }
}

/// Difference between the historically declared zero-variance columns of a
/// tier and the ones detected on this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZeroVarianceDrift {
    /// Declared constant but varying in this data.
    pub expected_only: Vec<String>,
    /// Constant in this data but not declared.
    pub detected_only: Vec<String>,
}

/// Compare declared and detected zero-variance sets; `None` when they agree.
pub fn check_drift(expected: &[String], detected: &[String]) -> Option<ZeroVarianceDrift> {
    let expected_only: Vec<String> = expected
        .iter()
        .filter(|c| !detected.contains(c))
        .cloned()
        .collect();
    let detected_only: Vec<String> = detected
        .iter()
        .filter(|c| !expected.contains(c))
        .cloned()
        .collect();

    if expected_only.is_empty() && detected_only.is_empty() {
        None
    } else {
        Some(ZeroVarianceDrift {
            expected_only,
            detected_only,
        })
    }
}

/// Sample mean and sample standard deviation (n - 1 denominator).
///
/// Fewer than two values give a standard deviation of zero.
pub fn sample_stats(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let sum_sq: f64 = values.iter().map(|x| (x - mean) * (x - mean)).sum();
    (mean, (sum_sq / (n - 1) as f64).sqrt())
}

/// Whether a column with these statistics is constant for scaling purposes.
pub fn is_zero_variance(mean: f64, std_dev: f64) -> bool {
    !std_dev.is_finite() || std_dev <= ZERO_VARIANCE_TOLERANCE * (1.0 + mean.abs())
}

/// Pull a column as dense `f64`, resolving missing values per policy.
fn dense_values(df: &DataFrame, name: &str, policy: MissingPolicy) -> Result<Vec<f64>> {
    let column = df.column(name).map_err(|_| SchemaError::MissingColumn {
        column: name.to_string(),
        location: "tier table".to_string(),
    })?;
    let float_col = column.cast(&DataType::Float64)?;
    let values = float_col.f64()?;

    let missing = values.null_count();
    if missing > 0 && policy == MissingPolicy::Require {
        return Err(DegenerateInputError::UnimputedMissing {
            column: name.to_string(),
            count: missing,
        }
        .into());
    }

    Ok(values.iter().map(|v| v.unwrap_or(0.0)).collect())
}

/// Standardize `columns` of a tier table to zero mean and unit sample
/// variance.
///
/// Constant columns are dropped instead of divided by zero. An empty tier or
/// a tier where every column is constant is degenerate.
pub fn scale(df: &DataFrame, columns: &[String], spec: &ScalingSpec) -> Result<ScaledMatrix> {
    let n_rows = df.height();
    if n_rows == 0 {
        return Err(DegenerateInputError::EmptyTier.into());
    }

    let mut retained: Vec<(String, Vec<f64>, f64, f64)> = Vec::with_capacity(columns.len());
    let mut zero_variance = Vec::new();

    for name in columns {
        let values = dense_values(df, name, spec.policy_for(name))?;
        let (mean, std_dev) = sample_stats(&values);
        if is_zero_variance(mean, std_dev) {
            zero_variance.push(name.clone());
        } else {
            retained.push((name.clone(), values, mean, std_dev));
        }
    }

    if retained.is_empty() {
        return Err(DegenerateInputError::NoUsableColumns.into());
    }

    let mut data = Mat::<f64>::zeros(n_rows, retained.len());
    for (j, (_, values, mean, std_dev)) in retained.iter().enumerate() {
        for (i, &x) in values.iter().enumerate() {
            data[(i, j)] = (x - mean) / std_dev;
        }
    }

    let mut names = Vec::with_capacity(retained.len());
    let mut means = Vec::with_capacity(retained.len());
    let mut std_devs = Vec::with_capacity(retained.len());
    for (name, _, mean, std_dev) in retained {
        names.push(name);
        means.push(mean);
        std_devs.push(std_dev);
    }

    Ok(ScaledMatrix {
        columns: names,
        data,
        means,
        std_devs,
        zero_variance,
    })
}

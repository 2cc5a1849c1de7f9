//! Cluster labelling and per-cluster mean profiles

use std::collections::BTreeMap;

use polars::prelude::*;

use super::domain::CLUSTER_COLUMN;
use super::error::{Result, SchemaError};

/// Append the cluster labels to a tier table as a `Clusters` column.
///
/// `labels` must be aligned row-for-row with `df`.
pub fn with_labels(df: &DataFrame, labels: &[usize]) -> Result<DataFrame> {
    if labels.len() != df.height() {
        return Err(PolarsError::ShapeMismatch(
            format!(
                "{} label(s) for a table of {} row(s)",
                labels.len(),
                df.height()
            )
            .into(),
        )
        .into());
    }
    let labels: Vec<u32> = labels.iter().map(|&l| l as u32).collect();
    let mut labeled = df.clone();
    labeled.with_column(Column::new(CLUSTER_COLUMN.into(), labels))?;
    Ok(labeled)
}

/// Running sum and count of non-missing values per cluster label.
#[derive(Default, Clone, Copy)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Mean of every retained numeric column per cluster label.
///
/// The label column and every column in `exclude` are skipped, as are
/// non-numeric columns. Missing values are left out of each mean; a cluster
/// with no observed values for a column gets a missing mean. The output has
/// one row per observed label in ascending order, with `Clusters` first and
/// the remaining columns in table order.
pub fn aggregate(labeled: &DataFrame, exclude: &[String]) -> Result<DataFrame> {
    let labels = labeled
        .column(CLUSTER_COLUMN)
        .map_err(|_| SchemaError::MissingColumn {
            column: CLUSTER_COLUMN.to_string(),
            location: "labeled tier table".to_string(),
        })?
        .cast(&DataType::UInt32)?;
    let labels: Vec<Option<u32>> = labels.u32()?.iter().collect();

    let mut groups: BTreeMap<u32, usize> = BTreeMap::new();
    for label in labels.iter().flatten() {
        let next = groups.len();
        groups.entry(*label).or_insert(next);
    }
    // Slot order follows first appearance; output order follows the label
    let ordered: Vec<(u32, usize)> = groups.iter().map(|(&l, &slot)| (l, slot)).collect();

    let mut columns = Vec::with_capacity(labeled.width());
    columns.push(Column::new(
        CLUSTER_COLUMN.into(),
        ordered.iter().map(|(l, _)| *l).collect::<Vec<u32>>(),
    ));

    for column in labeled.get_columns() {
        let name = column.name().as_str();
        if name == CLUSTER_COLUMN
            || exclude.iter().any(|e| e == name)
            || !column.dtype().is_primitive_numeric()
        {
            continue;
        }

        let values = column.cast(&DataType::Float64)?;
        let mut acc = vec![MeanAccumulator::default(); groups.len()];
        for (value, label) in values.f64()?.iter().zip(labels.iter()) {
            if let (Some(v), Some(l)) = (value, label) {
                if let Some(&slot) = groups.get(l) {
                    acc[slot].sum += v;
                    acc[slot].count += 1;
                }
            }
        }

        let means: Vec<Option<f64>> = ordered.iter().map(|(_, slot)| acc[*slot].mean()).collect();
        columns.push(Column::new(name.into(), means));
    }

    Ok(DataFrame::new(columns)?)
}

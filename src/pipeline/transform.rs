//! Indicator transforms: distance inversion and constant imputation

use log::{info, warn};
use polars::prelude::*;

use super::error::{CoercionReason, Result, SchemaError, ValueCoercionWarning};
use super::schema::{ResolvedImpute, ResolvedSchema};
use super::tiers::Tier;

/// Working table after the indicator transforms, with any coercions that
/// happened along the way.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub table: DataFrame,
    pub warnings: Vec<ValueCoercionWarning>,
}

/// Invert a single distance value to accessibility: `ceiling - v`.
///
/// Returns `None` for missing, non-finite, or out-of-range (`v` outside
/// `[0, ceiling]`) input.
#[inline]
pub fn invert_distance(value: Option<f64>, ceiling: f64) -> Option<f64> {
    let v = value?;
    if v.is_finite() && (0.0..=ceiling).contains(&v) {
        Some(ceiling - v)
    } else {
        None
    }
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Column> {
    let column = df.column(name).map_err(|_| SchemaError::MissingColumn {
        column: name.to_string(),
        location: "working table".to_string(),
    })?;
    Ok(column.cast(&DataType::Float64)?)
}

/// Null mask of a column before any cast, chunk-safe.
fn source_nulls(df: &DataFrame, name: &str) -> Result<Vec<bool>> {
    let column = df.column(name).map_err(|_| SchemaError::MissingColumn {
        column: name.to_string(),
        location: "working table".to_string(),
    })?;
    let mask = column.as_materialized_series().is_null();
    Ok(mask.into_iter().map(|v| v.unwrap_or(true)).collect())
}

fn not_numeric_warning(column: &str, count: usize) -> Option<ValueCoercionWarning> {
    (count > 0).then(|| ValueCoercionWarning {
        column: column.to_string(),
        count,
        reason: CoercionReason::NotNumeric,
    })
}

/// Cast each listed column to Float64 in place.
///
/// Values present in the source that do not parse as numbers become missing
/// and are reported, so scaling and profiling see the same numeric column.
pub fn coerce_numeric(
    mut df: DataFrame,
    columns: &[String],
) -> Result<(DataFrame, Vec<ValueCoercionWarning>)> {
    let mut warnings = Vec::new();

    for name in columns {
        if df
            .column(name)
            .map(|c| c.dtype() == &DataType::Float64)
            .unwrap_or(false)
        {
            continue;
        }
        let original_nulls = source_nulls(&df, name)?;
        let float_col = numeric_column(&df, name)?;
        let failed = float_col
            .f64()?
            .iter()
            .zip(original_nulls.iter())
            .filter(|(v, was_null)| v.is_none() && !**was_null)
            .count();

        if let Some(warning) = not_numeric_warning(name, failed) {
            warn!("{}", warning);
            warnings.push(warning);
        }
        df.with_column(float_col)?;
    }

    Ok((df, warnings))
}

/// Replace every listed column `v` with `ceiling - v`.
///
/// Values that are not numeric or fall outside `[0, ceiling]` become missing
/// and are reported as coercion warnings; nothing here fails on bad values.
pub fn invert_distances(
    mut df: DataFrame,
    columns: &[String],
    ceiling: f64,
) -> Result<(DataFrame, Vec<ValueCoercionWarning>)> {
    let mut warnings = Vec::new();

    for name in columns {
        let original_nulls = source_nulls(&df, name)?;
        let float_col = numeric_column(&df, name)?;
        let values = float_col.f64()?;

        let mut not_numeric = 0usize;
        let mut out_of_range = 0usize;
        let inverted: Vec<Option<f64>> = values
            .iter()
            .zip(original_nulls.iter())
            .map(|(v, &was_null)| match v {
                None => {
                    if !was_null {
                        not_numeric += 1;
                    }
                    None
                }
                Some(x) => {
                    let out = invert_distance(Some(x), ceiling);
                    if out.is_none() {
                        out_of_range += 1;
                    }
                    out
                }
            })
            .collect();

        for (count, reason) in [
            (not_numeric, CoercionReason::NotNumeric),
            (out_of_range, CoercionReason::OutOfRange),
        ] {
            if count > 0 {
                let warning = ValueCoercionWarning {
                    column: name.clone(),
                    count,
                    reason,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
        }

        df.with_column(Column::new(name.as_str().into(), inverted))?;
    }

    Ok((df, warnings))
}

/// Rename each `(from, to)` column and move it to the end of the table.
pub fn apply_renames(mut df: DataFrame, renames: &[(String, String)]) -> Result<DataFrame> {
    for (from, to) in renames {
        df.rename(from, to.as_str().into())?;
        let column = df.drop_in_place(to)?;
        df.with_column(column)?;
    }
    Ok(df)
}

/// Fill missing values of each applicable rule's column with its constant.
///
/// With `tier = None` only unscoped rules apply; with `Some(tier)` only rules
/// scoped to that tier do.
pub fn impute(mut df: DataFrame, rules: &[ResolvedImpute], tier: Option<Tier>) -> Result<DataFrame> {
    for rule in rules.iter().filter(|r| r.applies_to(tier)) {
        let float_col = numeric_column(&df, &rule.column)?;
        let values = float_col.f64()?;

        let filled_count = values.null_count();
        let filled: Vec<Option<f64>> = values
            .iter()
            .map(|v| Some(v.unwrap_or(rule.value)))
            .collect();

        if filled_count > 0 {
            info!(
                "Imputed {} missing value(s) in '{}' with {} ({})",
                filled_count, rule.column, rule.value, rule.reason
            );
        }

        df.with_column(Column::new(rule.column.as_str().into(), filled))?;
    }
    Ok(df)
}

/// Apply distance inversion, renames, numeric coercion of the scaling
/// columns and unscoped imputation to a freshly selected working table.
pub fn transform(df: DataFrame, schema: &ResolvedSchema, ceiling: f64) -> Result<Transformed> {
    let (df, mut warnings) = invert_distances(df, &schema.distance_columns, ceiling)?;
    let df = apply_renames(df, &schema.renames)?;
    let (df, coerced) = coerce_numeric(df, &schema.scaling)?;
    warnings.extend(coerced);
    let table = impute(df, &schema.imputations, None)?;
    Ok(Transformed { table, warnings })
}

//! Schema selection and the named schema contract
//!
//! Domain specs address columns by position against a known source layout.
//! [`resolve`] turns every position into a column name exactly once, before
//! any data is touched, so a shifted source layout fails loudly here instead
//! of silently misaligning indicators further down the pipeline.

use std::collections::HashSet;

use log::warn;
use polars::prelude::*;
use serde::Serialize;

use super::domain::{ColumnSelection, DomainSpec, ImputeRule, CLUSTER_COLUMN};
use super::error::{Result, SchemaError};
use super::tiers::Tier;

/// Imputation rule bound to a concrete working-table column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedImpute {
    pub column: String,
    pub value: f64,
    pub reason: String,
    pub tiers: Vec<Tier>,
}

impl ResolvedImpute {
    pub fn applies_to(&self, tier: Option<Tier>) -> bool {
        match tier {
            None => self.tiers.is_empty(),
            Some(t) => self.tiers.contains(&t),
        }
    }
}

/// Tier-specific names resolved from positional configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedTier {
    pub expected_zero_variance: Vec<String>,
    pub aggregate_excludes: Vec<String>,
}

/// A domain spec bound to the column names of one source table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSchema {
    pub domain: String,
    /// Source columns in selection order.
    pub selected: Vec<String>,
    /// Working-table columns after renames.
    pub working: Vec<String>,
    pub population: String,
    /// Source-named columns inverted from distance to accessibility.
    pub distance_columns: Vec<String>,
    /// `(source name, new name)` pairs moved to the end after inversion.
    pub renames: Vec<(String, String)>,
    pub scaling: Vec<String>,
    pub imputations: Vec<ResolvedImpute>,
    pub small: ResolvedTier,
    pub medium: ResolvedTier,
    pub high: ResolvedTier,
}

impl ResolvedSchema {
    pub fn tier(&self, tier: Tier) -> &ResolvedTier {
        match tier {
            Tier::Small => &self.small,
            Tier::Medium => &self.medium,
            Tier::High => &self.high,
        }
    }
}

/// Map a selection onto concrete names of `columns`.
pub fn resolve_selection(
    columns: &[String],
    selection: &ColumnSelection,
    context: &str,
) -> std::result::Result<Vec<String>, SchemaError> {
    let mut names = Vec::new();
    match selection {
        ColumnSelection::Ranges(ranges) => {
            for range in ranges {
                if range.start > range.end {
                    return Err(SchemaError::InvalidRange {
                        start: range.start,
                        end: range.end,
                    });
                }
                for index in range.start..range.end {
                    let name = columns.get(index).ok_or_else(|| SchemaError::IndexOutOfRange {
                        index,
                        width: columns.len(),
                        context: Some(context.to_string()),
                    })?;
                    names.push(name.clone());
                }
            }
        }
        ColumnSelection::Names(wanted) => {
            for name in wanted {
                if !columns.contains(name) {
                    return Err(SchemaError::MissingColumn {
                        column: name.clone(),
                        location: context.to_string(),
                    });
                }
                names.push(name.clone());
            }
        }
    }

    let mut seen = HashSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                column: name.clone(),
            });
        }
    }
    Ok(names)
}

fn names_at(
    columns: &[String],
    positions: &[usize],
    context: String,
) -> std::result::Result<Vec<String>, SchemaError> {
    positions
        .iter()
        .map(|&index| {
            columns
                .get(index)
                .cloned()
                .ok_or_else(|| SchemaError::IndexOutOfRange {
                    index,
                    width: columns.len(),
                    context: Some(context.clone()),
                })
        })
        .collect()
}

fn resolve_imputation(working: &[String], rule: &ImputeRule, domain: &str) -> Option<ResolvedImpute> {
    let column = working.iter().find(|c| rule.column.matches(c));
    match column {
        Some(column) => Some(ResolvedImpute {
            column: column.clone(),
            value: rule.value,
            reason: rule.reason.clone(),
            tiers: rule.tiers.clone(),
        }),
        None => {
            warn!(
                "[{}] imputation rule {:?} matched no column; skipped",
                domain, rule.column
            );
            None
        }
    }
}

/// Bind a domain spec to the columns of a source table.
pub fn resolve(columns: &[String], spec: &DomainSpec) -> std::result::Result<ResolvedSchema, SchemaError> {
    let selected = resolve_selection(columns, &spec.selection, "domain selection")?;

    if !selected.contains(&spec.population_column) {
        return Err(SchemaError::MissingColumn {
            column: spec.population_column.clone(),
            location: "domain selection".to_string(),
        });
    }
    if selected.iter().any(|c| c == CLUSTER_COLUMN) {
        return Err(SchemaError::DuplicateColumn {
            column: CLUSTER_COLUMN.to_string(),
        });
    }

    let distance_columns: Vec<String> = selected
        .iter()
        .filter(|c| **c != spec.population_column)
        .filter(|c| spec.distance.patterns.iter().any(|p| p.matches(c)))
        .cloned()
        .collect();

    let mut renames: Vec<(String, String)> = Vec::new();
    for rule in &spec.distance.renames {
        let source = selected
            .iter()
            .find(|c| rule.pattern.matches(c) && !renames.iter().any(|(s, _)| s == *c));
        if let Some(source) = source {
            renames.push((source.clone(), rule.to.clone()));
        }
    }

    let mut working: Vec<String> = selected
        .iter()
        .filter(|c| !renames.iter().any(|(s, _)| s == *c))
        .cloned()
        .collect();
    for (_, to) in &renames {
        if working.contains(to) {
            return Err(SchemaError::DuplicateColumn { column: to.clone() });
        }
        working.push(to.clone());
    }

    let scaling = resolve_selection(&working, &spec.scaling.columns, "scaling columns")?;

    let imputations = spec
        .imputations
        .iter()
        .filter_map(|rule| resolve_imputation(&working, rule, &spec.name))
        .collect();

    let resolve_tier = |tier: Tier| -> std::result::Result<ResolvedTier, SchemaError> {
        let tier_spec = spec.tiers.get(tier);
        Ok(ResolvedTier {
            expected_zero_variance: names_at(
                &scaling,
                &tier_spec.expected_zero_variance,
                format!("expected zero-variance columns, {} tier", tier),
            )?,
            aggregate_excludes: names_at(
                &working,
                &tier_spec.aggregate_excludes,
                format!("aggregate excludes, {} tier", tier),
            )?,
        })
    };

    let small = resolve_tier(Tier::Small)?;
    let medium = resolve_tier(Tier::Medium)?;
    let high = resolve_tier(Tier::High)?;

    Ok(ResolvedSchema {
        domain: spec.name.clone(),
        population: spec.population_column.clone(),
        small,
        medium,
        high,
        selected,
        working,
        distance_columns,
        renames,
        scaling,
        imputations,
    })
}

/// Slice the domain's columns out of the source table. The source table is
/// left untouched; the returned frame is the domain's working copy.
pub fn select(table: &DataFrame, schema: &ResolvedSchema) -> Result<DataFrame> {
    for name in &schema.selected {
        if table.column(name).is_err() {
            return Err(SchemaError::MissingColumn {
                column: name.clone(),
                location: "source table".to_string(),
            }
            .into());
        }
    }
    Ok(table.select(schema.selected.iter().cloned())?)
}

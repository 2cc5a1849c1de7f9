//! Population tier segmentation

use std::fmt;

use log::warn;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{Result, SchemaError};

/// Upper bound (exclusive) of the small tier.
pub const SMALL_UPPER: f64 = 1000.0;
/// Upper bound (inclusive) of the medium tier.
pub const MEDIUM_UPPER: f64 = 2500.0;

/// Population band a village falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Small,
    Medium,
    High,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Small, Tier::Medium, Tier::High];

    /// Classify a population count. Missing, negative and non-finite counts
    /// belong to no tier.
    pub fn classify(population: Option<f64>) -> Option<Tier> {
        let p = population?;
        if !p.is_finite() || p < 0.0 {
            return None;
        }
        Some(if p < SMALL_UPPER {
            Tier::Small
        } else if p <= MEDIUM_UPPER {
            Tier::Medium
        } else {
            Tier::High
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Small => "small",
            Tier::Medium => "medium",
            Tier::High => "high",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three independent tier tables plus the number of rows that fell outside
/// every tier.
#[derive(Debug, Clone)]
pub struct TierSplit {
    pub small: DataFrame,
    pub medium: DataFrame,
    pub high: DataFrame,
    pub excluded: usize,
}

impl TierSplit {
    pub fn get(&self, tier: Tier) -> &DataFrame {
        match tier {
            Tier::Small => &self.small,
            Tier::Medium => &self.medium,
            Tier::High => &self.high,
        }
    }

    pub fn into_tiers(self) -> [(Tier, DataFrame); 3] {
        [
            (Tier::Small, self.small),
            (Tier::Medium, self.medium),
            (Tier::High, self.high),
        ]
    }
}

/// Partition rows by population: `[0, 1000)` small, `[1000, 2500]` medium,
/// `(2500, inf)` high.
///
/// Rows whose population is missing, unparseable or negative are excluded
/// from every tier. The exclusion is logged rather than treated as an error.
pub fn segment(df: &DataFrame, population_column: &str) -> Result<TierSplit> {
    let population = df.column(population_column).map_err(|_| SchemaError::MissingColumn {
        column: population_column.to_string(),
        location: "working table".to_string(),
    })?;
    let population = population.cast(&DataType::Float64)?;
    let values = population.f64()?;

    let tiers: Vec<Option<Tier>> = values.iter().map(Tier::classify).collect();
    let excluded = tiers.iter().filter(|t| t.is_none()).count();

    if excluded > 0 {
        warn!(
            "{} row(s) with missing or invalid '{}' excluded from all tiers",
            excluded, population_column
        );
    }

    let take = |tier: Tier| -> Result<DataFrame> {
        let mask: Vec<bool> = tiers.iter().map(|t| *t == Some(tier)).collect();
        let mask = BooleanChunked::from_slice(PlSmallStr::from_static("tier_mask"), &mask);
        Ok(df.filter(&mask)?)
    };

    Ok(TierSplit {
        small: take(Tier::Small)?,
        medium: take(Tier::Medium)?,
        high: take(Tier::High)?,
        excluded,
    })
}

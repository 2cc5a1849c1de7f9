//! Domain selection specs and the built-in presets
//!
//! A [`DomainSpec`] is static configuration: which source columns belong to a
//! domain, how its indicators are transformed, which columns are scaled and
//! how each tier is clustered and aggregated. Specs are plain serde types so a
//! whole domain set can be loaded from or written to JSON.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::tiers::Tier;

/// Population column shared by every built-in domain.
pub const POPULATION_COLUMN: &str = "Total.Population.of.Village";

/// Ceiling used to turn a distance into an accessibility score.
pub const DISTANCE_CEILING: f64 = 15.0;

/// Name of the label column appended to each tier table.
pub const CLUSTER_COLUMN: &str = "Clusters";

/// Half-open, 0-based column position range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl IndexRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn single(index: usize) -> Self {
        Self {
            start: index,
            end: index + 1,
        }
    }
}

/// How a set of columns is picked out of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSelection {
    /// Ordered position ranges against a known column ordering.
    Ranges(Vec<IndexRange>),
    /// Explicit column names.
    Names(Vec<String>),
}

/// Predicate on a column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePattern {
    Exact(String),
    Contains(String),
    StartsWith(String),
}

impl NamePattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(s) => name == s,
            NamePattern::Contains(s) => name.contains(s.as_str()),
            NamePattern::StartsWith(s) => name.starts_with(s.as_str()),
        }
    }
}

/// A matched distance column that is renamed and moved to the end of the
/// working table after inversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameRule {
    pub pattern: NamePattern,
    pub to: String,
}

/// Distance-to-facility columns inverted to accessibility scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSpec {
    #[serde(default)]
    pub patterns: Vec<NamePattern>,
    #[serde(default = "default_ceiling")]
    pub ceiling: f64,
    #[serde(default)]
    pub renames: Vec<RenameRule>,
}

fn default_ceiling() -> f64 {
    DISTANCE_CEILING
}

impl Default for DistanceSpec {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            ceiling: DISTANCE_CEILING,
            renames: Vec::new(),
        }
    }
}

/// Replace missing values in one column with a domain-supplied constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputeRule {
    /// First column in the working table matching this pattern.
    pub column: NamePattern,
    pub value: f64,
    pub reason: String,
    /// Tiers the rule applies to; empty means every row before segmentation.
    #[serde(default)]
    pub tiers: Vec<Tier>,
}

impl ImputeRule {
    pub fn is_tier_scoped(&self) -> bool {
        !self.tiers.is_empty()
    }
}

/// What the scaler does with missing values in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Treat missing as zero before scaling.
    ZeroFill,
    /// The column must already be complete; leftover nulls make the tier
    /// degenerate.
    Require,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingSpec {
    /// Positions (or names) in the transformed working table.
    pub columns: ColumnSelection,
    pub missing: MissingPolicy,
    /// Per-column policy overriding `missing`, keyed by column name.
    #[serde(default)]
    pub overrides: BTreeMap<String, MissingPolicy>,
}

impl ScalingSpec {
    pub fn policy_for(&self, column: &str) -> MissingPolicy {
        self.overrides.get(column).copied().unwrap_or(self.missing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub k: usize,
    pub restarts: usize,
    pub seed: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_max_iterations() -> usize {
    300
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElbowSpec {
    pub max_clusters: usize,
    pub restarts: usize,
    pub seed: u64,
}

impl Default for ElbowSpec {
    fn default() -> Self {
        Self {
            max_clusters: 5,
            restarts: 10,
            seed: 3110,
        }
    }
}

/// Per-tier overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Restart count for this tier; falls back to `ClusterSpec::restarts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restarts: Option<usize>,
    /// Positions within the scaling columns historically known to be
    /// constant in this tier. Used only to flag drift.
    #[serde(default)]
    pub expected_zero_variance: Vec<usize>,
    /// Positions in the working table left out of the cluster profile.
    #[serde(default)]
    pub aggregate_excludes: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierSpecs {
    #[serde(default)]
    pub small: TierSpec,
    #[serde(default)]
    pub medium: TierSpec,
    #[serde(default)]
    pub high: TierSpec,
}

impl TierSpecs {
    pub fn uniform(spec: TierSpec) -> Self {
        Self {
            small: spec.clone(),
            medium: spec.clone(),
            high: spec,
        }
    }

    pub fn get(&self, tier: Tier) -> &TierSpec {
        match tier {
            Tier::Small => &self.small,
            Tier::Medium => &self.medium,
            Tier::High => &self.high,
        }
    }
}

/// Complete configuration of one domain pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSpec {
    pub name: String,
    pub selection: ColumnSelection,
    #[serde(default = "default_population_column")]
    pub population_column: String,
    #[serde(default)]
    pub distance: DistanceSpec,
    #[serde(default)]
    pub imputations: Vec<ImputeRule>,
    pub scaling: ScalingSpec,
    pub clustering: ClusterSpec,
    #[serde(default)]
    pub elbow: ElbowSpec,
    #[serde(default)]
    pub tiers: TierSpecs,
    /// Report columns dropped for zero variance in the cluster profile.
    #[serde(default = "default_true")]
    pub profile_zero_variance: bool,
}

fn default_population_column() -> String {
    POPULATION_COLUMN.to_string()
}

fn default_true() -> bool {
    true
}

impl DomainSpec {
    /// Restart count effective for a tier.
    pub fn restarts_for(&self, tier: Tier) -> usize {
        self.tiers
            .get(tier)
            .restarts
            .unwrap_or(self.clustering.restarts)
    }
}

/// Identifier columns (district and village name) at the front of every
/// built-in selection.
const IDENTIFIER_POSITIONS: [usize; 2] = [0, 1];

fn identifiers_only() -> TierSpec {
    TierSpec {
        aggregate_excludes: IDENTIFIER_POSITIONS.to_vec(),
        ..TierSpec::default()
    }
}

fn with_restarts(restarts: usize, expected_zero_variance: Vec<usize>) -> TierSpec {
    TierSpec {
        restarts: Some(restarts),
        expected_zero_variance,
        aggregate_excludes: IDENTIFIER_POSITIONS.to_vec(),
    }
}

fn ranges(items: &[(usize, usize)]) -> ColumnSelection {
    ColumnSelection::Ranges(items.iter().map(|&(s, e)| IndexRange::new(s, e)).collect())
}

fn contains(s: &str) -> NamePattern {
    NamePattern::Contains(s.to_string())
}

fn clustering(restarts: usize) -> ClusterSpec {
    ClusterSpec {
        k: 4,
        restarts,
        seed: 42,
        max_iterations: default_max_iterations(),
    }
}

pub fn agriculture() -> DomainSpec {
    DomainSpec {
        name: "agriculture".to_string(),
        selection: ranges(&[(1, 8), (135, 139), (144, 152)]),
        population_column: default_population_column(),
        distance: DistanceSpec::default(),
        imputations: Vec::new(),
        scaling: ScalingSpec {
            columns: ranges(&[(2, 5), (7, 19)]),
            missing: MissingPolicy::Require,
            overrides: BTreeMap::new(),
        },
        clustering: clustering(3),
        elbow: ElbowSpec {
            max_clusters: 8,
            ..ElbowSpec::default()
        },
        tiers: TierSpecs::uniform(identifiers_only()),
        profile_zero_variance: true,
    }
}

pub fn education() -> DomainSpec {
    let long_column = "(If.not.available.within.the.village";
    DomainSpec {
        name: "education".to_string(),
        selection: ranges(&[(1, 30)]),
        population_column: default_population_column(),
        distance: DistanceSpec {
            patterns: vec![
                contains("Distance"),
                NamePattern::StartsWith(long_column.to_string()),
            ],
            ceiling: DISTANCE_CEILING,
            renames: vec![RenameRule {
                pattern: NamePattern::StartsWith(long_column.to_string()),
                to: "Distance10".to_string(),
            }],
        },
        imputations: Vec::new(),
        scaling: ScalingSpec {
            columns: ranges(&[(2, 29)]),
            missing: MissingPolicy::Require,
            overrides: BTreeMap::new(),
        },
        clustering: clustering(3),
        elbow: ElbowSpec::default(),
        tiers: TierSpecs {
            small: with_restarts(3, vec![23, 24]),
            medium: with_restarts(3, Vec::new()),
            high: with_restarts(10, vec![24]),
        },
        profile_zero_variance: false,
    }
}

pub fn health() -> DomainSpec {
    DomainSpec {
        name: "health".to_string(),
        selection: ranges(&[(1, 8), (30, 74)]),
        population_column: default_population_column(),
        distance: DistanceSpec {
            patterns: vec![contains("Distance")],
            ..DistanceSpec::default()
        },
        imputations: Vec::new(),
        scaling: ScalingSpec {
            columns: ranges(&[(2, 51)]),
            missing: MissingPolicy::Require,
            overrides: BTreeMap::new(),
        },
        clustering: clustering(3),
        elbow: ElbowSpec::default(),
        tiers: TierSpecs {
            small: with_restarts(3, vec![5, 6, 7, 25, 26, 27, 41, 42, 43]),
            medium: with_restarts(3, vec![25, 26, 27, 41, 42, 43]),
            high: with_restarts(3, Vec::new()),
        },
        profile_zero_variance: false,
    }
}

pub fn infrastructure() -> DomainSpec {
    DomainSpec {
        name: "infrastructure".to_string(),
        selection: ranges(&[(1, 8), (74, 75), (81, 113)]),
        population_column: default_population_column(),
        distance: DistanceSpec {
            patterns: vec![contains("Distance")],
            ..DistanceSpec::default()
        },
        imputations: Vec::new(),
        scaling: ScalingSpec {
            columns: ranges(&[(2, 5), (7, 40)]),
            missing: MissingPolicy::ZeroFill,
            overrides: BTreeMap::new(),
        },
        clustering: clustering(10),
        elbow: ElbowSpec::default(),
        tiers: TierSpecs::uniform(identifiers_only()),
        profile_zero_variance: true,
    }
}

pub fn irrigation() -> DomainSpec {
    DomainSpec {
        name: "irrigation".to_string(),
        selection: ranges(&[(1, 8), (75, 81), (152, 160)]),
        population_column: default_population_column(),
        distance: DistanceSpec::default(),
        imputations: vec![ImputeRule {
            column: contains("Canal"),
            value: 39.9,
            reason: "typical canal-irrigated area for small villages".to_string(),
            tiers: vec![Tier::Small],
        }],
        scaling: ScalingSpec {
            columns: ranges(&[(2, 5), (7, 21)]),
            missing: MissingPolicy::ZeroFill,
            overrides: BTreeMap::new(),
        },
        clustering: clustering(10),
        elbow: ElbowSpec::default(),
        tiers: TierSpecs::uniform(identifiers_only()),
        profile_zero_variance: true,
    }
}

pub fn social() -> DomainSpec {
    DomainSpec {
        name: "social".to_string(),
        selection: ranges(&[(1, 8), (113, 135)]),
        population_column: default_population_column(),
        distance: DistanceSpec {
            patterns: vec![contains("Distance")],
            ..DistanceSpec::default()
        },
        imputations: vec![ImputeRule {
            column: NamePattern::Exact("Distance".to_string()),
            value: 12.78,
            reason: "regional mean accessibility for small villages".to_string(),
            tiers: vec![Tier::Small],
        }],
        scaling: ScalingSpec {
            columns: ranges(&[(2, 29)]),
            missing: MissingPolicy::ZeroFill,
            overrides: BTreeMap::new(),
        },
        clustering: clustering(10),
        elbow: ElbowSpec::default(),
        tiers: TierSpecs {
            small: with_restarts(10, vec![21]),
            medium: with_restarts(10, vec![5, 6]),
            high: with_restarts(10, vec![5, 6]),
        },
        profile_zero_variance: false,
    }
}

/// The six built-in domain presets.
pub fn builtin_domains() -> Vec<DomainSpec> {
    vec![
        agriculture(),
        education(),
        health(),
        infrastructure(),
        irrigation(),
        social(),
    ]
}

/// Load a list of domain specs from a JSON file
pub fn load_domain_specs(path: &Path) -> Result<Vec<DomainSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read domain config: {}", path.display()))?;
    let specs: Vec<DomainSpec> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse domain config: {}", path.display()))?;
    if specs.is_empty() {
        anyhow::bail!("Domain config {} defines no domains", path.display());
    }
    Ok(specs)
}

/// Write domain specs as pretty-printed JSON
pub fn write_domain_specs(specs: &[DomainSpec], path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(specs).context("Failed to serialize domain config")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write domain config: {}", path.display()))?;
    Ok(())
}

/// Keep only the specs whose names appear in `names` (all of them when empty).
pub fn filter_domains(specs: Vec<DomainSpec>, names: &[String]) -> Result<Vec<DomainSpec>> {
    if names.is_empty() {
        return Ok(specs);
    }
    for name in names {
        if !specs.iter().any(|s| &s.name == name) {
            let available: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
            anyhow::bail!("Unknown domain '{}'. Available domains: {:?}", name, available);
        }
    }
    Ok(specs
        .into_iter()
        .filter(|s| names.contains(&s.name))
        .collect())
}

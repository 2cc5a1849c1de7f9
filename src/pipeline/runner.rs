//! Per-domain orchestration of the clustering pipeline
//!
//! A domain run resolves its schema, transforms its working copy, segments it
//! into tiers and clusters each tier independently. Schema errors abort the
//! domain; degenerate tiers are skipped and recorded alongside the tiers
//! that did produce output.

use log::{info, warn};
use polars::prelude::*;
use rayon::prelude::*;

use super::aggregate::{aggregate, with_labels};
use super::domain::DomainSpec;
use super::error::{DegenerateInputError, PipelineError, Result, ValueCoercionWarning};
use super::kmeans::{self, ElbowPoint, KMeansConfig};
use super::loader::get_column_names;
use super::scaler::{check_drift, scale, ZeroVarianceDrift};
use super::schema::{self, ResolvedSchema};
use super::tiers::{segment, Tier};
use super::transform::{impute, transform};

/// Run-wide overrides layered on top of each domain spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub k: Option<usize>,
    pub restarts: Option<usize>,
    pub seed: Option<u64>,
    /// Compute the elbow curve for every clustered tier.
    pub elbow: bool,
    pub elbow_max: Option<usize>,
}

impl RunOptions {
    /// Copy of `spec` with these overrides applied. A restart override
    /// replaces the per-tier restart counts as well.
    pub fn apply(&self, spec: &DomainSpec) -> DomainSpec {
        let mut spec = spec.clone();
        if let Some(k) = self.k {
            spec.clustering.k = k;
        }
        if let Some(seed) = self.seed {
            spec.clustering.seed = seed;
        }
        if let Some(restarts) = self.restarts {
            spec.clustering.restarts = restarts;
            for tier in [&mut spec.tiers.small, &mut spec.tiers.medium, &mut spec.tiers.high] {
                tier.restarts = None;
            }
        }
        if let Some(max) = self.elbow_max {
            spec.elbow.max_clusters = max;
        }
        spec
    }
}

/// Everything produced for one clustered tier.
#[derive(Debug, Clone)]
pub struct TierOutput {
    /// Tier table with the `Clusters` column appended.
    pub labeled: DataFrame,
    /// One row per cluster with the mean of each reported indicator.
    pub profile: DataFrame,
    /// Columns that made it into the scaled matrix.
    pub features: Vec<String>,
    pub zero_variance: Vec<String>,
    pub drift: Option<ZeroVarianceDrift>,
    pub k: usize,
    pub restarts: usize,
    pub inertia: f64,
    pub iterations: usize,
    pub cluster_sizes: Vec<usize>,
    pub elbow: Option<Vec<ElbowPoint>>,
}

/// Outcome of one tier: clustered output or the reason it was skipped.
#[derive(Debug, Clone)]
pub struct TierRun {
    pub tier: Tier,
    pub rows: usize,
    pub outcome: std::result::Result<TierOutput, DegenerateInputError>,
}

impl TierRun {
    pub fn output(&self) -> Option<&TierOutput> {
        self.outcome.as_ref().ok()
    }
}

/// Everything produced for one domain that got past schema resolution.
#[derive(Debug, Clone)]
pub struct DomainOutput {
    pub schema: ResolvedSchema,
    pub warnings: Vec<ValueCoercionWarning>,
    /// Rows left out of every tier for a missing or invalid population.
    pub excluded_population: usize,
    pub tiers: Vec<TierRun>,
}

#[derive(Debug)]
pub struct DomainRun {
    pub domain: String,
    pub outcome: Result<DomainOutput>,
}

impl DomainRun {
    pub fn output(&self) -> Option<&DomainOutput> {
        self.outcome.as_ref().ok()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

fn cluster_tier(
    table: DataFrame,
    tier: Tier,
    schema: &ResolvedSchema,
    spec: &DomainSpec,
    options: &RunOptions,
) -> Result<TierOutput> {
    let table = impute(table, &schema.imputations, Some(tier))?;
    let rows = table.height();
    let k = spec.clustering.k;

    if rows == 0 {
        return Err(DegenerateInputError::EmptyTier.into());
    }
    if k == 0 {
        return Err(DegenerateInputError::ZeroClusters.into());
    }
    if rows < k {
        return Err(DegenerateInputError::TooFewRows { rows, k }.into());
    }

    let scaled = scale(&table, &schema.scaling, &spec.scaling)?;

    let resolved_tier = schema.tier(tier);
    let drift = check_drift(&resolved_tier.expected_zero_variance, &scaled.zero_variance);
    if let Some(drift) = &drift {
        warn!(
            "[{}/{}] zero-variance drift: declared but varying {:?}, constant but undeclared {:?}",
            spec.name, tier, drift.expected_only, drift.detected_only
        );
    }

    let restarts = spec.restarts_for(tier);
    let config = KMeansConfig::from_spec(&spec.clustering, restarts);
    let fit = kmeans::fit(&scaled.data, &config)?;

    let labeled = with_labels(&table, &fit.labels)?;

    let mut excludes = resolved_tier.aggregate_excludes.clone();
    if !spec.profile_zero_variance {
        excludes.extend(scaled.zero_variance.iter().cloned());
    }
    let profile = aggregate(&labeled, &excludes)?;

    let elbow = if options.elbow {
        Some(kmeans::elbow(
            &scaled.data,
            spec.elbow.max_clusters,
            spec.elbow.restarts,
            spec.elbow.seed,
        )?)
    } else {
        None
    };

    info!(
        "[{}/{}] {} rows, {} features, inertia {:.4} after {} iteration(s)",
        spec.name,
        tier,
        rows,
        scaled.ncols(),
        fit.inertia,
        fit.iterations
    );

    Ok(TierOutput {
        labeled,
        profile,
        cluster_sizes: fit.cluster_sizes(),
        features: scaled.columns,
        zero_variance: scaled.zero_variance,
        drift,
        k,
        restarts,
        inertia: fit.inertia,
        iterations: fit.iterations,
        elbow,
    })
}

fn run_domain_inner(table: &DataFrame, spec: &DomainSpec, options: &RunOptions) -> Result<DomainOutput> {
    let columns = get_column_names(table);
    let schema = schema::resolve(&columns, spec)?;
    let working = schema::select(table, &schema)?;

    let transformed = transform(working, &schema, spec.distance.ceiling)?;
    let split = segment(&transformed.table, &schema.population)?;
    let excluded_population = split.excluded;

    let mut tiers = Vec::with_capacity(Tier::ALL.len());
    for (tier, tier_table) in split.into_tiers() {
        let rows = tier_table.height();
        let outcome = match cluster_tier(tier_table, tier, &schema, spec, options) {
            Ok(output) => Ok(output),
            Err(PipelineError::Degenerate(reason)) => {
                warn!("[{}/{}] tier skipped: {}", spec.name, tier, reason);
                Err(reason)
            }
            Err(err) => return Err(err),
        };
        tiers.push(TierRun { tier, rows, outcome });
    }

    Ok(DomainOutput {
        schema,
        warnings: transformed.warnings,
        excluded_population,
        tiers,
    })
}

/// Run the full pipeline for one domain against the source table.
///
/// The source table is only read; every stage works on the domain's own
/// copy. Overrides from `options` are applied to `spec` first.
pub fn run_domain(table: &DataFrame, spec: &DomainSpec, options: &RunOptions) -> DomainRun {
    let spec = options.apply(spec);
    let outcome = run_domain_inner(table, &spec, options);
    if let Err(err) = &outcome {
        warn!("[{}] domain aborted: {}", spec.name, err);
    }
    DomainRun {
        domain: spec.name,
        outcome,
    }
}

/// Run every domain in parallel. Results come back in the order of `specs`,
/// and a failed domain never stops the others.
pub fn run_domains(table: &DataFrame, specs: &[DomainSpec], options: &RunOptions) -> Vec<DomainRun> {
    run_domains_with_progress(table, specs, options, |_| {})
}

/// Like [`run_domains`], calling `on_done` as each domain finishes.
pub fn run_domains_with_progress<F>(
    table: &DataFrame,
    specs: &[DomainSpec],
    options: &RunOptions,
    on_done: F,
) -> Vec<DomainRun>
where
    F: Fn(&DomainRun) + Sync,
{
    specs
        .par_iter()
        .map(|spec| {
            let run = run_domain(table, spec, options);
            on_done(&run);
            run
        })
        .collect()
}

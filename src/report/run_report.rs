//! JSON run report
//!
//! Records what every domain and tier produced, or why it was skipped, so a
//! batch run can be audited after the fact without re-reading the CSVs.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{
    DegenerateInputError, DomainRun, ElbowPoint, Tier, TierRun, ValueCoercionWarning,
    ZeroVarianceDrift,
};

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub version: String,
    pub input_file: String,
    pub output_dir: String,
}

/// Outcome of one tier in the report
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TierStatus {
    Clustered {
        k: usize,
        restarts: usize,
        inertia: f64,
        iterations: usize,
        cluster_sizes: Vec<usize>,
        features: Vec<String>,
        zero_variance: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        drift: Option<ZeroVarianceDrift>,
        #[serde(skip_serializing_if = "Option::is_none")]
        elbow: Option<Vec<ElbowPoint>>,
    },
    Skipped {
        reason: String,
        detail: DegenerateInputError,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct TierEntry {
    pub tier: Tier,
    pub rows: usize,
    #[serde(flatten)]
    pub status: TierStatus,
}

impl From<&TierRun> for TierEntry {
    fn from(run: &TierRun) -> Self {
        let status = match &run.outcome {
            Ok(out) => TierStatus::Clustered {
                k: out.k,
                restarts: out.restarts,
                inertia: out.inertia,
                iterations: out.iterations,
                cluster_sizes: out.cluster_sizes.clone(),
                features: out.features.clone(),
                zero_variance: out.zero_variance.clone(),
                drift: out.drift.clone(),
                elbow: out.elbow.clone(),
            },
            Err(reason) => TierStatus::Skipped {
                reason: reason.to_string(),
                detail: reason.clone(),
            },
        };
        Self {
            tier: run.tier,
            rows: run.rows,
            status,
        }
    }
}

/// One domain in the report
#[derive(Debug, Clone, Serialize)]
pub struct DomainEntry {
    pub domain: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub excluded_population: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coercion_warnings: Vec<ValueCoercionWarning>,
    pub tiers: Vec<TierEntry>,
}

impl From<&DomainRun> for DomainEntry {
    fn from(run: &DomainRun) -> Self {
        match &run.outcome {
            Ok(output) => Self {
                domain: run.domain.clone(),
                status: "ok".to_string(),
                error: None,
                excluded_population: output.excluded_population,
                coercion_warnings: output.warnings.clone(),
                tiers: output.tiers.iter().map(TierEntry::from).collect(),
            },
            Err(err) => Self {
                domain: run.domain.clone(),
                status: "failed".to_string(),
                error: Some(err.to_string()),
                excluded_population: 0,
                coercion_warnings: Vec::new(),
                tiers: Vec::new(),
            },
        }
    }
}

/// Complete run report
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: ReportMetadata,
    pub domains: Vec<DomainEntry>,
}

impl RunReport {
    pub fn new(runs: &[DomainRun], input: &Path, output_dir: &Path) -> Self {
        Self {
            metadata: ReportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                input_file: input.display().to_string(),
                output_dir: output_dir.display().to_string(),
            },
            domains: runs.iter().map(DomainEntry::from).collect(),
        }
    }

    pub fn failed_domains(&self) -> usize {
        self.domains.iter().filter(|d| d.error.is_some()).count()
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report: {}", path.display()))?;
        Ok(())
    }
}

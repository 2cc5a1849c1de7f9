//! Run summary table

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{ColumnSelection, DomainRun, DomainSpec, Tier};

/// One printed row: a tier, or a whole domain that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub domain: String,
    pub tier: String,
    pub rows: Option<usize>,
    pub features: Option<usize>,
    pub zero_variance: Option<usize>,
    pub clusters: Option<usize>,
    pub inertia: Option<f64>,
    pub status: String,
    pub ok: bool,
}

/// Summary of a batch of domain runs
#[derive(Debug, Default)]
pub struct RunSummary {
    pub rows: Vec<SummaryRow>,
}

impl RunSummary {
    pub fn from_runs(runs: &[DomainRun]) -> Self {
        let mut rows = Vec::new();
        for run in runs {
            match &run.outcome {
                Ok(output) => {
                    for tier in &output.tiers {
                        let row = match &tier.outcome {
                            Ok(out) => SummaryRow {
                                domain: run.domain.clone(),
                                tier: tier.tier.to_string(),
                                rows: Some(tier.rows),
                                features: Some(out.features.len()),
                                zero_variance: Some(out.zero_variance.len()),
                                clusters: Some(out.k),
                                inertia: Some(out.inertia),
                                status: if out.drift.is_some() {
                                    "ok (drift)".to_string()
                                } else {
                                    "ok".to_string()
                                },
                                ok: true,
                            },
                            Err(reason) => SummaryRow {
                                domain: run.domain.clone(),
                                tier: tier.tier.to_string(),
                                rows: Some(tier.rows),
                                features: None,
                                zero_variance: None,
                                clusters: None,
                                inertia: None,
                                status: format!("skipped: {}", reason),
                                ok: false,
                            },
                        };
                        rows.push(row);
                    }
                }
                Err(err) => rows.push(SummaryRow {
                    domain: run.domain.clone(),
                    tier: "-".to_string(),
                    rows: None,
                    features: None,
                    zero_variance: None,
                    clusters: None,
                    inertia: None,
                    status: format!("failed: {}", err),
                    ok: false,
                }),
            }
        }
        Self { rows }
    }

    pub fn clustered_tiers(&self) -> usize {
        self.rows.iter().filter(|r| r.ok).count()
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(
            ["Domain", "Tier", "Rows", "Features", "Zero-var", "Clusters", "Inertia", "Status"]
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );

        let opt = |v: Option<usize>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        for row in &self.rows {
            table.add_row(vec![
                Cell::new(&row.domain),
                Cell::new(&row.tier),
                Cell::new(opt(row.rows)),
                Cell::new(opt(row.features)),
                Cell::new(opt(row.zero_variance)).fg(match row.zero_variance {
                    Some(n) if n > 0 => Color::Yellow,
                    _ => Color::White,
                }),
                Cell::new(opt(row.clusters)),
                Cell::new(
                    row.inertia
                        .map(|i| format!("{:.2}", i))
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(&row.status).fg(if row.ok { Color::Green } else { Color::Red }),
            ]);
        }
        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("CLUSTERING SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        // Indent the table
        for line in self.to_table().to_string().lines() {
            println!("    {}", line);
        }

        println!();
        println!(
            "      {} of {} tier(s) clustered",
            style(self.clustered_tiers()).green().bold(),
            self.rows.len()
        );
    }
}

/// Table of domain specs for the `domains` subcommand
pub fn domains_table(specs: &[DomainSpec]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        ["Domain", "Selection", "k", "Restarts (S/M/H)", "Seed", "Missing", "Elbow max"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
    );

    for spec in specs {
        let selection = match &spec.selection {
            ColumnSelection::Ranges(ranges) => ranges
                .iter()
                .map(|r| format!("{}..{}", r.start, r.end))
                .collect::<Vec<_>>()
                .join(", "),
            ColumnSelection::Names(names) => format!("{} named column(s)", names.len()),
        };
        let restarts = Tier::ALL
            .iter()
            .map(|t| spec.restarts_for(*t).to_string())
            .collect::<Vec<_>>()
            .join("/");

        table.add_row(vec![
            Cell::new(&spec.name).add_attribute(Attribute::Bold),
            Cell::new(selection),
            Cell::new(spec.clustering.k),
            Cell::new(restarts),
            Cell::new(spec.clustering.seed),
            Cell::new(format!("{:?}", spec.scaling.missing)),
            Cell::new(spec.elbow.max_clusters),
        ]);
    }
    table
}

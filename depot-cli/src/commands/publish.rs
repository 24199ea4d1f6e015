//! `depot-publish` — rebuild the manifest from tracked directories.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use depot_core::config;
use depot_sync::{pipeline, BuildReport};

/// Arguments for `depot-publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Project root containing the tracked directories.
    pub root: PathBuf,

    /// Track an extra directory (relative to ROOT), after those in depot.yaml.
    #[arg(long = "track", value_name = "DIR")]
    pub track: Vec<String>,

    /// Leave a file out of the manifest.
    #[arg(long = "exclude", value_name = "PATH")]
    pub exclude: Vec<String>,

    /// Show what would change without writing the manifest.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PublishArgs {
    pub fn run(self) -> Result<()> {
        let mut publish = config::load_at(&self.root)
            .with_context(|| format!("failed to load config under {}", self.root.display()))?
            .publish;
        publish.tracked.extend(self.track);
        publish.blacklist.extend(self.exclude);
        if publish.tracked.is_empty() {
            tracing::warn!("no tracked directories; the manifest will be empty");
        }

        let report = pipeline::publish(&self.root, &publish, self.dry_run)
            .with_context(|| format!("publish failed for {}", self.root.display()))?;

        if self.json {
            let payload = PublishReportJson::new(&report, self.dry_run);
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize report JSON")?
            );
            return Ok(());
        }
        print_report(&report, self.dry_run);
        Ok(())
    }
}

#[derive(Serialize)]
struct PublishReportJson<'a> {
    dry_run: bool,
    entries: usize,
    created: &'a [String],
    modified: &'a [String],
    removed: &'a [String],
    unchanged: usize,
}

impl<'a> PublishReportJson<'a> {
    fn new(report: &'a BuildReport, dry_run: bool) -> Self {
        Self {
            dry_run,
            entries: report.manifest.len(),
            created: &report.created,
            modified: &report.modified,
            removed: &report.removed,
            unchanged: report.unchanged,
        }
    }
}

fn print_report(report: &BuildReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if report.is_noop() {
        println!(
            "{prefix}{} manifest unchanged ({} entries)",
            "✓".green(),
            report.manifest.len()
        );
        return;
    }

    println!(
        "{prefix}{} manifest {} ({} created, {} modified, {} removed, {} unchanged)",
        "✓".green(),
        if dry_run { "would change" } else { "updated" },
        report.created.len(),
        report.modified.len(),
        report.removed.len(),
        report.unchanged
    );
    for path in &report.created {
        println!("  {}  {path}", "+".green());
    }
    for path in &report.modified {
        println!("  {}  {path}", "~".yellow());
    }
    for path in &report.removed {
        println!("  {}  {path}", "-".red());
    }
}

//! `depot-update` — bring a consumer root in line with its remote.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use depot_core::config;
use depot_sync::{
    pipeline, AssumeYes, ChangeSet, Confirm, FailedDownload, LinePrompt, SyncError, SyncOptions,
    SyncOutcome, SyncReport,
};

/// Arguments for `depot-update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Consumer root to sync.
    pub root: PathBuf,

    /// Ignore the local manifest and download every remote file.
    #[arg(long)]
    pub refresh: bool,

    /// Apply changes without asking.
    #[arg(long)]
    pub force: bool,

    /// Remote base URL, overriding `remote.base_url` in depot.yaml.
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl UpdateArgs {
    pub fn run(self) -> Result<()> {
        let remote = config::load_at(&self.root)
            .with_context(|| format!("failed to load config under {}", self.root.display()))?
            .remote;
        let options = SyncOptions {
            full_resync: self.refresh,
            force: self.force,
            concurrency: remote.concurrency,
        };

        let mut confirm: Box<dyn Confirm> = if self.force {
            Box::new(AssumeYes)
        } else {
            Box::new(ShowChanges(LinePrompt::new(io::stdin().lock(), io::stderr())))
        };

        let outcome = pipeline::update(
            &self.root,
            &remote,
            self.remote.as_deref(),
            options,
            confirm.as_mut(),
        )
        .with_context(|| format!("update failed for {}", self.root.display()))?;

        if self.json {
            let payload = UpdateReportJson::from(&outcome);
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize report JSON")?
            );
        } else {
            print_outcome(&outcome);
        }

        if let SyncOutcome::Aborted { changes, failed } = &outcome {
            bail!(
                "sync aborted: {} of {} download(s) failed; nothing was changed",
                failed.len(),
                changes.download_set().len()
            );
        }
        Ok(())
    }
}

/// Lists the pending changes on stderr before asking.
struct ShowChanges<C>(C);

impl<C: Confirm> Confirm for ShowChanges<C> {
    fn confirm(&mut self, changes: &ChangeSet) -> Result<bool, SyncError> {
        if io::stderr().is_terminal() {
            eprintln!("{}", changes_table(changes));
        }
        self.0.confirm(changes)
    }
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "action")]
    action: &'static str,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "version")]
    version: u64,
}

fn changes_table(changes: &ChangeSet) -> Table {
    let rows = changes
        .to_create
        .iter()
        .map(|e| ("create", e))
        .chain(changes.to_update.iter().map(|e| ("update", e)))
        .chain(changes.to_delete.iter().map(|e| ("delete", e)))
        .map(|(action, entry)| ChangeRow {
            action,
            path: entry.full_path.clone(),
            version: entry.version,
        });
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "error")]
    error: String,
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::UpToDate => println!("{} already up to date", "✓".green()),
        SyncOutcome::Declined(_) => println!("{} sync declined; nothing changed", "✗".yellow()),
        SyncOutcome::Aborted { failed, .. } => {
            let rows = failed.iter().map(|f| FailureRow {
                path: f.path.clone(),
                error: f.error.to_string(),
            });
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            eprintln!("{} {} download(s) failed", "✗".red().bold(), failed.len());
            eprintln!("{table}");
        }
        SyncOutcome::Synced(report) => print_report(report),
    }
}

fn print_report(report: &SyncReport) {
    println!(
        "{} synced ({} created, {} updated, {} deleted, {} bytes)",
        "✓".green(),
        report.created.len(),
        report.updated.len(),
        report.deleted.len(),
        report.bytes_downloaded
    );
    for path in &report.created {
        println!("  {}  {path}", "+".green());
    }
    for path in &report.updated {
        println!("  {}  {path}", "~".yellow());
    }
    for path in &report.deleted {
        println!("  {}  {path}", "-".red());
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct UpdateReportJson {
    status: &'static str,
    created: Vec<String>,
    updated: Vec<String>,
    deleted: Vec<String>,
    bytes_downloaded: u64,
    failed: Vec<FailedDownloadJson>,
}

#[derive(Serialize)]
struct FailedDownloadJson {
    path: String,
    error: String,
}

impl From<&FailedDownload> for FailedDownloadJson {
    fn from(f: &FailedDownload) -> Self {
        Self {
            path: f.path.clone(),
            error: f.error.to_string(),
        }
    }
}

impl From<&SyncOutcome> for UpdateReportJson {
    fn from(outcome: &SyncOutcome) -> Self {
        let empty = |status| Self {
            status,
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            bytes_downloaded: 0,
            failed: Vec::new(),
        };
        match outcome {
            SyncOutcome::UpToDate => empty("up_to_date"),
            SyncOutcome::Declined(_) => empty("declined"),
            SyncOutcome::Aborted { failed, .. } => Self {
                failed: failed.iter().map(FailedDownloadJson::from).collect(),
                ..empty("aborted")
            },
            SyncOutcome::Synced(report) => Self {
                created: report.created.clone(),
                updated: report.updated.clone(),
                deleted: report.deleted.clone(),
                bytes_downloaded: report.bytes_downloaded,
                ..empty("synced")
            },
        }
    }
}

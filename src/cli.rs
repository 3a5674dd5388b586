//! CLI surface for the `restamp` binary.
//!
//! `preflight` renders the confirmation summary without touching any store.
//! `run` asks for confirmation, migrates, writes the report, and records a
//! version marker so the one-time upgrade does not run twice by accident.

use crate::core::config::ProjectConfig;
use crate::core::engine::UpgradeSession;
use crate::core::error::RestampError;
use crate::core::log::UpgradeLog;
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use ulid::Ulid;

pub const RESTAMP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Marker recorded next to the config after a successful run.
const MARKER_FILE: &str = ".restamp/upgraded.version";

#[derive(Parser, Debug)]
#[clap(
    name = "restamp",
    version = env!("CARGO_PKG_VERSION"),
    about = "One-time key migration: embed resolved run times into record store keys."
)]
pub struct Cli {
    /// Project config file listing stores and documentation sites.
    #[clap(long, default_value = "restamp.toml")]
    pub config: PathBuf,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show what would be upgraded, without touching any store
    Preflight {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Run the upgrade across all migratable stores and sites
    Run {
        /// Skip the interactive confirmation prompt.
        #[clap(long)]
        yes: bool,
        /// Run even if a completed upgrade is already recorded.
        #[clap(long)]
        force: bool,
        /// Write the full JSON report to this path.
        #[clap(long)]
        report: Option<PathBuf>,
    },
}

pub fn dispatch(cli: Cli) -> Result<(), RestampError> {
    let config = ProjectConfig::load(&cli.config)?;
    match cli.command {
        Command::Preflight { format } => preflight(&config, &format),
        Command::Run { yes, force, report } => {
            run_upgrade(&cli.config, &config, yes, force, report.as_deref())
        }
    }
}

fn build_session(config: &ProjectConfig) -> Result<UpgradeSession, RestampError> {
    let registry = config.build_registry()?;
    UpgradeSession::new(&registry, &config.sites)
}

fn preflight(config: &ProjectConfig, format: &str) -> Result<(), RestampError> {
    let session = build_session(config)?;
    if format == "json" {
        let summary = serde_json::json!({
            "upgrade": {
                "validation_stores": session.checklist().validations.keys().collect::<Vec<_>>(),
                "docs_sites": session.checklist().docs_sites.keys().collect::<Vec<_>>(),
            },
            "manual": session.log().summarize(),
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap());
    } else {
        println!("{}", session.preflight_summary());
    }
    Ok(())
}

fn run_upgrade(
    config_path: &Path,
    config: &ProjectConfig,
    yes: bool,
    force: bool,
    report: Option<&Path>,
) -> Result<(), RestampError> {
    let marker = marker_path(config_path);
    if let Some(version) = read_marker(&marker) {
        if !force {
            println!(
                "{} upgrade already completed at version {}; re-run with {} to override",
                "✓".bright_green(),
                version.bright_yellow(),
                "--force".bright_cyan()
            );
            return Ok(());
        }
    }

    let session = build_session(config)?;
    println!("{}", session.preflight_summary());

    if !yes && !confirm("Proceed with the upgrade? [y/N] ")? {
        println!("Aborted. No store was modified.");
        return Ok(());
    }

    let started_at = Utc::now().to_rfc3339();
    let log = session.run();
    let finished_at = Utc::now().to_rfc3339();

    print_outcome(&log);

    if let Some(path) = report {
        let envelope = serde_json::json!({
            "report_version": "1.0.0",
            "session_id": Ulid::new().to_string(),
            "restamp_version": RESTAMP_VERSION,
            "started_at": started_at,
            "finished_at": finished_at,
            "log": log,
        });
        fs::write(path, serde_json::to_string_pretty(&envelope).unwrap())?;
        println!("Report written to: {}", path.display());
    }

    write_marker(&marker)?;
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, RestampError> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn print_outcome(log: &UpgradeLog) {
    println!();
    for (name, outcome) in &log.upgraded_validations_stores {
        print_outcome_line("store", name, outcome.updated.len(), outcome.had_exceptions);
    }
    for (name, outcome) in &log.upgraded_docs_sites {
        print_outcome_line("site", name, outcome.updated.len(), outcome.had_exceptions);
    }
    if log.exceptions.is_empty() {
        println!("{} upgrade finished with no exceptions", "✓".bright_green());
    } else {
        println!(
            "{} upgrade finished with {} exception(s); see the report for details",
            "!".bright_yellow().bold(),
            log.exceptions.len()
        );
    }
}

fn print_outcome_line(kind: &str, name: &str, updated: usize, had_exceptions: bool) {
    let status = if had_exceptions {
        "exceptions".bright_yellow()
    } else {
        "clean".bright_green()
    };
    println!(
        "  {} {} {}: {} key(s) updated [{}]",
        "●".bright_cyan(),
        kind,
        name.bright_white(),
        updated,
        status
    );
}

fn marker_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(MARKER_FILE)
}

fn read_marker(marker: &Path) -> Option<String> {
    fs::read_to_string(marker)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|version| !version.is_empty())
}

fn write_marker(marker: &Path) -> Result<(), RestampError> {
    if let Some(parent) = marker.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(marker, RESTAMP_VERSION)?;
    Ok(())
}

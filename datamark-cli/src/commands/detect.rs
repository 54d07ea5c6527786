//! Detect command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use datamark_core::{DetectionReport, MarkingConfig, Scheme, SchemeRecord};
use tracing::info;

use super::{marking_config, table_options};
use crate::config::Config;
use crate::table::{Table, TableOptions};
use crate::utils::{format_timestamp, load_record};
use crate::{SchemeArgs, TableArgs};

/// Candidates listed under the verdict.
const NEAREST_SHOWN: usize = 3;

/// Execute the detect command.
pub fn execute(
    data: PathBuf,
    record: Option<PathBuf>,
    json: bool,
    scheme_args: &SchemeArgs,
    table_args: &TableArgs,
    quiet: bool,
) -> Result<()> {
    let config = Config::from_env().with_args(scheme_args);
    let key = config.secret_key()?;

    let record = record.as_deref().map(load_record).transpose()?;

    // A wrong key is indistinguishable from an unmarked copy: no suspect.
    let (marking, recipients, options) = match &record {
        Some(record) => {
            info!(
                recipient = record.recipient,
                created = %format_timestamp(record.created_at),
                "Replaying scheme record"
            );
            (
                record.marking_config()?,
                record.recipients,
                record_table_options(record, &config, table_args),
            )
        }
        None => {
            info!("No scheme record given; using scheme parameters from flags and environment");
            let marking: MarkingConfig = marking_config(config.params()?, table_args)?;
            (marking, config.recipients, table_options(&config, table_args))
        }
    };

    let table = Table::read(&data, &options)?;
    let scheme = Scheme::new(marking, recipients)?;
    let report = scheme
        .detect(&table.dataset, &key)
        .context("Fingerprint detection failed")?;

    if json {
        print_json(&report)?;
    } else if !quiet {
        print_report(&report, record.as_ref());
    }

    Ok(())
}

/// The record fixes the key columns and label dictionaries; a `--primary-key`
/// flag still wins for copies whose key column was renamed.
fn record_table_options(record: &SchemeRecord, config: &Config, args: &TableArgs) -> TableOptions {
    TableOptions {
        primary_key: args
            .primary_key
            .clone()
            .or_else(|| record.primary_key.clone())
            .unwrap_or_else(|| config.primary_key.clone()),
        target: record.target.clone(),
        categories: record.categories.clone(),
    }
}

fn print_json(report: &DetectionReport) -> Result<()> {
    let votes: Vec<[u64; 2]> = (0..report.votes.len())
        .filter_map(|position| report.votes.counts(position))
        .map(|(v0, v1)| [v0, v1])
        .collect();
    let output = serde_json::json!({
        "suspect": report.suspect,
        "template": report.template.to_string(),
        "unknown": report.template.unknown_count(),
        "rows": report.stats.rows,
        "selected": report.stats.selected,
        "abstained": report.stats.abstained,
        "exact_matches": report.exact_matches(),
        "ranking": report.ranking,
        "votes": votes,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_report(report: &DetectionReport, record: Option<&SchemeRecord>) {
    println!();
    match report.suspect {
        Some(recipient) => {
            println!("{}", "╔════════════════════════════════════════╗".red());
            println!(
                "{}",
                "║            LEAK ATTRIBUTED             ║".red().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".red());
            println!();
            println!(
                "   {} {}",
                "Suspect:".dimmed(),
                recipient.to_string().red().bold()
            );
        }
        None => {
            println!("{}", "╔════════════════════════════════════════╗".yellow());
            println!(
                "{}",
                "║             NO ONE SUSPECTED           ║".yellow().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".yellow());
            println!();
            let exact = report.exact_matches();
            if exact.len() > 1 {
                println!(
                    "   {} {:?}",
                    "Ambiguous, matches:".dimmed(),
                    exact
                );
            }
        }
    }

    println!("   {} {}", "Template:".dimmed(), report.template);
    println!(
        "   {} {} of {}",
        "Unknown bits:".dimmed(),
        report.template.unknown_count(),
        report.template.len()
    );
    println!(
        "   {} {} selected of {} ({} abstained)",
        "Rows:".dimmed(),
        report.stats.selected,
        report.stats.rows,
        report.stats.abstained
    );
    if let Some(record) = record {
        println!(
            "   {} recipient {} on {}",
            "Record:".dimmed(),
            record.recipient,
            format_timestamp(record.created_at)
        );
    }

    if !report.ranking.is_empty() {
        println!();
        println!("   {}", "Nearest candidates:".dimmed());
        for score in report.ranking.iter().take(NEAREST_SHOWN) {
            let line = format!(
                "     #{:<4} {} of {} positions disagree",
                score.recipient, score.disagreements, score.compared
            );
            if score.is_exact() {
                println!("{}", line.green());
            } else {
                println!("{line}");
            }
        }
    }
}

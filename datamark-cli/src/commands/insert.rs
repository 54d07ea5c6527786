//! Insert command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use datamark_core::{RecordFormat, Scheme, SchemeRecord};
use tracing::info;

use super::{marking_config, table_options};
use crate::config::Config;
use crate::table::Table;
use crate::utils::{build_output_path, unix_now};
use crate::{SchemeArgs, TableArgs};

/// Execute the insert command.
///
/// The scheme record is only written when the owner asks for one; it names
/// the recipient and the marked columns, so it never lands beside the copy
/// by default.
pub fn execute(
    data: PathBuf,
    recipient: u32,
    output: Option<PathBuf>,
    record: Option<(PathBuf, RecordFormat)>,
    scheme_args: &SchemeArgs,
    table_args: &TableArgs,
    quiet: bool,
) -> Result<()> {
    let config = Config::from_env().with_args(scheme_args);
    let key = config.secret_key()?;
    let params = config.params()?;

    let table = Table::read(&data, &table_options(&config, table_args))?;
    info!(
        path = %data.display(),
        rows = table.dataset.len(),
        columns = table.dataset.schema().len(),
        "Read table"
    );

    let scheme = Scheme::new(marking_config(params, table_args)?, config.recipients)?;
    let outcome = scheme
        .insert(&table.dataset, recipient, &key)
        .context("Fingerprint insertion failed")?;

    let output = output.unwrap_or_else(|| {
        build_output_path(&data, params.gamma, params.fingerprint_length, recipient)
    });
    if let Some((record_path, _)) = &record {
        if *record_path == output || *record_path == data {
            bail!(
                "Invalid option: --record must not overwrite a table ({})",
                record_path.display()
            );
        }
    }
    table.write(&outcome.dataset, &output)?;
    info!(path = %output.display(), "Wrote fingerprinted table");

    let columns = scheme
        .config()
        .selection
        .resolve(table.dataset.schema())?
        .names()
        .join(", ");
    let record_path = match record {
        Some((path, format)) => {
            let record = SchemeRecord::new(
                scheme.config(),
                scheme.recipients(),
                recipient,
                &table.dataset,
                outcome.metrics.clone(),
                unix_now(),
            )?
            .with_categories(table.categories());
            let bytes = record
                .encode(format)
                .context("Failed to serialize scheme record")?;
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write record: {}", path.display()))?;
            info!(
                path = %path.display(),
                format = ?format,
                bytes = bytes.len(),
                "Wrote scheme record"
            );
            Some(path)
        }
        None => None,
    };

    if !quiet {
        let metrics = &outcome.metrics;
        println!();
        println!("{}", "╔════════════════════════════════════════╗".green());
        println!(
            "{}",
            "║         FINGERPRINT INSERTED           ║".green().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".green());
        println!();
        println!("   {} {}", "Recipient:".dimmed(), recipient);
        println!(
            "   {} {} of {} ({:.2}%)",
            "Rows marked:".dimmed(),
            metrics.marked,
            metrics.rows,
            metrics.marked_ratio() * 100.0
        );
        println!(
            "   {} {:.2}",
            "Marks per bit:".dimmed(),
            metrics.mean_embeddings_per_bit()
        );
        if metrics.skipped() > 0 {
            println!(
                "   {} {}",
                "Skipped cells:".dimmed(),
                metrics.skipped().to_string().yellow()
            );
        }
        println!(
            "   {} {}",
            "Columns:".dimmed(),
            columns
        );
        println!("   {} {}", "Output:".dimmed(), output.display());
        if let Some(path) = &record_path {
            println!("   {} {}", "Record:".dimmed(), path.display());
        }
    }

    Ok(())
}

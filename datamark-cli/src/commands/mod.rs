//! Command implementations.

pub mod detect;
pub mod fingerprint;
pub mod insert;

use anyhow::{Context, Result};
use datamark_core::{AttributeWeights, ColumnSelection, EmbeddingParams, MarkingConfig};

use crate::config::Config;
use crate::table::TableOptions;
use crate::TableArgs;

/// Marking configuration from command-line column options.
pub(crate) fn marking_config(params: EmbeddingParams, args: &TableArgs) -> Result<MarkingConfig> {
    let selection = if !args.include.is_empty() {
        ColumnSelection::Include(args.include.clone())
    } else if !args.exclude.is_empty() {
        ColumnSelection::Exclude(args.exclude.clone())
    } else {
        ColumnSelection::All
    };
    let mut config = MarkingConfig::new(params).with_selection(selection);
    if !args.weights.is_empty() {
        let weights = AttributeWeights::new(args.weights.clone())
            .context("Invalid option: --weights")?;
        config = config.with_weights(weights);
    }
    Ok(config)
}

/// Table options from the environment and command-line flags.
pub(crate) fn table_options(config: &Config, args: &TableArgs) -> TableOptions {
    TableOptions {
        primary_key: args
            .primary_key
            .clone()
            .unwrap_or_else(|| config.primary_key.clone()),
        target: args.target.clone(),
        ..TableOptions::default()
    }
}

//! Fingerprint command implementation.

use anyhow::Result;
use colored::Colorize;
use datamark_core::{MarkingConfig, Scheme};

use crate::config::Config;
use crate::SchemeArgs;

/// Execute the fingerprint command.
pub fn execute(recipient: u32, scheme_args: &SchemeArgs, quiet: bool) -> Result<()> {
    let config = Config::from_env().with_args(scheme_args);
    let key = config.secret_key()?;
    let scheme = Scheme::new(MarkingConfig::new(config.params()?), config.recipients)?;
    let fingerprint = scheme.fingerprint(&key, recipient)?;

    if quiet {
        println!("{fingerprint}");
    } else {
        println!(
            "{} {} of {} ({} bits)",
            "Recipient".dimmed(),
            recipient,
            config.recipients,
            fingerprint.len()
        );
        println!("{}", fingerprint.to_string().cyan());
    }
    Ok(())
}

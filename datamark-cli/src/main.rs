//! Datamark CLI - dataset fingerprinting and traitor tracing tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use datamark_core::RecordFormat;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod exit_codes;
mod table;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success (including detection runs that name no suspect)
  1   General error
  64  Usage error (invalid option, parameter or missing key)
  65  Data error (malformed table or record, unsupported scheme version)
  66  Input file missing or unreadable
  73  Cannot create output file
  74  I/O error while writing output

Environment:
  DATAMARK_SECRET_KEY, DATAMARK_GAMMA, DATAMARK_XI, DATAMARK_FINGERPRINT_LENGTH,
  DATAMARK_RECIPIENTS, DATAMARK_PRIMARY_KEY provide defaults for the flags.
  RUST_LOG overrides the log filter.";

#[derive(Parser)]
#[command(name = "datamark")]
#[command(author, version, about = "Fingerprint relational datasets and trace leaked copies", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Only print essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Scheme record encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Cbor,
}

impl From<OutputFormat> for RecordFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => RecordFormat::Json,
            OutputFormat::Cbor => RecordFormat::Cbor,
        }
    }
}

/// Scheme parameters shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct SchemeArgs {
    /// Owner secret key (default: $DATAMARK_SECRET_KEY)
    #[arg(short, long, value_name = "KEY")]
    pub key: Option<u64>,

    /// Inverse marking density: about one row in GAMMA carries a bit (default: 10)
    #[arg(long)]
    pub gamma: Option<u32>,

    /// Number of low-order bits eligible for marking (default: 1)
    #[arg(long)]
    pub xi: Option<u32>,

    /// Fingerprint length in bits (default: 96)
    #[arg(short = 'L', long)]
    pub length: Option<usize>,

    /// Total number of recipients (default: 10)
    #[arg(short = 'n', long)]
    pub recipients: Option<u32>,
}

/// How to read the table and which columns may carry marks.
#[derive(Args, Debug, Clone, Default)]
pub struct TableArgs {
    /// Primary key column (default: "id")
    #[arg(long, value_name = "COLUMN")]
    pub primary_key: Option<String>,

    /// Target (label) column, never marked
    #[arg(long, value_name = "COLUMN")]
    pub target: Option<String>,

    /// Columns that must not be marked (comma-separated)
    #[arg(long, value_name = "COLUMNS", value_delimiter = ',', conflicts_with = "include")]
    pub exclude: Vec<String>,

    /// Only mark these columns, in this order (comma-separated)
    #[arg(long, value_name = "COLUMNS", value_delimiter = ',')]
    pub include: Vec<String>,

    /// Per-column weights; higher weight means marked less often (comma-separated)
    #[arg(long, value_name = "WEIGHTS", value_delimiter = ',')]
    pub weights: Vec<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a recipient's fingerprint into a CSV table
    Insert {
        /// Path to the CSV table
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Recipient receiving this copy
        #[arg(short, long)]
        recipient: u32,

        /// Output path (defaults to <DATA stem>_fp_<gamma>_<length>_<recipient>.csv)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write the owner's scheme record here; keep it apart from the copy
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,

        /// Encoding of the scheme record
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[command(flatten)]
        scheme: SchemeArgs,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Recover the fingerprint of a suspect copy and name its recipient
    Detect {
        /// Path to the suspect CSV table
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Owner's scheme record from insertion (replaces the scheme flags)
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,

        /// Print a machine-readable JSON report
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        scheme: SchemeArgs,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Print the fingerprint assigned to a recipient
    Fingerprint {
        /// Recipient id
        #[arg(short, long)]
        recipient: u32,

        #[command(flatten)]
        scheme: SchemeArgs,
    },
}

fn init_tracing(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Insert {
            data,
            recipient,
            output,
            record,
            format,
            scheme,
            table,
        } => {
            let record = record.map(|path| (path, RecordFormat::from(format)));
            commands::insert::execute(data, recipient, output, record, &scheme, &table, quiet)
        }
        Commands::Detect {
            data,
            record,
            json,
            scheme,
            table,
        } => commands::detect::execute(data, record, json, &scheme, &table, quiet),
        Commands::Fingerprint { recipient, scheme } => {
            commands::fingerprint::execute(recipient, &scheme, quiet)
        }
    };

    let exit = match result {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };
    if let Some(message) = &exit.message {
        eprintln!("{} {}", "error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}

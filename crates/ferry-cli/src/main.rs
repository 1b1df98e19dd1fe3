//! ferry command-line interface
//!
//! Moves tables in and out of SQL databases in parallel chunks.
//!
//! # Usage
//!
//! ```bash
//! # Chunked query, decoded, as JSON
//! ferry --config conn.toml query "SELECT * FROM events" --format json
//!
//! # Raw statement
//! ferry -b sqlite -d ./local.db execute "CREATE INDEX idx ON events (id)"
//!
//! # Copy a table into another database
//! ferry --config prod.toml copy events --to local.toml --replace
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use ferry_common::config::{ClassifyMode, TagSource, TransferOptions};
use ferry_common::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_WORKERS};
use ferry_engine::Ferry;

mod commands;
mod config;
mod formatter;

use config::ConnectionArgs;
use formatter::OutputFormat;

/// ferry command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "ferry",
    version,
    about = "Chunked parallel table transfer for SQL databases",
    long_about = "Moves tables between SQL databases in parallel chunks.\n\n\
                  Binary and structured columns are encoded to text on the way in\n\
                  and decoded on the way out."
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(flatten)]
    transfer: TransferArgs,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Chunking and codec flags.
#[derive(Args, Debug)]
struct TransferArgs {
    /// Rows per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, env = "FERRY_CHUNK_SIZE")]
    chunk_size: usize,

    /// Concurrent workers per phase
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS, env = "FERRY_WORKERS")]
    workers: usize,

    /// Scan whole columns when classifying instead of the first value
    #[arg(long)]
    strict: bool,

    /// Record and read column tags in the sidecar tag table
    #[arg(long)]
    sidecar: bool,
}

impl TransferArgs {
    fn options(&self) -> TransferOptions {
        TransferOptions::new()
            .chunk_size(self.chunk_size)
            .max_workers(self.workers)
            .classify_mode(if self.strict {
                ClassifyMode::Strict
            } else {
                ClassifyMode::Sample
            })
            .tag_source(if self.sidecar {
                TagSource::Sidecar
            } else {
                TagSource::Sniff
            })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simple SELECT in parallel chunks and decode the result
    Query {
        /// SELECT statement (table, column list and WHERE are honored)
        sql: String,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value = "table")]
        format: OutputFormatArg,
    },

    /// Execute a raw SQL statement
    Execute {
        /// SQL statement
        sql: String,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value = "table")]
        format: OutputFormatArg,
    },

    /// Count rows in a table
    Count {
        /// Table name
        table: String,

        /// Row filter (SQL condition)
        #[arg(long = "where", value_name = "CONDITION")]
        condition: Option<String>,
    },

    /// Drop a table if it exists
    Drop {
        /// Table name
        table: String,
    },

    /// Copy a table into another database
    Copy {
        /// Source table name
        table: String,

        /// Destination connection file (TOML)
        #[arg(long, value_name = "FILE")]
        to: PathBuf,

        /// Destination table name (defaults to the source name)
        #[arg(long)]
        dest_table: Option<String>,

        /// Replace the destination table's schema before writing
        #[arg(long)]
        replace: bool,
    },
}

/// Output format argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Display results in a formatted table
    Table,
    /// Display results as JSON
    Json,
    /// Display results as CSV
    Csv,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Csv => OutputFormat::Csv,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let options = cli.transfer.options();
    options.validate()?;

    let config = cli.connection.resolve()?;
    let ferry = Ferry::connect(&config)
        .with_context(|| format!("cannot connect to {}", config.connection_url()))?;

    let output = match &cli.command {
        Command::Query { sql, format } => commands::query(&ferry, sql, &options, (*format).into())?,
        Command::Execute { sql, format } => commands::execute(&ferry, sql, (*format).into())?,
        Command::Count { table, condition } => {
            commands::count(&ferry, table, condition.as_deref())?
        }
        Command::Drop { table } => commands::drop(&ferry, table)?,
        Command::Copy {
            table,
            to,
            dest_table,
            replace,
        } => commands::copy(
            &ferry,
            table,
            to,
            dest_table.as_deref(),
            &options.clone().table_replace(*replace),
        )?,
    };

    println!("{}", output);
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ferry_cli=debug,ferry_engine=debug,ferry_backend=debug,ferry_exec=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("ferry_cli=warn,ferry_engine=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

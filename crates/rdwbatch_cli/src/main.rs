//! rdwbatch CLI
//!
//! Command-line tools for RDW-framed record datasets.
//!
//! # Commands
//!
//! - `dump` - Print records starting at a record number
//! - `count` - Count the records in a dataset
//! - `verify` - Check every frame header in a dataset
//! - `truncate` - Cut a dataset back to its first N records
//! - `copy` - Copy records through a restartable, skip-tolerant step
//!
//! Dataset options can come from a properties file (`--properties`) using
//! the same keys as the library (`FILE_NAME`, `RECORD_LENGTH`, ...).
//! Command-line flags override the file.

mod commands;

use clap::{Parser, Subcommand};
use commands::DatasetArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tools for RDW-framed fixed-length record datasets.
#[derive(Parser)]
#[command(name = "rdwbatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Properties file with dataset and step options
    #[arg(global = true, short, long)]
    properties: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print records starting at a record number
    Dump {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// First record to print
        #[arg(long, default_value = "0")]
        from: u64,

        /// Maximum number of records to print
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Count the records in a dataset
    Count {
        #[command(flatten)]
        dataset: DatasetArgs,
    },

    /// Check every frame header in a dataset
    Verify {
        #[command(flatten)]
        dataset: DatasetArgs,
    },

    /// Cut a dataset back to its first N records
    Truncate {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Number of records to keep
        #[arg(long)]
        at: u64,
    },

    /// Copy records through a restartable, skip-tolerant step
    Copy {
        #[command(flatten)]
        args: commands::copy::CopyArgs,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let properties = commands::load_properties(cli.properties.as_deref())?;

    match cli.command {
        Commands::Dump {
            dataset,
            from,
            limit,
            format,
        } => {
            let config = dataset.stream_config(&properties)?;
            commands::dump::run(&config, from, limit, &format)?;
        }
        Commands::Count { dataset } => {
            let config = dataset.stream_config(&properties)?;
            commands::count::run(&config)?;
        }
        Commands::Verify { dataset } => {
            let config = dataset.stream_config(&properties)?;
            commands::verify::run(&config)?;
        }
        Commands::Truncate { dataset, at } => {
            let config = dataset.stream_config(&properties)?;
            commands::truncate::run(&config, at)?;
        }
        Commands::Copy { args } => {
            commands::copy::run(&properties, &args)?;
        }
        Commands::Version => {
            println!("rdwbatch CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

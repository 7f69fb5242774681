//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fleet distance and fuel allocation.
///
/// Splits each vehicle's daily distance and fuel across the drivers and
/// shifts that produced them, and checks that every rollup adds back up to
/// the recorded totals.
#[derive(Debug, Parser)]
#[command(name = "fleet", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Allocate a company-period document and print the report.
    Allocate {
        /// JSON document with the period's work records and vehicle totals.
        input: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Exit with an error if any group failed to allocate.
        #[arg(long)]
        strict: bool,
    },

    /// Show the configured shift buckets.
    Shifts {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Normalize a single start/end pair.
    Normalize {
        /// Calendar day the record was filed under (dd/mm/yyyy or yyyy-mm-dd).
        #[arg(long)]
        day: String,

        /// Start time, in any supported format.
        #[arg(long)]
        start: String,

        /// End time, in any supported format.
        #[arg(long)]
        end: String,
    },

    /// Distribute a total across weighted members.
    Distribute {
        /// Amount to distribute.
        #[arg(long)]
        total: f64,

        /// Decimal places (defaults to the configured precision).
        #[arg(long)]
        precision: Option<u32>,

        /// Members as ID=WEIGHT pairs, e.g. `004521=480`.
        #[arg(required = true)]
        members: Vec<String>,
    },
}

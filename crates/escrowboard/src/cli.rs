//! Command-line surface of `eb`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use escrowboard_core::Granularity;
use escrowboard_core::config::LogFormat;

/// eb - construction escrow funds, jobs and trust scores
///
/// Reads the escrow API when it is reachable and synthesizes a faithful
/// funds series from the year-to-date totals when it is not.
#[derive(Parser, Debug)]
#[command(name = "eb")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path (default: $ESCROWBOARD_CONFIG, then the
    /// platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// API base URL, overriding config and ESCROWBOARD_API_URL
    #[arg(long, global = true, value_name = "URL")]
    pub api: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log format for stderr
    #[arg(long, global = true, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Spread year-to-date totals over chart periods (no network)
    Series {
        /// Secured year-to-date total, whole currency units
        #[arg(long, allow_negative_numbers = true)]
        secured: f64,

        /// Released year-to-date total, whole currency units
        #[arg(long, allow_negative_numbers = true)]
        released: f64,

        /// month, quarter, year or fytd
        #[arg(long, short, default_value_t = Granularity::Month)]
        granularity: Granularity,

        /// Last year shown by yearly series (default: current year)
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=9999))]
        year: Option<i32>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },

    /// Funds chart: live series when available, synthetic otherwise
    Funds {
        /// month, quarter, year or fytd
        #[arg(long, short, default_value_t = Granularity::Month)]
        granularity: Granularity,

        /// Never touch the network; requires --secured and --released
        #[arg(long, requires_all = ["secured", "released"])]
        offline: bool,

        /// Secured total to chart instead of the API summary
        #[arg(long, allow_negative_numbers = true)]
        secured: Option<f64>,

        /// Released total to chart instead of the API summary
        #[arg(long, allow_negative_numbers = true)]
        released: Option<f64>,

        /// Last year shown by yearly series (default: current year)
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=9999))]
        year: Option<i32>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },

    /// List jobs
    Jobs {
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },

    /// Dashboard KPIs and pipeline
    Summary {
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },

    /// Trust score, tier and open issues for a job
    Trust {
        /// Job identifier
        job_id: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config {
        #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
}

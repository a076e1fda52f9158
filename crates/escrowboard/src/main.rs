//! eb - escrowboard CLI
//!
//! Thin wrapper over `escrowboard-core`: parse arguments, load config, set up
//! logging, run one command, print its result to stdout.

#![forbid(unsafe_code)]

mod cli;
mod output;

use std::process::ExitCode;

use anyhow::{Context, bail};
use chrono::Datelike;
use clap::Parser;
use escrowboard_core::client::ApiClient;
use escrowboard_core::config::Config;
use escrowboard_core::dashboard::DashboardKpis;
use escrowboard_core::error::format_error_with_remediation;
use escrowboard_core::funds_feed::{FeedState, FundsFeed, FundsRequest};
use escrowboard_core::logging::{LogError, init_logging};
use escrowboard_core::{Granularity, PeriodAllocator};
use tracing::{debug, warn};

use crate::cli::{Cli, Commands, ConfigFormat, OutputFormat};
use crate::output::{FundsReport, SummaryReport, TrustReport};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<escrowboard_core::Error>() {
        Some(core) => format_error_with_remediation(core),
        None => format!("Error: {err:#}"),
    }
}

/// Convert a core-layer error into the crate-wide error so it renders with
/// remediation guidance.
fn core<T, E>(result: Result<T, E>) -> anyhow::Result<T>
where
    E: Into<escrowboard_core::Error>,
{
    result.map_err(|e| anyhow::Error::new(e.into()))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = core(Config::load(cli.config.as_deref()))?;
    if let Some(api) = &cli.api {
        config.api.base_url.clone_from(api);
    }
    if let Some(level) = &cli.log_level {
        config.general.log_level.clone_from(level);
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    core(config.validate())?;

    match init_logging(&config.log_config()) {
        Ok(()) | Err(LogError::AlreadyInitialized) => {}
        Err(err) => return Err(err).context("failed to initialize logging"),
    }
    debug!(command = ?cli.command, "Running command");

    match cli.command {
        Commands::Series {
            secured,
            released,
            granularity,
            year,
            format,
        } => {
            let allocator = PeriodAllocator::new(config.allocator.clone(), anchor_year(year));
            let series = core(allocator.allocate(secured, released, granularity))?;
            match format {
                OutputFormat::Plain => print!("{}", output::series_table(&series)),
                OutputFormat::Json => println!("{}", output::to_json(&series)?),
            }
        }

        Commands::Funds {
            granularity,
            offline,
            secured,
            released,
            year,
            format,
        } => {
            let client = if offline {
                None
            } else {
                Some(core(ApiClient::from_config(&config.api))?)
            };
            let request = funds_request(client.as_ref(), granularity, secured, released).await;

            let allocator = PeriodAllocator::new(config.allocator.clone(), anchor_year(year));
            let mut feed = FundsFeed::new(allocator, config.api.fetch_enabled && !offline, request);
            feed.load(client.as_ref(), request).await;

            if let FeedState::Error { message } = feed.state() {
                bail!("cannot chart funds: {message}");
            }
            let Some(report) = FundsReport::from_state(
                feed.state(),
                request.secured_total,
                request.released_total,
            ) else {
                bail!("funds feed did not settle");
            };
            match format {
                OutputFormat::Plain => print!("{}", output::funds_plain(&report)),
                OutputFormat::Json => println!("{}", output::to_json(&report)?),
            }
        }

        Commands::Jobs { format } => {
            let client = core(ApiClient::from_config(&config.api))?;
            let jobs = core(client.fetch_jobs().await)?;
            match format {
                OutputFormat::Plain => print!("{}", output::jobs_plain(&jobs)),
                OutputFormat::Json => println!("{}", output::to_json(&jobs)?),
            }
        }

        Commands::Summary { format } => {
            let client = core(ApiClient::from_config(&config.api))?;
            let (summary, jobs) = tokio::join!(client.fetch_summary(), client.fetch_jobs());
            let summary = core(summary)?;
            let jobs = core(jobs)?;

            let kpis = DashboardKpis::compute(Some(&summary), &jobs);
            let report = SummaryReport {
                kpis,
                pipeline: kpis.pipeline_rows(),
            };
            match format {
                OutputFormat::Plain => print!("{}", output::summary_plain(&report)),
                OutputFormat::Json => println!("{}", output::to_json(&report)?),
            }
        }

        Commands::Trust { job_id, format } => {
            let client = core(ApiClient::from_config(&config.api))?;
            let trust = core(client.fetch_trust(&job_id).await)?;
            let report = TrustReport::new(&job_id, &trust);
            match format {
                OutputFormat::Plain => print!("{}", output::trust_plain(&report)),
                OutputFormat::Json => println!("{}", output::to_json(&report)?),
            }
        }

        Commands::Config { format } => match format {
            ConfigFormat::Toml => print!("{}", core(config.to_toml_string())?),
            ConfigFormat::Json => println!("{}", output::to_json(&config)?),
        },
    }

    Ok(())
}

fn anchor_year(explicit: Option<i32>) -> i32 {
    explicit.unwrap_or_else(|| chrono::Local::now().year())
}

/// Chart totals: explicit values win; otherwise the API summary, or zeros
/// when it cannot be read.
async fn funds_request(
    client: Option<&ApiClient>,
    granularity: Granularity,
    secured: Option<f64>,
    released: Option<f64>,
) -> FundsRequest {
    let summary = match (secured, released, client) {
        (Some(_), Some(_), _) | (_, _, None) => None,
        (_, _, Some(client)) => match client.fetch_summary().await {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(error = %err, "Funds summary unavailable; charting zero totals");
                None
            }
        },
    };

    let from_summary = DashboardKpis::compute(summary.as_ref(), &[]).funds_request(granularity);
    FundsRequest::new(
        granularity,
        secured.unwrap_or(from_summary.secured_total),
        released.unwrap_or(from_summary.released_total),
    )
}

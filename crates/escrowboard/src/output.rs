//! Plain-text and JSON rendering for command results.
//!
//! JSON output is a single document on stdout. Plain output never contains
//! ANSI escapes.

use std::fmt::Write;

use escrowboard_core::api::Job;
use escrowboard_core::dashboard::{DashboardKpis, PipelineRow};
use escrowboard_core::format::{money, money_k, plural};
use escrowboard_core::funds_feed::{FallbackReason, FeedState, FeedStateKind};
use escrowboard_core::trust::{TrustIssue, TrustScore};
use escrowboard_core::{PeriodPoint, PeriodSeries};
use serde::Serialize;

/// `eb funds --format json` document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundsReport<'a> {
    pub state: FeedStateKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a FallbackReason>,
    pub secured_total: f64,
    pub released_total: f64,
    pub series: &'a PeriodSeries,
}

impl<'a> FundsReport<'a> {
    /// `None` when the feed holds no series (allocator rejection).
    pub fn from_state(state: &'a FeedState, secured_total: f64, released_total: f64) -> Option<Self> {
        let (series, reason) = match state {
            FeedState::Live { series } => (series, None),
            FeedState::Fallback { series, reason } => (series, Some(reason)),
            FeedState::Loading { .. } | FeedState::Error { .. } => return None,
        };
        Some(Self {
            state: state.kind(),
            reason,
            secured_total,
            released_total,
            series,
        })
    }
}

/// `eb summary --format json` document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub kpis: DashboardKpis,
    pub pipeline: Vec<PipelineRow>,
}

/// `eb trust --format json` document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustReport<'a> {
    pub job_id: &'a str,
    pub score: f64,
    pub tier: String,
    pub discount_percent: u32,
    pub issues: Vec<TrustIssue>,
    pub total_issues: u32,
}

impl<'a> TrustReport<'a> {
    pub fn new(job_id: &'a str, trust: &TrustScore) -> Self {
        Self {
            job_id,
            score: trust.clamped_score(),
            tier: trust.tier_label(),
            discount_percent: trust.discount_percent(),
            issues: trust.breakdown.issues(),
            total_issues: trust.breakdown.total_issues(),
        }
    }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn series_table(series: &PeriodSeries) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({})",
        series.granularity.description(),
        series.source
    );
    let _ = writeln!(
        out,
        "{:<8} {:>14} {:>14} {:>16} {:>16}",
        "Period", "Secured", "Released", "Secured (cum)", "Released (cum)"
    );
    for point in &series.points {
        out.push_str(&series_row(point));
        out.push('\n');
    }
    if let Some(peak) = series
        .points
        .iter()
        .filter(|p| p.secured_in_period > 0)
        .max_by_key(|p| p.secured_in_period)
    {
        let _ = writeln!(
            out,
            "Peak secured: {} in {}",
            money_k(peak.secured_in_period as f64),
            peak.label
        );
    }
    out
}

fn series_row(point: &PeriodPoint) -> String {
    format!(
        "{:<8} {:>14} {:>14} {:>16} {:>16}",
        point.label,
        money(point.secured_in_period as f64),
        money(point.released_in_period as f64),
        money(point.secured_cumulative as f64),
        money(point.released_cumulative as f64),
    )
}

pub fn funds_plain(report: &FundsReport<'_>) -> String {
    let mut out = String::new();
    let status = match report.reason {
        Some(reason) => format!("{} ({reason})", report.state),
        None => report.state.to_string(),
    };
    let _ = writeln!(out, "Funds: {status}");
    let _ = writeln!(
        out,
        "Totals: secured {} / released {}",
        money(report.secured_total),
        money(report.released_total)
    );
    out.push_str(&series_table(report.series));
    out
}

pub fn jobs_plain(jobs: &[Job]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<28} {:<20} {:<12} {:>14}",
        "ID", "Title", "Client", "Status", "Value"
    );
    for job in jobs {
        let _ = writeln!(
            out,
            "{:<12} {:<28} {:<20} {:<12} {:>14}",
            job.id,
            job.title,
            job.client,
            job.status,
            money(job.value)
        );
    }
    let total: f64 = jobs
        .iter()
        .map(|j| if j.value.is_finite() { j.value } else { 0.0 })
        .sum();
    let _ = writeln!(out, "{}, total {}", plural(jobs.len(), "job"), money(total));
    out
}

pub fn summary_plain(report: &SummaryReport) -> String {
    let kpis = &report.kpis;
    let mut out = String::new();
    let _ = writeln!(out, "Secured (FYTD):   {}", money(kpis.secured_total_fytd));
    let _ = writeln!(out, "Released (FYTD):  {}", money(kpis.released_fytd));
    let _ = writeln!(out, "Escrow balance:   {}", money(kpis.escrow_balance));
    let _ = writeln!(
        out,
        "Jobs won:         {} ({})",
        plural(kpis.jobs_won_count, "job"),
        money(kpis.jobs_won_total)
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Pipeline");
    for row in &report.pipeline {
        let bar = "#".repeat((row.bar_percent / 5).max(1) as usize);
        let _ = writeln!(
            out,
            "  {:<18} {:<20} {:>14}",
            row.label,
            bar,
            money(row.value)
        );
    }
    out
}

pub fn trust_plain(report: &TrustReport<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Job {}", report.job_id);
    let _ = writeln!(out, "Score:    {:.0}/100", report.score);
    let _ = writeln!(out, "Tier:     {}", report.tier);
    let _ = writeln!(out, "Discount: {}%", report.discount_percent);
    if report.total_issues == 0 {
        let _ = writeln!(out, "No open issues");
    } else {
        let _ = writeln!(out, "Needs attention:");
        for issue in report.issues.iter().filter(|i| i.count > 0) {
            let _ = writeln!(out, "  - {}", issue.summary);
        }
    }
    out
}

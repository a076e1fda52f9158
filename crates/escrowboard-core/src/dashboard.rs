//! Builder dashboard figures derived from the jobs list and summary.

use serde::Serialize;
use tracing::warn;

use crate::api::{Job, JobsSummary};
use crate::funds_feed::FundsRequest;
use crate::period::Granularity;

/// Narrowest bar drawn for a pipeline row, in percent.
pub const MIN_BAR_PERCENT: u32 = 6;

/// Headline figures for the builder dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardKpis {
    pub released_fytd: f64,
    /// Secured and invoiced, awaiting release.
    pub secured_invoiced_fytd: f64,
    /// Released plus secured-invoiced.
    pub secured_total_fytd: f64,
    pub escrow_balance: f64,
    pub jobs_won_count: usize,
    pub jobs_won_total: f64,
}

/// One bar of the pipeline card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRow {
    pub label: &'static str,
    pub value: f64,
    /// Bar width relative to the largest row, never below [`MIN_BAR_PERCENT`].
    pub bar_percent: u32,
}

impl DashboardKpis {
    /// A missing summary counts as all zeros.
    #[must_use]
    pub fn compute(summary: Option<&JobsSummary>, jobs: &[Job]) -> Self {
        let summary = summary.copied().unwrap_or_default();
        let released = finite_or_zero(summary.released_funds);
        let secured_invoiced = finite_or_zero(summary.secured_funds);

        Self {
            released_fytd: released,
            secured_invoiced_fytd: secured_invoiced,
            secured_total_fytd: released + secured_invoiced,
            escrow_balance: finite_or_zero(summary.funds_in_escrow),
            jobs_won_count: jobs.len(),
            jobs_won_total: jobs.iter().map(|j| finite_or_zero(j.value)).sum(),
        }
    }

    #[must_use]
    pub fn pipeline_rows(&self) -> Vec<PipelineRow> {
        let values = [
            ("Secured (FYTD)", self.secured_total_fytd),
            ("Upcoming Releases", self.secured_invoiced_fytd),
            ("Released (FYTD)", self.released_fytd),
        ];
        let max = values.iter().map(|(_, v)| *v).fold(1.0, f64::max);

        values
            .into_iter()
            .map(|(label, value)| PipelineRow {
                label,
                value,
                bar_percent: bar_percent(value, max),
            })
            .collect()
    }

    /// Funds chart request for these figures. Totals are rounded to whole
    /// units and negatives clamped to zero so the allocator accepts them.
    #[must_use]
    pub fn funds_request(&self, granularity: Granularity) -> FundsRequest {
        FundsRequest::new(
            granularity,
            chart_total("secured", self.secured_total_fytd),
            chart_total("released", self.released_fytd),
        )
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn bar_percent(value: f64, max: f64) -> u32 {
    let pct = ((value / max) * 100.0 + 0.5).floor();
    if pct.is_finite() && pct > f64::from(MIN_BAR_PERCENT) {
        pct.min(100.0) as u32
    } else {
        MIN_BAR_PERCENT
    }
}

fn chart_total(field: &'static str, value: f64) -> f64 {
    let rounded = value.round();
    if rounded < 0.0 {
        warn!(field, value, "Negative funds total; charting zero");
        0.0
    } else {
        rounded
    }
}

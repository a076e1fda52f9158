//! Chart granularities and the labels of their periods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Short month names, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Quarter names; quarterly charts show two consecutive years.
pub const QUARTER_LABELS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

/// Labels of the two points in a snapshot series.
pub const SNAPSHOT_LABELS: [&str; 2] = ["Start", "Current"];

/// Anchor years yearly labels are built from; others are clamped into it.
pub const ANCHOR_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Bucketing unit for a funds series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Last 12 months.
    #[serde(alias = "monthly")]
    Month,
    /// Last 8 quarters.
    #[serde(alias = "quarterly")]
    Quarter,
    /// Last 5 calendar years.
    #[serde(alias = "yearly")]
    Year,
    /// Two-point year-to-date view: start and current totals.
    #[serde(rename = "fytd", alias = "snapshot")]
    Snapshot,
}

impl Granularity {
    /// Every granularity, in the order the dashboard offers them.
    pub const ALL: [Self; 4] = [Self::Month, Self::Quarter, Self::Year, Self::Snapshot];

    /// Wire name, as sent in `groupBy`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
            Self::Snapshot => "fytd",
        }
    }

    /// Number of points a series of this granularity holds.
    #[must_use]
    pub const fn period_count(self) -> usize {
        match self {
            Self::Month => 12,
            Self::Quarter => 8,
            Self::Year => 5,
            Self::Snapshot => 2,
        }
    }

    /// Length of the seasonal cycle in periods; `None` for snapshots.
    #[must_use]
    pub const fn cycle(self) -> Option<usize> {
        match self {
            Self::Month => Some(12),
            Self::Quarter => Some(4),
            Self::Year => Some(5),
            Self::Snapshot => None,
        }
    }

    #[must_use]
    pub const fn is_snapshot(self) -> bool {
        matches!(self, Self::Snapshot)
    }

    /// Chart heading for this view.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Month => "Monthly (last 12)",
            Self::Quarter => "Quarterly (last 8)",
            Self::Year => "Yearly (last 5)",
            Self::Snapshot => "FYTD snapshot",
        }
    }

    /// Period labels, oldest first.
    ///
    /// Yearly labels are the calendar years ending at `anchor_year`, clamped
    /// to [`ANCHOR_YEARS`]; the other granularities ignore it.
    #[must_use]
    pub fn labels(self, anchor_year: i32) -> Vec<String> {
        match self {
            Self::Month => MONTH_LABELS.iter().map(|m| (*m).to_string()).collect(),
            Self::Quarter => QUARTER_LABELS
                .iter()
                .cycle()
                .take(self.period_count())
                .map(|q| (*q).to_string())
                .collect(),
            Self::Year => {
                let span = self.period_count() as i32;
                let last = anchor_year.clamp(*ANCHOR_YEARS.start(), *ANCHOR_YEARS.end());
                (last - (span - 1)..=last).map(|y| y.to_string()).collect()
            }
            Self::Snapshot => SNAPSHOT_LABELS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" | "monthly" => Ok(Self::Month),
            "quarter" | "quarterly" => Ok(Self::Quarter),
            "year" | "yearly" => Ok(Self::Year),
            "fytd" | "snapshot" => Ok(Self::Snapshot),
            _ => Err(format!(
                "unknown granularity: {s}. Expected one of: month, quarter, year, fytd"
            )),
        }
    }
}

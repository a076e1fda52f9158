//! Funds series records shared by the allocator, the API client and the feed.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::period::Granularity;

/// One chart period: what was secured and released in it, and the running
/// totals up to and including it.
///
/// Deserialization also accepts the legacy backend keys `secured_m` /
/// `released_m` (per period) and `secured` / `released` (cumulative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodPoint {
    /// Display label (month, quarter or year name); unique only by position.
    pub label: String,
    #[serde(default, alias = "secured_m", deserialize_with = "deserialize_amount")]
    pub secured_in_period: i64,
    #[serde(default, alias = "released_m", deserialize_with = "deserialize_amount")]
    pub released_in_period: i64,
    #[serde(default, alias = "secured", deserialize_with = "deserialize_amount")]
    pub secured_cumulative: i64,
    #[serde(default, alias = "released", deserialize_with = "deserialize_amount")]
    pub released_cumulative: i64,
}

/// Accept integer or floating-point JSON amounts; floats round to whole units.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Int(i64),
        Float(f64),
    }

    match RawAmount::deserialize(deserializer)? {
        RawAmount::Int(v) => Ok(v),
        RawAmount::Float(v) if v.is_finite() => Ok(v.round() as i64),
        RawAmount::Float(v) => Err(D::Error::custom(format!("non-finite amount: {v}"))),
    }
}

/// Where a series' points came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesSource {
    /// Rows returned by the remote funds endpoint.
    Live,
    /// Produced by the period allocator.
    Synthetic,
    /// Two-point start/current view built from the totals.
    Snapshot,
}

impl std::fmt::Display for SeriesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Synthetic => write!(f, "synthetic"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Ordered sequence of [`PeriodPoint`]s for one granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSeries {
    pub granularity: Granularity,
    pub source: SeriesSource,
    pub points: Vec<PeriodPoint>,
}

impl PeriodSeries {
    /// Build a series from per-period flows, computing running totals left to
    /// right. Extra labels or flows beyond the shortest input are ignored.
    #[must_use]
    pub fn from_flows(
        granularity: Granularity,
        source: SeriesSource,
        labels: Vec<String>,
        secured: &[i64],
        released: &[i64],
    ) -> Self {
        let mut secured_cumulative = 0i64;
        let mut released_cumulative = 0i64;
        let points = labels
            .into_iter()
            .zip(secured.iter().zip(released))
            .map(|(label, (&s, &r))| {
                secured_cumulative += s;
                released_cumulative += r;
                PeriodPoint {
                    label,
                    secured_in_period: s,
                    released_in_period: r,
                    secured_cumulative,
                    released_cumulative,
                }
            })
            .collect();

        Self {
            granularity,
            source,
            points,
        }
    }

    /// Wrap rows received from the remote endpoint.
    #[must_use]
    pub fn live(granularity: Granularity, points: Vec<PeriodPoint>) -> Self {
        Self {
            granularity,
            source: SeriesSource::Live,
            points,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&PeriodPoint> {
        self.points.last()
    }

    /// Sum of the per-period secured values.
    #[must_use]
    pub fn secured_total(&self) -> i64 {
        self.points.iter().map(|p| p.secured_in_period).sum()
    }

    /// Sum of the per-period released values.
    #[must_use]
    pub fn released_total(&self) -> i64 {
        self.points.iter().map(|p| p.released_in_period).sum()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|p| p.label.as_str())
    }
}

//! Trust score records and the tier/discount rules shown on the trust card.
//!
//! The API may return a tier; when it does not, the tier and its discount are
//! derived from the score:
//!
//! | score  | tier      | discount |
//! |--------|-----------|----------|
//! | >= 85  | Premium   | 15%      |
//! | >= 70  | Preferred | 10%      |
//! | >= 50  | Plus      | 5%       |
//! | < 50   | Low Trust | 0%       |

use serde::{Deserialize, Deserializer, Serialize};

use crate::api::deserialize_lenient_amount;

const TIER_THRESHOLDS: [(f64, &str, u32); 3] = [
    (85.0, "Premium", 15),
    (70.0, "Preferred", 10),
    (50.0, "Plus", 5),
];
const LOWEST_TIER: (&str, u32) = ("Low Trust", 0);

/// Body of `GET /api/trust/{jobId}`. A missing or null `trust` decodes as
/// the default (zero) score.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrustEnvelope {
    #[serde(default, deserialize_with = "deserialize_nullable_trust")]
    pub trust: TrustScore,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustScore {
    /// Raw score as sent by the API; see [`TrustScore::clamped_score`].
    #[serde(deserialize_with = "deserialize_lenient_amount")]
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<TrustTier>,
    pub breakdown: TrustBreakdown,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustTier {
    pub label: Option<String>,
    /// Either a fraction (`0.1`) or a percentage (`10`).
    pub discount: Option<f64>,
}

/// Per-segment counts behind the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustBreakdown {
    pub docs: DocsIssues,
    pub timeliness: TimelinessIssues,
    pub disputes: DisputeIssues,
    pub release: ReleaseIssues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsIssues {
    #[serde(deserialize_with = "deserialize_lenient_count")]
    pub missing: u32,
    #[serde(deserialize_with = "deserialize_lenient_count")]
    pub expired: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelinessIssues {
    #[serde(deserialize_with = "deserialize_lenient_count")]
    pub overdue: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisputeIssues {
    #[serde(deserialize_with = "deserialize_lenient_count")]
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseIssues {
    #[serde(deserialize_with = "deserialize_lenient_count")]
    pub pending: u32,
}

/// Breakdown segment, in gauge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustSegment {
    Docs,
    Timeliness,
    Disputes,
    Release,
}

/// One line of the "what needs attention" list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustIssue {
    pub segment: TrustSegment,
    pub count: u32,
    pub summary: String,
}

fn deserialize_nullable_trust<'de, D>(deserializer: D) -> Result<TrustScore, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TrustScore>::deserialize(deserializer)?.unwrap_or_default())
}

/// Counts arrive as ints, floats, numeric strings or null; negatives and
/// junk read as 0, fractions round.
fn deserialize_lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_lenient_amount(deserializer)?;
    Ok(value.round().clamp(0.0, f64::from(u32::MAX)) as u32)
}

impl TrustScore {
    /// Score clamped to `[0, 100]`; NaN reads as 0.
    #[must_use]
    pub fn clamped_score(&self) -> f64 {
        if self.score.is_nan() {
            0.0
        } else {
            self.score.clamp(0.0, 100.0)
        }
    }

    /// Server-provided tier label, or the one the score earns.
    #[must_use]
    pub fn tier_label(&self) -> String {
        self.tier
            .as_ref()
            .and_then(|t| t.label.as_deref())
            .filter(|label| !label.trim().is_empty())
            .map_or_else(
                || derived_tier(self.clamped_score()).0.to_string(),
                str::to_string,
            )
    }

    /// Discount in whole percent.
    #[must_use]
    pub fn discount_percent(&self) -> u32 {
        match self.tier.as_ref().and_then(|t| t.discount) {
            Some(d) if d.is_finite() && d > 1.0 => d.round() as u32,
            Some(d) if d.is_finite() && d >= 0.0 => (d * 100.0).round() as u32,
            _ => derived_tier(self.clamped_score()).1,
        }
    }
}

fn derived_tier(score: f64) -> (&'static str, u32) {
    TIER_THRESHOLDS
        .iter()
        .find(|(threshold, _, _)| score >= *threshold)
        .map_or(LOWEST_TIER, |(_, label, discount)| (*label, *discount))
}

impl TrustBreakdown {
    /// Total number of open items across all segments.
    #[must_use]
    pub fn total_issues(&self) -> u32 {
        self.issues().iter().map(|i| i.count).sum()
    }

    /// One summary line per segment, in gauge order.
    #[must_use]
    pub fn issues(&self) -> Vec<TrustIssue> {
        let docs = self.docs.missing + self.docs.expired;
        vec![
            TrustIssue {
                segment: TrustSegment::Docs,
                count: docs,
                summary: format!("{docs} document issue(s): missing/expired"),
            },
            TrustIssue {
                segment: TrustSegment::Timeliness,
                count: self.timeliness.overdue,
                summary: format!("{} approval(s) overdue", self.timeliness.overdue),
            },
            TrustIssue {
                segment: TrustSegment::Disputes,
                count: self.disputes.count,
                summary: format!("{} dispute(s) open", self.disputes.count),
            },
            TrustIssue {
                segment: TrustSegment::Release,
                count: self.release.pending,
                summary: format!("{} payment(s) pending release", self.release.pending),
            },
        ]
    }
}

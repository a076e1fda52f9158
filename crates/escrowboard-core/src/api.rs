//! Typed records for the remote escrow API.
//!
//! The backend is loose about types (ids may be numbers, amounts may be
//! strings or missing), so the deserializers here are lenient: anything that
//! is not a usable amount reads as zero.

use serde::{Deserialize, Deserializer, Serialize};

use crate::series::PeriodPoint;

/// Lifecycle status of a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Draft,
    Active,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
    /// A status this client does not know, kept verbatim.
    Other(String),
}

impl JobStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Other(raw) => raw,
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Other("unknown".to_string())
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "draft" => Self::Draft,
            "active" => Self::Active,
            "in_progress" => Self::InProgress,
            "on_hold" => Self::OnHold,
            "completed" | "complete" => Self::Completed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(raw),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Row of `GET /api/jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub status: JobStatus,
    /// Contract value in currency units.
    #[serde(default, deserialize_with = "deserialize_lenient_amount")]
    pub value: f64,
}

/// Body of `GET /api/jobs/summary`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobsSummary {
    #[serde(deserialize_with = "deserialize_lenient_amount")]
    pub released_funds: f64,
    /// Secured and invoiced, not yet released.
    #[serde(deserialize_with = "deserialize_lenient_amount")]
    pub secured_funds: f64,
    #[serde(deserialize_with = "deserialize_lenient_amount")]
    pub funds_in_escrow: f64,
}

/// Body of `GET /analytics/funds`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FundsRows {
    #[serde(default)]
    pub rows: Vec<PeriodPoint>,
}

/// Accepts a string or a number; numbers are rendered without a fraction
/// when whole.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(v) => v.to_string(),
        RawId::Float(v) => v.to_string(),
    })
}

/// Numbers pass through; numeric strings are parsed; anything else
/// (null, garbage, non-finite) reads as 0.
pub(crate) fn deserialize_lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let value = match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(v) => v,
        RawAmount::Text(s) => s.trim().replace(',', "").parse().unwrap_or(0.0),
        RawAmount::Other(_) => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_decodes_full_record() {
        let job: Job = serde_json::from_str(
            r#"{"id":"J-1001","title":"Kitchen reno","client":"Smith","status":"active","value":85000}"#,
        )
        .unwrap();
        assert_eq!(job.id, "J-1001");
        assert_eq!(job.title, "Kitchen reno");
        assert_eq!(job.client, "Smith");
        assert_eq!(job.status, JobStatus::Active);
        assert!((job.value - 85_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn job_tolerates_numeric_id_and_missing_fields() {
        let job: Job = serde_json::from_str(r#"{"id":42}"#).unwrap();
        assert_eq!(job.id, "42");
        assert!(job.title.is_empty());
        assert_eq!(job.status, JobStatus::Other("unknown".to_string()));
        assert!(job.value.abs() < f64::EPSILON);
    }

    #[test]
    fn job_value_accepts_numeric_strings_and_garbage() {
        let job: Job = serde_json::from_str(r#"{"id":"a","value":"12,500"}"#).unwrap();
        assert!((job.value - 12_500.0).abs() < f64::EPSILON);

        let job: Job = serde_json::from_str(r#"{"id":"a","value":"n/a"}"#).unwrap();
        assert!(job.value.abs() < f64::EPSILON);

        let job: Job = serde_json::from_str(r#"{"id":"a","value":null}"#).unwrap();
        assert!(job.value.abs() < f64::EPSILON);
    }

    #[test]
    fn job_without_id_is_rejected() {
        assert!(serde_json::from_str::<Job>(r#"{"title":"x"}"#).is_err());
    }

    #[test]
    fn status_normalizes_spelling() {
        assert_eq!(JobStatus::from("In Progress".to_string()), JobStatus::InProgress);
        assert_eq!(JobStatus::from("on-hold".to_string()), JobStatus::OnHold);
        assert_eq!(JobStatus::from("Canceled".to_string()), JobStatus::Cancelled);
        assert_eq!(JobStatus::from("complete".to_string()), JobStatus::Completed);
        assert_eq!(
            JobStatus::from("Awaiting Docs".to_string()),
            JobStatus::Other("Awaiting Docs".to_string())
        );
    }

    #[test]
    fn status_serializes_to_wire_name() {
        assert_eq!(
            serde_json::to_string(&JobStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&JobStatus::Other("Awaiting Docs".to_string())).unwrap(),
            "\"Awaiting Docs\""
        );
    }

    #[test]
    fn status_display_respects_width() {
        assert_eq!(format!("{:<8}|", JobStatus::Active), "active  |");
    }

    #[test]
    fn summary_decodes_camel_case_and_defaults() {
        let summary: JobsSummary = serde_json::from_str(
            r#"{"releasedFunds":250000,"securedFunds":"150000","fundsInEscrow":null}"#,
        )
        .unwrap();
        assert!((summary.released_funds - 250_000.0).abs() < f64::EPSILON);
        assert!((summary.secured_funds - 150_000.0).abs() < f64::EPSILON);
        assert!(summary.funds_in_escrow.abs() < f64::EPSILON);

        let empty: JobsSummary = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, JobsSummary::default());
    }

    #[test]
    fn funds_rows_decode_legacy_shape() {
        let body: FundsRows = serde_json::from_str(
            r#"{"rows":[{"label":"Jan","secured_m":1000,"released_m":0,"secured":1000,"released":0}]}"#,
        )
        .unwrap();
        assert_eq!(body.rows.len(), 1);
        assert_eq!(body.rows[0].secured_in_period, 1000);

        let empty: FundsRows = serde_json::from_str("{}").unwrap();
        assert!(empty.rows.is_empty());
    }
}

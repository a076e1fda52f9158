//! Async client for the remote escrow API.
//!
//! Read-only: every call is a single `GET` with a per-request timeout. No
//! retries; callers decide what a failure means (the funds feed falls back
//! to synthetic data, the CLI reports the error).

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::api::{FundsRows, Job, JobsSummary};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::period::Granularity;
use crate::series::PeriodPoint;
use crate::trust::{TrustEnvelope, TrustScore};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("escrowboard/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:5000`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "expected an http(s) URL".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Transport {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            base,
            http,
            timeout,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(&config.base_url, config.timeout())
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `base` joined with path `segments`; each segment is percent-encoded.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Funds series URL for a remote granularity.
    pub fn funds_url(&self, granularity: Granularity) -> Result<Url, ApiError> {
        if granularity.is_snapshot() {
            return Err(ApiError::UnsupportedGranularity(granularity));
        }
        let mut url = self.endpoint(&["analytics", "funds"]);
        url.query_pairs_mut()
            .append_pair("groupBy", granularity.as_str());
        Ok(url)
    }

    /// `GET /analytics/funds?groupBy=...`
    pub async fn fetch_funds_series(
        &self,
        granularity: Granularity,
    ) -> Result<Vec<PeriodPoint>, ApiError> {
        let url = self.funds_url(granularity)?;
        let body: FundsRows = self.get_json(url).await?;
        Ok(body.rows)
    }

    /// `GET /api/jobs`
    pub async fn fetch_jobs(&self) -> Result<Vec<Job>, ApiError> {
        self.get_json(self.endpoint(&["api", "jobs"])).await
    }

    /// `GET /api/jobs/summary`
    pub async fn fetch_summary(&self) -> Result<JobsSummary, ApiError> {
        self.get_json(self.endpoint(&["api", "jobs", "summary"]))
            .await
    }

    /// `GET /api/trust/{job_id}`
    pub async fn fetch_trust(&self, job_id: &str) -> Result<TrustScore, ApiError> {
        let envelope: TrustEnvelope = self
            .get_json(self.endpoint(&["api", "trust", job_id]))
            .await?;
        Ok(envelope.trust)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "Non-success status");
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(&url, &e))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    fn classify(&self, url: &Url, err: &reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            ApiError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

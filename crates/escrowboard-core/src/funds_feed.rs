//! Fetch-else-synthesize state machine behind the funds chart.
//!
//! The chart always has something to draw. While a remote request is in
//! flight the synthetic series for the pending request stands in; if the
//! request fails, times out or returns no rows, the synthetic series becomes
//! the result. Only an allocator rejection leaves nothing to show.
//!
//! ```text
//!            begin                 complete(rows)
//!   any ───────────► Loading ──────────────────────► Live
//!                       │  complete(failed | empty | timed out)
//!                       ├──────────────────────────► Fallback
//!                       │  allocator rejects totals
//!                       └──────────────────────────► Error
//! ```
//!
//! Every `begin` (and every `cancel`) bumps a generation counter. A
//! completion carrying an older generation is stale and is dropped without
//! touching the state, so a slow response for a previous granularity can
//! never overwrite a newer one.

use serde::Serialize;
use tracing::{Instrument, debug, info, warn};

use crate::allocator::PeriodAllocator;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::period::Granularity;
use crate::series::{PeriodPoint, PeriodSeries};

/// What the chart is asked to show.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundsRequest {
    pub granularity: Granularity,
    pub secured_total: f64,
    pub released_total: f64,
}

impl FundsRequest {
    #[must_use]
    pub const fn new(granularity: Granularity, secured_total: f64, released_total: f64) -> Self {
        Self {
            granularity,
            secured_total,
            released_total,
        }
    }
}

/// Handle for one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedTicket {
    generation: u64,
    request: FundsRequest,
}

impl FeedTicket {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn request(&self) -> &FundsRequest {
        &self.request
    }
}

/// Result of a remote fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Rows(Vec<PeriodPoint>),
    Failed(ApiError),
    TimedOut,
}

impl From<Result<Vec<PeriodPoint>, ApiError>> for FetchOutcome {
    fn from(result: Result<Vec<PeriodPoint>, ApiError>) -> Self {
        match result {
            Ok(rows) => Self::Rows(rows),
            Err(ApiError::Timeout { .. }) => Self::TimedOut,
            Err(err) => Self::Failed(err),
        }
    }
}

/// Why a synthetic series is being shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Remote fetch is switched off in configuration.
    Disabled,
    /// The request failed; carries the error text.
    FetchFailed(String),
    /// The request did not finish within the timeout.
    TimedOut,
    /// The endpoint answered with no rows.
    EmptyRows,
    /// Nothing has been requested yet, or the last request was cancelled.
    NotLoaded,
    /// Snapshot views are always built locally.
    SnapshotView,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => f.write_str("remote fetch disabled"),
            Self::FetchFailed(message) => write!(f, "fetch failed: {message}"),
            Self::TimedOut => f.write_str("fetch timed out"),
            Self::EmptyRows => f.write_str("remote series was empty"),
            Self::NotLoaded => f.write_str("not loaded"),
            Self::SnapshotView => f.write_str("snapshot view"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedState {
    Loading {
        generation: u64,
        request: FundsRequest,
    },
    Live {
        series: PeriodSeries,
    },
    Fallback {
        series: PeriodSeries,
        reason: FallbackReason,
    },
    Error {
        message: String,
    },
}

impl FeedState {
    #[must_use]
    pub const fn kind(&self) -> FeedStateKind {
        match self {
            Self::Loading { .. } => FeedStateKind::Loading,
            Self::Live { .. } => FeedStateKind::Live,
            Self::Fallback { .. } => FeedStateKind::Fallback,
            Self::Error { .. } => FeedStateKind::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStateKind {
    Loading,
    Live,
    Fallback,
    Error,
}

impl FeedStateKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Live => "live",
            Self::Fallback => "fallback",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for FeedStateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of handing a result to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The state moved to the given kind.
    Applied(FeedStateKind),
    /// The ticket was superseded; state unchanged.
    Stale,
}

/// Owns the chart's funds state. Not shared: callers hold it by `&mut`.
#[derive(Debug, Clone)]
pub struct FundsFeed {
    allocator: PeriodAllocator,
    fetch_enabled: bool,
    generation: u64,
    request: FundsRequest,
    state: FeedState,
}

impl FundsFeed {
    /// Starts in `Fallback { NotLoaded }` with the synthetic series for
    /// `request` (or `Error` if the allocator rejects it).
    #[must_use]
    pub fn new(allocator: PeriodAllocator, fetch_enabled: bool, request: FundsRequest) -> Self {
        let mut feed = Self {
            allocator,
            fetch_enabled,
            generation: 0,
            request,
            state: FeedState::Error {
                message: String::new(),
            },
        };
        feed.state = feed.fallback_state(&request, FallbackReason::NotLoaded);
        feed
    }

    #[must_use]
    pub const fn state(&self) -> &FeedState {
        &self.state
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The most recent request handed to `begin` or `resolve_without_fetch`.
    #[must_use]
    pub const fn request(&self) -> &FundsRequest {
        &self.request
    }

    #[must_use]
    pub const fn fetch_enabled(&self) -> bool {
        self.fetch_enabled
    }

    /// Whether `request` goes to the network at all.
    #[must_use]
    pub const fn needs_fetch(&self, request: &FundsRequest) -> bool {
        self.fetch_enabled && !request.granularity.is_snapshot()
    }

    /// Enter `Loading` for `request`, superseding any in-flight ticket.
    pub fn begin(&mut self, request: FundsRequest) -> FeedTicket {
        self.generation += 1;
        self.request = request;
        self.state = FeedState::Loading {
            generation: self.generation,
            request,
        };
        debug!(
            generation = self.generation,
            granularity = %request.granularity,
            "Funds request started"
        );
        FeedTicket {
            generation: self.generation,
            request,
        }
    }

    /// Apply the outcome of the request behind `ticket`.
    pub fn complete(&mut self, ticket: FeedTicket, outcome: FetchOutcome) -> Completion {
        if ticket.generation != self.generation {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                "Discarding stale funds response"
            );
            return Completion::Stale;
        }

        let request = ticket.request;
        self.state = match outcome {
            FetchOutcome::Rows(rows) if rows.is_empty() => {
                warn!(granularity = %request.granularity, "Remote funds series empty; synthesizing");
                self.fallback_state(&request, FallbackReason::EmptyRows)
            }
            FetchOutcome::Rows(rows) => {
                info!(
                    granularity = %request.granularity,
                    rows = rows.len(),
                    source = "live",
                    "Remote funds series loaded"
                );
                FeedState::Live {
                    series: PeriodSeries::live(request.granularity, rows),
                }
            }
            FetchOutcome::Failed(err) => {
                warn!(granularity = %request.granularity, error = %err, "Funds fetch failed; synthesizing");
                self.fallback_state(&request, FallbackReason::FetchFailed(err.to_string()))
            }
            FetchOutcome::TimedOut => {
                warn!(granularity = %request.granularity, "Funds fetch timed out; synthesizing");
                self.fallback_state(&request, FallbackReason::TimedOut)
            }
        };
        Completion::Applied(self.state.kind())
    }

    /// Settle `request` locally: snapshot views and disabled fetches never
    /// touch the network. Supersedes any in-flight ticket.
    pub fn resolve_without_fetch(&mut self, request: FundsRequest) -> Completion {
        self.generation += 1;
        self.request = request;
        let reason = if request.granularity.is_snapshot() {
            FallbackReason::SnapshotView
        } else {
            FallbackReason::Disabled
        };
        self.state = self.fallback_state(&request, reason);
        Completion::Applied(self.state.kind())
    }

    /// Teardown: any in-flight ticket becomes stale. A `Loading` state
    /// settles on the synthetic series.
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let FeedState::Loading { request, .. } = self.state {
            self.state = self.fallback_state(&request, FallbackReason::NotLoaded);
        }
        debug!(generation = self.generation, "Funds feed cancelled");
    }

    /// Series to render now. While loading this is the synthetic series for
    /// the pending request; `None` only when the allocator rejected it.
    #[must_use]
    pub fn current_series(&self) -> Option<PeriodSeries> {
        match &self.state {
            FeedState::Live { series } | FeedState::Fallback { series, .. } => {
                Some(series.clone())
            }
            FeedState::Loading { request, .. } => self.synthesize(request).ok(),
            FeedState::Error { .. } => None,
        }
    }

    /// Drive one request to completion: fetch through `client` (bounded by
    /// its timeout) when the request needs it, otherwise resolve locally.
    pub async fn load(&mut self, client: Option<&ApiClient>, request: FundsRequest) -> Completion {
        let client = match client {
            Some(client) if self.needs_fetch(&request) => client,
            _ => return self.resolve_without_fetch(request),
        };

        let ticket = self.begin(request);
        let span = crate::feed_span!(
            "load_funds",
            granularity = request.granularity.as_str(),
            generation = ticket.generation
        );

        let fetch = tokio::time::timeout(
            client.timeout(),
            client.fetch_funds_series(request.granularity),
        );
        let outcome = match fetch.instrument(span).await {
            Ok(result) => FetchOutcome::from(result),
            Err(_) => FetchOutcome::TimedOut,
        };
        self.complete(ticket, outcome)
    }

    fn synthesize(&self, request: &FundsRequest) -> Result<PeriodSeries, String> {
        self.allocator
            .allocate(
                request.secured_total,
                request.released_total,
                request.granularity,
            )
            .map_err(|e| e.to_string())
    }

    fn fallback_state(&self, request: &FundsRequest, reason: FallbackReason) -> FeedState {
        match self.synthesize(request) {
            Ok(series) => FeedState::Fallback { series, reason },
            Err(message) => {
                warn!(granularity = %request.granularity, error = %message, "Cannot synthesize funds series");
                FeedState::Error { message }
            }
        }
    }
}

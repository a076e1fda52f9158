//! escrowboard-core: Core library for escrowboard
//!
//! This crate provides the data layer behind the escrowboard Builder /
//! Contractor / Client dashboards: typed records for the remote escrow API,
//! an async client for it, and the deterministic period allocator that backs
//! the funds chart whenever no live series is available.
//!
//! # Architecture
//!
//! ```text
//! Config → ApiClient ──► /analytics/funds, /api/jobs, /api/jobs/summary, /api/trust/:id
//!              ↓
//!          FundsFeed (Loading → Live | Fallback | Error)
//!              ↓ fallback
//!          PeriodAllocator ◄── Mulberry32 (seeded from the totals)
//! ```
//!
//! # Modules
//!
//! - `allocator`: Deterministic period allocator (synthetic funds series)
//! - `prng`: Mulberry32 generator and FNV-1a seed hashing
//! - `period`: Chart granularities and period labels
//! - `series`: `PeriodPoint` / `PeriodSeries` records
//! - `api`: Typed job and summary records from the remote API
//! - `trust`: Trust score records, tier and discount derivation
//! - `client`: Async HTTP client for the remote API
//! - `funds_feed`: Fetch-else-synthesize state machine
//! - `dashboard`: KPI and pipeline derivation for the builder dashboard
//! - `format`: Money and label formatting
//! - `config`: Configuration management
//! - `logging`: Structured logging setup
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod allocator;
pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod funds_feed;
pub mod logging;
pub mod period;
pub mod prng;
pub mod series;
pub mod trust;

pub use allocator::{AllocatorConfig, PeriodAllocator, SeriesProfile};
pub use error::{AllocationError, ApiError, ConfigError, Error, Result};
pub use period::Granularity;
pub use series::{PeriodPoint, PeriodSeries, SeriesSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

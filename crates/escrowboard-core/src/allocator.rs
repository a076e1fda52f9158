//! Deterministic period allocator.
//!
//! Spreads a year-to-date funds total over the periods of a chart so the
//! dashboard has something faithful to draw when no live series exists. The
//! output is a pure function of the two totals, the granularity and the
//! anchor year:
//!
//! 1. A seed is hashed from the totals and the granularity.
//! 2. Each period gets a weight: a seasonal sine multiplied by bounded
//!    jitter from [`Mulberry32`], floored so it stays strictly positive.
//! 3. Weights are normalized, scaled to the total and rounded to the
//!    currency unit.
//! 4. The rounding remainder lands in the last period, so the values sum to
//!    the total exactly.
//!
//! Secured and released totals are allocated independently with their own
//! [`SeriesProfile`] but the same seed.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AllocationError, ConfigError};
use crate::period::{ANCHOR_YEARS, Granularity, SNAPSHOT_LABELS};
use crate::prng::{Mulberry32, fnv1a32};
use crate::series::{PeriodPoint, PeriodSeries, SeriesSource};

/// Default rounding unit, in whole currency units.
pub const DEFAULT_UNIT: i64 = 1000;

/// Default lower bound on a period weight before normalization.
pub const DEFAULT_WEIGHT_FLOOR: f64 = 0.15;

/// Largest total accepted: every integer up to 2^53 is exact in an f64.
pub const MAX_TOTAL: f64 = 9_007_199_254_740_992.0;

/// Shape parameters for one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesProfile {
    /// Amplitude of the seasonal sine component.
    pub season_strength: f64,
    /// Amplitude of the multiplicative jitter.
    pub noise: f64,
}

impl SeriesProfile {
    pub const SECURED: Self = Self {
        season_strength: 0.28,
        noise: 0.38,
    };

    pub const RELEASED: Self = Self {
        season_strength: 0.22,
        noise: 0.33,
    };

    /// Weight of period `index` given a jitter draw `draw` in `[-1, 1)`.
    #[allow(clippy::suboptimal_flops)]
    #[must_use]
    pub fn weight(&self, index: usize, cycle: usize, draw: f64, floor: f64) -> f64 {
        let phase = TAU * index as f64 / cycle as f64;
        let seasonal = 1.0 + self.season_strength * phase.sin();
        let jitter = 1.0 + self.noise * draw;
        (seasonal * jitter).max(floor)
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !self.season_strength.is_finite() || self.season_strength < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "allocator.{name}.season_strength must be a finite, non-negative number"
            )));
        }
        if !self.noise.is_finite() || !(0.0..1.0).contains(&self.noise) {
            return Err(ConfigError::ValidationError(format!(
                "allocator.{name}.noise must be in [0, 1)"
            )));
        }
        Ok(())
    }
}

/// Allocator parameters (`[allocator]` config section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Rounding unit for per-period values.
    pub unit: i64,
    /// Lower bound on a weight before normalization.
    pub floor: f64,
    pub secured: SeriesProfile,
    pub released: SeriesProfile,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            unit: DEFAULT_UNIT,
            floor: DEFAULT_WEIGHT_FLOOR,
            secured: SeriesProfile::SECURED,
            released: SeriesProfile::RELEASED,
        }
    }
}

impl AllocatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.unit <= 0 {
            return Err(ConfigError::ValidationError(
                "allocator.unit must be at least 1".to_string(),
            ));
        }
        if !self.floor.is_finite() || self.floor <= 0.0 {
            return Err(ConfigError::ValidationError(
                "allocator.floor must be a finite, positive number".to_string(),
            ));
        }
        self.secured.validate("secured")?;
        self.released.validate("released")
    }
}

/// Produces synthetic [`PeriodSeries`] from year-to-date totals.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodAllocator {
    config: AllocatorConfig,
    anchor_year: i32,
}

impl PeriodAllocator {
    /// `anchor_year` is the last year shown by yearly series, clamped to
    /// [`ANCHOR_YEARS`].
    #[must_use]
    pub fn new(config: AllocatorConfig, anchor_year: i32) -> Self {
        Self {
            config,
            anchor_year: anchor_year.clamp(*ANCHOR_YEARS.start(), *ANCHOR_YEARS.end()),
        }
    }

    /// Default parameters with the given anchor year.
    #[must_use]
    pub fn with_anchor_year(anchor_year: i32) -> Self {
        Self::new(AllocatorConfig::default(), anchor_year)
    }

    #[must_use]
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    #[must_use]
    pub fn anchor_year(&self) -> i32 {
        self.anchor_year
    }

    /// Spread `secured` and `released` over the periods of `granularity`.
    ///
    /// Fails with [`AllocationError::InvalidInput`] when either total is
    /// negative, non-finite, fractional or larger than [`MAX_TOTAL`].
    pub fn allocate(
        &self,
        secured: f64,
        released: f64,
        granularity: Granularity,
    ) -> Result<PeriodSeries, AllocationError> {
        let secured_total = validate_total("secured", secured)?;
        let released_total = validate_total("released", released)?;

        let Some(cycle) = granularity.cycle() else {
            return Ok(snapshot_series(secured_total, released_total));
        };

        let periods = granularity.period_count();
        let seed = derive_seed(secured_total, released_total, granularity);
        let secured_flow = distribute(
            secured_total,
            periods,
            cycle,
            self.config.secured,
            &self.config,
            seed,
        );
        let released_flow = distribute(
            released_total,
            periods,
            cycle,
            self.config.released,
            &self.config,
            seed,
        );

        debug!(
            granularity = %granularity,
            seed,
            secured_total,
            released_total,
            "Synthesized period series"
        );

        Ok(PeriodSeries::from_flows(
            granularity,
            SeriesSource::Synthetic,
            granularity.labels(self.anchor_year),
            &secured_flow,
            &released_flow,
        ))
    }
}

fn validate_total(field: &'static str, value: f64) -> Result<i64, AllocationError> {
    let reason = if !value.is_finite() {
        Some("must be finite")
    } else if value < 0.0 {
        Some("must not be negative")
    } else if value.fract() != 0.0 {
        Some("must be a whole number of currency units")
    } else if value > MAX_TOTAL {
        Some("exceeds the largest exactly representable amount")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AllocationError::InvalidInput {
            field,
            value,
            reason,
        }),
        None => Ok(value as i64),
    }
}

/// Seed for a synthetic series: a function of both totals and the granularity.
#[must_use]
pub fn derive_seed(secured: i64, released: i64, granularity: Granularity) -> u32 {
    let periods = granularity.period_count() as u32;
    fnv1a32(&secured.to_string())
        ^ fnv1a32(&released.to_string())
        ^ (periods << 5)
        ^ fnv1a32(granularity.as_str())
}

/// Spread `total` over `periods` values that sum to it exactly.
///
/// Values are multiples of `config.unit` except where the remainder is
/// reconciled. For `total >= 0` every value is `>= 0`.
#[must_use]
pub fn distribute(
    total: i64,
    periods: usize,
    cycle: usize,
    profile: SeriesProfile,
    config: &AllocatorConfig,
    seed: u32,
) -> Vec<i64> {
    if periods == 0 {
        return Vec::new();
    }

    let cycle = cycle.max(1);
    let mut rng = Mulberry32::new(seed);
    let weights: Vec<f64> = (0..periods)
        .map(|i| profile.weight(i, cycle, rng.next_signed_unit(), config.floor))
        .collect();
    let weight_sum: f64 = weights.iter().sum();

    let unit = config.unit.max(1);
    let mut values: Vec<i64> = weights
        .iter()
        .map(|w| round_to_unit(total as f64 * w / weight_sum, unit))
        .collect();

    let allocated: i64 = values.iter().sum();
    reconcile(&mut values, total - allocated);
    values
}

/// Round half up to the nearest multiple of `unit`.
fn round_to_unit(value: f64, unit: i64) -> i64 {
    ((value / unit as f64) + 0.5).floor() as i64 * unit
}

/// Add `diff` to the last value. If that leaves it negative, take the
/// shortfall from earlier values, right to left, never below zero.
fn reconcile(values: &mut [i64], diff: i64) {
    let Some((last, rest)) = values.split_last_mut() else {
        return;
    };

    *last += diff;
    if *last >= 0 {
        return;
    }

    let mut shortfall = -*last;
    *last = 0;
    for value in rest.iter_mut().rev() {
        if shortfall == 0 {
            break;
        }
        let take = shortfall.min(*value);
        *value -= take;
        shortfall -= take;
    }
}

/// Two-point series: nothing at "Start", both totals at "Current".
#[must_use]
pub fn snapshot_series(secured: i64, released: i64) -> PeriodSeries {
    let [start, current] = SNAPSHOT_LABELS;
    PeriodSeries {
        granularity: Granularity::Snapshot,
        source: SeriesSource::Snapshot,
        points: vec![
            PeriodPoint {
                label: start.to_string(),
                secured_in_period: 0,
                released_in_period: 0,
                secured_cumulative: 0,
                released_cumulative: 0,
            },
            PeriodPoint {
                label: current.to_string(),
                secured_in_period: secured,
                released_in_period: released,
                secured_cumulative: secured,
                released_cumulative: released,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator() -> PeriodAllocator {
        PeriodAllocator::with_anchor_year(2026)
    }

    fn secured_flow(series: &PeriodSeries) -> Vec<i64> {
        series.points.iter().map(|p| p.secured_in_period).collect()
    }

    fn released_flow(series: &PeriodSeries) -> Vec<i64> {
        series.points.iter().map(|p| p.released_in_period).collect()
    }

    #[test]
    fn yearly_scenario_sums_exactly() {
        let series = allocator()
            .allocate(1_200_000.0, 900_000.0, Granularity::Year)
            .unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series.secured_total(), 1_200_000);
        assert_eq!(series.released_total(), 900_000);
        let last = series.last().unwrap();
        assert_eq!(last.secured_cumulative, 1_200_000);
        assert_eq!(last.released_cumulative, 900_000);
        assert_eq!(last.label, "2026");
    }

    #[test]
    fn yearly_scenario_golden_values() {
        let series = allocator()
            .allocate(1_200_000.0, 900_000.0, Granularity::Year)
            .unwrap();
        assert_eq!(
            derive_seed(1_200_000, 900_000, Granularity::Year),
            2_090_676_542
        );
        assert_eq!(
            secured_flow(&series),
            vec![239_000, 299_000, 182_000, 277_000, 203_000]
        );
        assert_eq!(
            released_flow(&series),
            vec![178_000, 213_000, 141_000, 208_000, 160_000]
        );
    }

    #[test]
    fn period_counts_per_granularity() {
        let a = allocator();
        for (g, n) in [
            (Granularity::Month, 12),
            (Granularity::Quarter, 8),
            (Granularity::Year, 5),
            (Granularity::Snapshot, 2),
        ] {
            assert_eq!(a.allocate(500_000.0, 250_000.0, g).unwrap().len(), n, "{g}");
        }
    }

    #[test]
    fn repeated_calls_are_identical() {
        let a = allocator();
        for g in Granularity::ALL {
            let first = a.allocate(734_000.0, 512_345.0, g).unwrap();
            let second = a.allocate(734_000.0, 512_345.0, g).unwrap();
            assert_eq!(first, second, "{g}");
        }
    }

    #[test]
    fn extreme_anchor_year_allocates_without_panicking() {
        for year in [i32::MIN, -1, 0, i32::MAX] {
            let a = PeriodAllocator::with_anchor_year(year);
            assert!(ANCHOR_YEARS.contains(&a.anchor_year()));
            let series = a.allocate(1_000.0, 0.0, Granularity::Year).unwrap();
            assert_eq!(series.secured_total(), 1_000);
            assert_eq!(
                series.last().unwrap().label,
                a.anchor_year().to_string()
            );
        }
    }

    #[test]
    fn largest_accepted_total_sums_exactly() {
        let top = MAX_TOTAL as i64;
        for g in [Granularity::Month, Granularity::Quarter, Granularity::Year] {
            let series = allocator().allocate(MAX_TOTAL, MAX_TOTAL, g).unwrap();
            assert_eq!(series.secured_total(), top, "{g}");
            assert_eq!(series.released_total(), top, "{g}");
            assert!(series.points.iter().all(|p| p.secured_in_period >= 0), "{g}");
            assert!(series.points.iter().all(|p| p.released_in_period >= 0), "{g}");
            assert_eq!(series.last().unwrap().secured_cumulative, top, "{g}");
        }
        assert!(allocator().allocate(MAX_TOTAL + 2.0, 0.0, Granularity::Year).is_err());
    }

    #[test]
    fn zero_total_yields_all_zero_periods() {
        let series = allocator()
            .allocate(0.0, 0.0, Granularity::Month)
            .unwrap();
        assert!(series.points.iter().all(|p| p.secured_in_period == 0));
        assert!(series.points.iter().all(|p| p.released_in_period == 0));
        assert!(series.points.iter().all(|p| p.secured_cumulative == 0));
    }

    #[test]
    fn negative_total_is_rejected() {
        let err = allocator()
            .allocate(-100.0, 0.0, Granularity::Month)
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::InvalidInput {
                field: "secured",
                ..
            }
        ));
    }

    #[test]
    fn negative_total_is_rejected_for_snapshot_too() {
        let err = allocator()
            .allocate(10.0, -1.0, Granularity::Snapshot)
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::InvalidInput {
                field: "released",
                ..
            }
        ));
    }

    #[test]
    fn non_finite_and_fractional_totals_are_rejected() {
        let a = allocator();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 10.5, MAX_TOTAL * 2.0] {
            assert!(a.allocate(bad, 0.0, Granularity::Year).is_err(), "{bad}");
            assert!(a.allocate(0.0, bad, Granularity::Year).is_err(), "{bad}");
        }
    }

    #[test]
    fn negative_zero_is_accepted() {
        let series = allocator()
            .allocate(-0.0, 0.0, Granularity::Quarter)
            .unwrap();
        assert_eq!(series.secured_total(), 0);
    }

    #[test]
    fn small_totals_never_go_negative() {
        // Rounding 12 values of ~750 up to 1000 overshoots by 3000.
        let series = allocator()
            .allocate(9_000.0, 0.0, Granularity::Month)
            .unwrap();
        assert_eq!(series.secured_total(), 9_000);
        assert!(series.points.iter().all(|p| p.secured_in_period >= 0));
        assert!(
            series
                .points
                .windows(2)
                .all(|w| w[0].secured_cumulative <= w[1].secured_cumulative)
        );
    }

    #[test]
    fn totals_below_one_unit_land_in_last_period() {
        let series = allocator()
            .allocate(400.0, 0.0, Granularity::Month)
            .unwrap();
        let flow = secured_flow(&series);
        assert_eq!(flow.iter().sum::<i64>(), 400);
        assert_eq!(flow[11], 400);
        assert!(flow[..11].iter().all(|v| *v == 0));
    }

    #[test]
    fn snapshot_is_two_points_without_randomization() {
        let series = allocator()
            .allocate(1_000.0, 400.0, Granularity::Snapshot)
            .unwrap();
        assert_eq!(series.source, SeriesSource::Snapshot);
        assert_eq!(series.points[0].label, "Start");
        assert_eq!(series.points[0].secured_cumulative, 0);
        assert_eq!(series.points[1].label, "Current");
        assert_eq!(series.points[1].secured_cumulative, 1_000);
        assert_eq!(series.points[1].released_cumulative, 400);
        assert_eq!(series.secured_total(), 1_000);
        assert_eq!(series.released_total(), 400);
    }

    #[test]
    fn quarterly_labels_and_source() {
        let series = allocator()
            .allocate(800_000.0, 100_000.0, Granularity::Quarter)
            .unwrap();
        assert_eq!(series.source, SeriesSource::Synthetic);
        assert_eq!(
            series.labels().collect::<Vec<_>>(),
            vec!["Q1", "Q2", "Q3", "Q4", "Q1", "Q2", "Q3", "Q4"]
        );
    }

    #[test]
    fn seed_depends_on_every_input() {
        let base = derive_seed(100, 200, Granularity::Month);
        assert_ne!(base, derive_seed(101, 200, Granularity::Month));
        assert_ne!(base, derive_seed(100, 201, Granularity::Month));
        assert_ne!(base, derive_seed(100, 200, Granularity::Quarter));
    }

    #[test]
    fn weight_respects_floor() {
        let profile = SeriesProfile {
            season_strength: 0.9,
            noise: 0.99,
        };
        // Trough of the sine with the lowest possible jitter draw.
        let w = profile.weight(9, 12, -1.0, DEFAULT_WEIGHT_FLOOR);
        assert!((w - DEFAULT_WEIGHT_FLOOR).abs() < f64::EPSILON);
    }

    #[test]
    fn distribute_with_zero_periods_is_empty() {
        let values = distribute(
            1_000,
            0,
            12,
            SeriesProfile::SECURED,
            &AllocatorConfig::default(),
            1,
        );
        assert!(values.is_empty());
    }

    #[test]
    fn distribute_values_are_unit_multiples_except_last() {
        let config = AllocatorConfig::default();
        let values = distribute(1_234_567, 12, 12, SeriesProfile::SECURED, &config, 99);
        assert_eq!(values.iter().sum::<i64>(), 1_234_567);
        assert!(values[..11].iter().all(|v| v % config.unit == 0));
    }

    #[test]
    fn reconcile_borrows_from_earlier_periods() {
        let mut values = vec![1000, 1000, 0, 1000];
        reconcile(&mut values, -2500);
        assert_eq!(values, vec![500, 0, 0, 0]);
        assert_eq!(values.iter().sum::<i64>(), 500);
    }

    #[test]
    fn reconcile_positive_diff_goes_to_last() {
        let mut values = vec![1000, 2000];
        reconcile(&mut values, 499);
        assert_eq!(values, vec![1000, 2499]);
    }

    #[test]
    fn config_validation() {
        assert!(AllocatorConfig::default().validate().is_ok());

        let mut config = AllocatorConfig::default();
        config.unit = 0;
        assert!(config.validate().is_err());

        let mut config = AllocatorConfig::default();
        config.floor = 0.0;
        assert!(config.validate().is_err());

        let mut config = AllocatorConfig::default();
        config.secured.noise = 1.0;
        assert!(config.validate().is_err());

        let mut config = AllocatorConfig::default();
        config.released.season_strength = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn custom_unit_changes_rounding() {
        let mut config = AllocatorConfig::default();
        config.unit = 1;
        let a = PeriodAllocator::new(config, 2026);
        let series = a.allocate(1_000_003.0, 7.0, Granularity::Month).unwrap();
        assert_eq!(series.secured_total(), 1_000_003);
        assert_eq!(series.released_total(), 7);
    }

    #[test]
    fn config_serde_defaults_from_empty_toml() {
        let config: AllocatorConfig = toml::from_str("").unwrap();
        assert_eq!(config, AllocatorConfig::default());
    }
}

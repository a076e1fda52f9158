#![no_main]

use escrowboard_core::allocator::{AllocatorConfig, SeriesProfile, distribute};
use escrowboard_core::{Granularity, PeriodAllocator};
use libfuzzer_sys::fuzz_target;

fn granularity_for(tag: u8) -> Granularity {
    match tag % 4 {
        0 => Granularity::Month,
        1 => Granularity::Quarter,
        2 => Granularity::Year,
        _ => Granularity::Snapshot,
    }
}

fn amount(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 8];
    let len = bytes.len().min(8);
    raw[..len].copy_from_slice(&bytes[..len]);
    // Whole units below 2^53 so most inputs pass validation.
    (u64::from_le_bytes(raw) >> 11) as f64
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 19 {
        return;
    }

    let granularity = granularity_for(data[0]);
    let anchor_year = 1900 + i32::from(data[1]) * 2;
    let secured = amount(&data[2..10]);
    let released = amount(&data[10..18]);

    let allocator = PeriodAllocator::with_anchor_year(anchor_year);
    let series = allocator
        .allocate(secured, released, granularity)
        .expect("whole non-negative totals below 2^53 are valid");

    assert_eq!(series.secured_total(), secured as i64);
    assert_eq!(series.released_total(), released as i64);
    assert!(
        series
            .points
            .iter()
            .all(|p| p.secured_in_period >= 0 && p.released_in_period >= 0)
    );
    let mut secured_running = 0;
    for point in &series.points {
        secured_running += point.secured_in_period;
        assert_eq!(point.secured_cumulative, secured_running);
    }

    let again = allocator
        .allocate(secured, released, granularity)
        .expect("second allocation");
    assert_eq!(series, again);

    // Arbitrary shape parameters for the raw distributor.
    let tail = &data[18..];
    let periods = usize::from(tail.first().copied().unwrap_or(0));
    let cycle = usize::from(tail.get(1).copied().unwrap_or(1));
    let config = AllocatorConfig {
        unit: i64::from(tail.get(2).copied().unwrap_or(1)).max(1) * 10,
        ..AllocatorConfig::default()
    };
    let total = secured as i64;
    let seed = u32::from_le_bytes([data[2], data[3], data[4], data[5]]);
    let values = distribute(total, periods, cycle, SeriesProfile::RELEASED, &config, seed);
    assert_eq!(values.len(), periods);
    if periods > 0 {
        assert_eq!(values.iter().sum::<i64>(), total);
        assert!(values.iter().all(|v| *v >= 0));
    }
});

#![no_main]

use escrowboard_core::api::{FundsRows, Job, JobsSummary};
use escrowboard_core::trust::TrustEnvelope;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Lenient decoders must never panic, and decoded amounts are finite.
    if let Ok(jobs) = serde_json::from_slice::<Vec<Job>>(data) {
        assert!(jobs.iter().all(|j| j.value.is_finite()));
    }
    if let Ok(summary) = serde_json::from_slice::<JobsSummary>(data) {
        assert!(summary.released_funds.is_finite());
        assert!(summary.secured_funds.is_finite());
        assert!(summary.funds_in_escrow.is_finite());
    }
    let _ = serde_json::from_slice::<FundsRows>(data);
    if let Ok(envelope) = serde_json::from_slice::<TrustEnvelope>(data) {
        let score = envelope.trust.clamped_score();
        assert!((0.0..=100.0).contains(&score));
        let _ = envelope.trust.tier_label();
        let _ = envelope.trust.discount_percent();
        let _ = envelope.trust.breakdown.total_issues();
    }
});

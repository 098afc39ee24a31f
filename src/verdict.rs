// Timing classifier for sqlprobe
// Derives a risk verdict from the spread of hit latencies

use crate::models::{Grade, Hit, RiskVerdict, VerdictKind};
use std::time::Instant;

/// Spread-to-mean ratio, in percent, at or above which a target is graded high risk.
pub const HIGH_RISK_PERCENTAGE: f64 = 8000.0;

const NO_RESPONSES_MESSAGE: &str = "Cannot evaluate the risk: no responses were recorded.";
const INCONCLUSIVE_MESSAGE: &str = "Cannot evaluate the risk because response times did not vary. \
     The target may be well protected, or the probes were not discriminating enough.";
const HIGH_RISK_MESSAGE: &str = "High risk! Timing variance suggests exploitable latency differences; \
     the target is likely vulnerable to SQL injection and needs a careful review.";
const LOW_RISK_MESSAGE: &str =
    "Very low risk. The target appears to be well protected against SQL injection.";

/// Latency of every hit, in recording order.
pub fn latency_samples(hits: &[Hit]) -> Vec<f64> {
    hits.iter().map(|h| h.elapsed_ms).collect()
}

/// Classify a session's hits.
///
/// With `distance = max - min` and `avg = mean`, the score is `distance / avg * 100`
/// rounded to two decimals:
/// - no hits → `NoResponses`, grade F, no percentage
/// - zero distance → `Inconclusive`, grade F, no percentage
/// - score >= 8000 → `HighRisk`, grade F
/// - otherwise → `LowRisk`, grade A
pub fn classify(hits: &[Hit]) -> RiskVerdict {
    classify_samples(&latency_samples(hits))
}

pub fn classify_samples(samples: &[f64]) -> RiskVerdict {
    let start = Instant::now();

    let (kind, grade, percentage, message) = if samples.is_empty() {
        (VerdictKind::NoResponses, Grade::F, None, NO_RESPONSES_MESSAGE)
    } else {
        let avg = samples.iter().sum::<f64>() / samples.len() as f64;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let distance = max - min;

        if distance == 0.0 || avg <= 0.0 {
            (VerdictKind::Inconclusive, Grade::F, None, INCONCLUSIVE_MESSAGE)
        } else {
            let percentage = round2(distance / avg * 100.0);
            if percentage >= HIGH_RISK_PERCENTAGE {
                (VerdictKind::HighRisk, Grade::F, Some(percentage), HIGH_RISK_MESSAGE)
            } else {
                (VerdictKind::LowRisk, Grade::A, Some(percentage), LOW_RISK_MESSAGE)
            }
        }
    };

    RiskVerdict {
        grade,
        kind,
        percentage,
        message: message.to_string(),
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_set_cannot_be_evaluated() {
        let v = classify(&[]);
        assert_eq!(v.kind, VerdictKind::NoResponses);
        assert_eq!(v.grade, Grade::F);
        assert_eq!(v.percentage, None);
    }

    #[test]
    fn identical_latencies_are_inconclusive() {
        let v = classify_samples(&[100.0, 100.0, 100.0]);
        assert_eq!(v.kind, VerdictKind::Inconclusive);
        assert_eq!(v.percentage, None);
        assert!(v.message.contains("did not vary"));
    }

    #[test]
    fn moderate_spread_is_low_risk() {
        // avg 276.67, distance 800
        let v = classify_samples(&[10.0, 10.0, 810.0]);
        assert_eq!(v.kind, VerdictKind::LowRisk);
        assert_eq!(v.grade, Grade::A);
        let pct = v.percentage.unwrap();
        assert!((pct - 289.16).abs() < 0.01, "got {}", pct);
    }

    #[test]
    fn huge_spread_is_high_risk() {
        // 100 samples of 1ms and one of 10_000ms: avg ≈ 100.0, distance 9999
        let mut samples = vec![1.0; 100];
        samples.push(10_000.0);
        let v = classify_samples(&samples);
        assert_eq!(v.kind, VerdictKind::HighRisk);
        assert_eq!(v.grade, Grade::F);
        assert!(v.percentage.unwrap() >= HIGH_RISK_PERCENTAGE);
    }

    #[test]
    fn threshold_is_inclusive() {
        // 80 samples of 0.0 and one of 81.0: avg 1.0, distance 81.0
        let mut samples = vec![0.0; 80];
        samples.push(81.0);
        assert_eq!(classify_samples(&samples).percentage, Some(8100.0));

        assert_eq!(round2(8000.004), 8000.0);
        assert!(round2(8000.004) >= HIGH_RISK_PERCENTAGE);
    }

    #[test]
    fn single_sample_is_inconclusive() {
        assert_eq!(classify_samples(&[42.0]).kind, VerdictKind::Inconclusive);
    }
}

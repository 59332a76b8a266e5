//! Priority scorer: Risk label and confidence to a 0-100 urgency score.

use crate::domain::RiskLevel;

/// Base score for labels outside the known risk set.
pub const UNMAPPED_BASE: i64 = 40;

/// Largest bonus confidence can add on top of the base.
pub const CONFIDENCE_WEIGHT: f64 = 20.0;

#[must_use]
pub fn base_priority(risk_label: &str) -> i64 {
    match RiskLevel::from_label(risk_label) {
        Some(RiskLevel::Low) => 25,
        Some(RiskLevel::Medium) => 55,
        Some(RiskLevel::High) => 80,
        None => UNMAPPED_BASE,
    }
}

/// Score = base + round(confidence * 20), clamped to [0, 100].
///
/// Halves round to even. A non-finite confidence adds nothing.
#[must_use]
pub fn priority_score(risk_label: &str, confidence: f64) -> u8 {
    let bonus = if confidence.is_finite() {
        (confidence * CONFIDENCE_WEIGHT).round_ties_even() as i64
    } else {
        0
    };
    (base_priority(risk_label) + bonus).clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        assert_eq!(priority_score("Low", 0.5), 35);
        assert_eq!(priority_score("Medium", 0.9), 73);
        assert_eq!(priority_score("High", 1.0), 100);
    }

    #[test]
    fn test_unknown_label_uses_fallback_base() {
        assert_eq!(priority_score("Critical", 0.0), 40);
        assert_eq!(priority_score("", 0.5), 50);
    }

    #[test]
    fn test_half_rounds_to_even() {
        // 0.525 * 20 = 10.5
        assert_eq!(priority_score("Low", 0.525), 35);
        // 0.575 * 20 = 11.5
        assert_eq!(priority_score("Low", 0.575), 37);
    }

    #[test]
    fn test_monotonic_and_bounded() {
        for label in ["Low", "Medium", "High", "Other"] {
            let mut previous = 0u8;
            for step in 0..=1000 {
                let confidence = f64::from(step) / 1000.0;
                let score = priority_score(label, confidence);
                assert!(score >= previous, "{label} not monotonic at {confidence}");
                assert!(score <= 100);
                previous = score;
            }
        }
    }

    #[test]
    fn test_out_of_range_confidence_is_clamped() {
        assert_eq!(priority_score("High", 5.0), 100);
        assert_eq!(priority_score("Low", -5.0), 0);
        assert_eq!(priority_score("Medium", f64::NAN), 55);
    }
}

//! Feature Similarity: per-dimension similarity between a profile and a case.
//!
//! Every function is pure and returns a value in [0, 1]. Missing data on either
//! side yields `NEUTRAL` instead of an error.

use crate::matching::majors::MajorCategory;
use crate::matching::tiers::Tier;
use crate::models::profile::{GpaScale, TestKind, TestScore};

/// Score used when either side lacks the data for a dimension.
pub const NEUTRAL: f64 = 0.5;

/// Tier similarity indexed by tier distance. Must be non-increasing.
const TIER_DECAY: [f64; 5] = [1.0, 0.7, 0.4, 0.1, 0.1];

const RELATED_MAJOR: f64 = 0.6;
const UNRELATED_MAJOR: f64 = 0.1;

/// Similarity for tests that cannot be put on a common scale (e.g. TOEFL vs GRE).
const UNRELATED_TEST: f64 = 0.3;

/// 100-point → 4.0 banding, highest threshold first.
const HUNDRED_POINT_BANDS: &[(f64, f64)] = &[
    (90.0, 4.0),
    (85.0, 3.7),
    (82.0, 3.3),
    (78.0, 3.0),
    (75.0, 2.7),
    (72.0, 2.3),
    (68.0, 2.0),
    (64.0, 1.7),
    (60.0, 1.0),
];

/// IELTS band → TOEFL iBT equivalent, highest band first.
const IELTS_TO_TOEFL: &[(f64, f64)] = &[
    (9.0, 118.0),
    (8.5, 115.0),
    (8.0, 110.0),
    (7.5, 102.0),
    (7.0, 94.0),
    (6.5, 79.0),
    (6.0, 60.0),
    (5.5, 46.0),
    (5.0, 35.0),
    (4.5, 32.0),
    (4.0, 31.0),
];

/// Converts a GPA on any supported scale to the 4.0 scale.
pub fn normalize_gpa(value: f64, scale: GpaScale) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    match scale {
        GpaScale::Four => value.min(4.0),
        GpaScale::Five => (value * 4.0 / 5.0).min(4.0),
        GpaScale::Hundred => HUNDRED_POINT_BANDS
            .iter()
            .find(|(threshold, _)| value >= *threshold)
            .map(|(_, gpa)| *gpa)
            .unwrap_or(0.0),
    }
}

/// `max(0, 1 - |a - b| / 4)` on the 4.0 scale.
pub fn gpa_similarity(profile_gpa: Option<f64>, case_gpa: Option<f64>) -> f64 {
    match (profile_gpa, case_gpa) {
        (Some(a), Some(b)) if a.is_finite() && b.is_finite() => {
            (1.0 - (a - b).abs() / 4.0).clamp(0.0, 1.0)
        }
        _ => NEUTRAL,
    }
}

pub fn tier_similarity(a: Tier, b: Tier) -> f64 {
    let distance = a.distance(b) as usize;
    TIER_DECAY[distance.min(TIER_DECAY.len() - 1)]
}

pub fn major_similarity(a: MajorCategory, b: MajorCategory) -> f64 {
    if a == b {
        1.0
    } else if a.is_related_to(b) {
        RELATED_MAJOR
    } else {
        UNRELATED_MAJOR
    }
}

/// Maps an IELTS band to its TOEFL iBT equivalent. Bands below 4.0 map to 0.
pub fn ielts_to_toefl(band: f64) -> f64 {
    IELTS_TO_TOEFL
        .iter()
        .find(|(threshold, _)| band >= *threshold)
        .map(|(_, toefl)| *toefl)
        .unwrap_or(0.0)
}

/// Standardized test similarity with IELTS scores converted onto the TOEFL scale.
pub fn test_similarity(profile_test: Option<&TestScore>, case_test: Option<&TestScore>) -> f64 {
    let (Some(a), Some(b)) = (profile_test, case_test) else {
        return NEUTRAL;
    };
    if !a.is_valid() || !b.is_valid() {
        return NEUTRAL;
    }

    let (a_score, b_score, scale_max) = match (a.kind, b.kind) {
        (x, y) if x == y => (a.total, b.total, x.scale_max()),
        (TestKind::Ielts, TestKind::Toefl) => {
            (ielts_to_toefl(a.total), b.total, TestKind::Toefl.scale_max())
        }
        (TestKind::Toefl, TestKind::Ielts) => {
            (a.total, ielts_to_toefl(b.total), TestKind::Toefl.scale_max())
        }
        _ => return UNRELATED_TEST,
    };

    (1.0 - (a_score - b_score).abs() / scale_max).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_gpa_similarity_formula() {
        assert!(approx(gpa_similarity(Some(3.5), Some(3.5)), 1.0));
        assert!(approx(gpa_similarity(Some(4.0), Some(0.0)), 0.0));
        assert!(approx(gpa_similarity(Some(3.0), Some(3.8)), 0.8));

        let grid: [f64; 7] = [0.0, 0.7, 1.5, 2.25, 3.0, 3.33, 4.0];
        for a in grid {
            for b in grid {
                let expected = (1.0 - (a - b).abs() / 4.0).max(0.0);
                assert!(approx(gpa_similarity(Some(a), Some(b)), expected), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_gpa_similarity_missing_is_neutral() {
        assert_eq!(gpa_similarity(None, Some(3.0)), NEUTRAL);
        assert_eq!(gpa_similarity(Some(3.0), None), NEUTRAL);
        assert_eq!(gpa_similarity(Some(f64::NAN), Some(3.0)), NEUTRAL);
    }

    #[test]
    fn test_hundred_point_banding() {
        assert_eq!(normalize_gpa(95.0, GpaScale::Hundred), 4.0);
        assert_eq!(normalize_gpa(90.0, GpaScale::Hundred), 4.0);
        assert_eq!(normalize_gpa(86.0, GpaScale::Hundred), 3.7);
        assert_eq!(normalize_gpa(80.0, GpaScale::Hundred), 3.0);
        assert_eq!(normalize_gpa(61.0, GpaScale::Hundred), 1.0);
        assert_eq!(normalize_gpa(59.9, GpaScale::Hundred), 0.0);
    }

    #[test]
    fn test_five_and_four_point_scales() {
        assert!(approx(normalize_gpa(4.5, GpaScale::Five), 3.6));
        assert_eq!(normalize_gpa(5.0, GpaScale::Five), 4.0);
        assert_eq!(normalize_gpa(3.7, GpaScale::Four), 3.7);
        assert_eq!(normalize_gpa(4.3, GpaScale::Four), 4.0);
        assert_eq!(normalize_gpa(-1.0, GpaScale::Four), 0.0);
    }

    #[test]
    fn test_tier_similarity_identity() {
        for tier in Tier::ALL {
            assert_eq!(tier_similarity(tier, tier), 1.0);
        }
    }

    #[test]
    fn test_tier_similarity_monotone_in_distance() {
        for a in Tier::ALL {
            for b in Tier::ALL {
                for c in Tier::ALL {
                    if a.distance(b) < a.distance(c) {
                        assert!(
                            tier_similarity(a, b) >= tier_similarity(a, c),
                            "{a}/{b} vs {a}/{c}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_tier_similarity_values() {
        assert_eq!(tier_similarity(Tier::One, Tier::Two), 0.7);
        assert_eq!(tier_similarity(Tier::One, Tier::Three), 0.4);
        assert_eq!(tier_similarity(Tier::Zero, Tier::Four), 0.1);
        assert!(tier_similarity(Tier::Zero, Tier::Four) > 0.0);
    }

    #[test]
    fn test_major_similarity() {
        use MajorCategory::*;
        assert_eq!(major_similarity(ComputerScience, ComputerScience), 1.0);
        assert_eq!(major_similarity(ComputerScience, ElectricalEngineering), 0.6);
        assert_eq!(major_similarity(Finance, Business), 0.6);
        assert_eq!(major_similarity(Finance, ComputerScience), 0.1);
        assert_eq!(major_similarity(Other, Other), 1.0);
    }

    #[test]
    fn test_same_test_type_similarity() {
        let a = TestScore::new(TestKind::Toefl, 100.0);
        let b = TestScore::new(TestKind::Toefl, 112.0);
        assert!(approx(test_similarity(Some(&a), Some(&b)), 0.9));
    }

    #[test]
    fn test_ielts_converted_before_comparison() {
        let ielts = TestScore::new(TestKind::Ielts, 7.5);
        let toefl = TestScore::new(TestKind::Toefl, 102.0);
        assert!(approx(test_similarity(Some(&ielts), Some(&toefl)), 1.0));
        assert!(approx(test_similarity(Some(&toefl), Some(&ielts)), 1.0));
    }

    #[test]
    fn test_unrelated_test_families() {
        let toefl = TestScore::new(TestKind::Toefl, 100.0);
        let gre = TestScore::new(TestKind::Gre, 320.0);
        let gmat = TestScore::new(TestKind::Gmat, 700.0);
        assert_eq!(test_similarity(Some(&toefl), Some(&gre)), UNRELATED_TEST);
        assert_eq!(test_similarity(Some(&gre), Some(&gmat)), UNRELATED_TEST);
    }

    #[test]
    fn test_missing_or_invalid_test_is_neutral() {
        let toefl = TestScore::new(TestKind::Toefl, 100.0);
        let zero = TestScore::new(TestKind::Toefl, 0.0);
        assert_eq!(test_similarity(None, Some(&toefl)), NEUTRAL);
        assert_eq!(test_similarity(Some(&toefl), None), NEUTRAL);
        assert_eq!(test_similarity(Some(&zero), Some(&toefl)), NEUTRAL);
    }

    #[test]
    fn test_ielts_table_is_monotone() {
        let mut previous = f64::INFINITY;
        for band in [9.0, 8.5, 8.0, 7.5, 7.0, 6.5, 6.0, 5.5, 5.0, 4.5, 4.0, 3.0] {
            let toefl = ielts_to_toefl(band);
            assert!(toefl <= previous);
            previous = toefl;
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::matching::majors::MajorCategory;
use crate::matching::tiers::Tier;
use crate::models::profile::TestScore;

/// A historical admission record. Owned by the case repository; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: i64,
    #[serde(default)]
    pub original_id: Option<i64>,
    /// GPA already converted to the 4.0 scale. `None` when the source row had none.
    #[serde(default)]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub major_category: MajorCategory,
    #[serde(default)]
    pub language_test: Option<TestScore>,
    #[serde(default)]
    pub gre_total: Option<f64>,
    #[serde(default)]
    pub gmat_total: Option<f64>,
    #[serde(default)]
    pub research_count: u32,
    #[serde(default)]
    pub internship_count: u32,
    #[serde(default)]
    pub work_years: f64,
    #[serde(default)]
    pub experience_text: String,
    #[serde(default)]
    pub admitted_university: String,
    #[serde(default)]
    pub admitted_program: String,
    #[serde(default)]
    pub admitted_country: String,
    #[serde(default)]
    pub admitted_degree_type: String,
    #[serde(default)]
    pub undergraduate_university: String,
    #[serde(default)]
    pub undergraduate_major: String,
}

impl CaseRecord {
    /// A bare record with the given id and everything else empty.
    #[cfg(test)]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            original_id: None,
            gpa: None,
            tier: Tier::default(),
            major_category: MajorCategory::default(),
            language_test: None,
            gre_total: None,
            gmat_total: None,
            research_count: 0,
            internship_count: 0,
            work_years: 0.0,
            experience_text: String::new(),
            admitted_university: String::new(),
            admitted_program: String::new(),
            admitted_country: String::new(),
            admitted_degree_type: String::new(),
            undergraduate_university: String::new(),
            undergraduate_major: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_json_with_sparse_fields() {
        let json = r#"{
            "id": 7,
            "gpa": 3.6,
            "tier": "Tier 1",
            "major_category": "CS",
            "language_test": {"kind": "IELTS", "total": 7.5},
            "admitted_university": "ETH Zurich",
            "admitted_country": "CH",
            "admitted_degree_type": "Master"
        }"#;
        let case: CaseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(case.id, 7);
        assert_eq!(case.tier, Tier::One);
        assert_eq!(case.major_category, MajorCategory::ComputerScience);
        assert!(case.experience_text.is_empty());
        assert_eq!(case.research_count, 0);
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Inference outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitiveness {
    pub strengths: String,
    pub weaknesses: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportingCase {
    pub case_id: String,
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub key_similarities: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolRecommendation {
    pub university: String,
    pub program: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub supporting_cases: Vec<SupportingCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub recommendations: Vec<SchoolRecommendation>,
    #[serde(alias = "analysis_summary")]
    pub summary: String,
}

impl Recommendations {
    pub fn empty(summary: impl Into<String>) -> Self {
        Self {
            recommendations: Vec::new(),
            summary: summary.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseComparison {
    #[serde(default)]
    pub gpa: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub experience: String,
}

/// Comparison of the applicant against one similar case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseAnalysis {
    /// Set from the ranked case, never trusted from model output.
    #[serde(default)]
    pub case_id: i64,
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub admitted_university: String,
    #[serde(default)]
    pub admitted_program: String,
    #[serde(default)]
    pub gpa: String,
    #[serde(default)]
    pub language_score: String,
    #[serde(default)]
    pub language_test_type: Option<String>,
    #[serde(default)]
    pub key_experiences: Option<String>,
    #[serde(default)]
    pub undergraduate_info: String,
    #[serde(default)]
    pub comparison: CaseComparison,
    #[serde(default)]
    pub success_factors: String,
    #[serde(default)]
    pub takeaways: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub timeframe: String,
    pub action: String,
    pub goal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementPlan {
    pub action_plan: Vec<ActionPlan>,
    #[serde(alias = "strategy_summary")]
    pub summary: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Capability vector
// ────────────────────────────────────────────────────────────────────────────

/// `[academic, language, research, internship, university]`, each in 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityVector([u8; 5]);

impl CapabilityVector {
    /// Used whenever scoring itself breaks.
    pub const FALLBACK: CapabilityVector = CapabilityVector([70, 65, 60, 55, 75]);

    /// Clamps every component into 0–100.
    pub fn new(
        academic: u8,
        language: u8,
        research: u8,
        internship: u8,
        university: u8,
    ) -> Self {
        Self([academic, language, research, internship, university].map(|v| v.min(100)))
    }

    pub fn academic(&self) -> u8 {
        self.0[0]
    }

    pub fn language(&self) -> u8 {
        self.0[1]
    }

    pub fn research(&self) -> u8 {
        self.0[2]
    }

    pub fn internship(&self) -> u8 {
        self.0[3]
    }

    pub fn university(&self) -> u8 {
        self.0[4]
    }

    pub fn as_array(&self) -> [u8; 5] {
        self.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Report
// ────────────────────────────────────────────────────────────────────────────

fn is_false(value: &bool) -> bool {
    !*value
}

/// Final analysis report. `degraded` and `partial_failures` are left out of the
/// payload entirely on a clean run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub competitiveness: Competitiveness,
    pub recommendations: Recommendations,
    pub similar_cases: Vec<CaseAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_plan: Option<ImprovementPlan>,
    pub capability_vector: CapabilityVector,
    #[serde(default, skip_serializing_if = "is_false")]
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub partial_failures: BTreeMap<String, String>,
}

impl Report {
    /// Builds the report; `degraded` is derived from `partial_failures`.
    pub fn assemble(
        competitiveness: Competitiveness,
        recommendations: Recommendations,
        similar_cases: Vec<CaseAnalysis>,
        improvement_plan: Option<ImprovementPlan>,
        capability_vector: CapabilityVector,
        partial_failures: BTreeMap<String, String>,
    ) -> Self {
        Self {
            competitiveness,
            recommendations,
            similar_cases,
            improvement_plan,
            capability_vector,
            degraded: !partial_failures.is_empty(),
            partial_failures,
        }
    }
}

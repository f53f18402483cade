//! Capability Scorer: the five-axis radar vector
//! `[academic, language, research, internship, university]`.
//!
//! Everything is local except the research and internship axes, which ask the
//! inference client for a qualitative 0–100 score. Those calls are single-shot:
//! a failed call scores the floor instead of failing the vector.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::{InferenceClient, PromptKind};
use crate::matching::similarity::normalize_gpa;
use crate::matching::tiers::TierResolver;
use crate::models::profile::{Experience, Profile, TestKind, TestScore};
use crate::models::report::CapabilityVector;

/// Experience axis score when the applicant lists no entries.
const ABSENT_EXPERIENCE: u8 = 30;
/// Lowest score for listed experience, also used when the scorer fails.
const EXPERIENCE_FLOOR: u8 = 50;
/// Language axis score when no test is present.
const NO_TEST: u8 = 50;
/// Clamp for the qualitative scorer's raw answer.
const QUALITATIVE_MIN: u8 = 30;
const QUALITATIVE_MAX: u8 = 100;

/// Per-test bands as `(lower bound, band midpoint)`, highest band first.
/// Anything below the last bound scores `BELOW_BANDS`.
const TOEFL_BANDS: &[(f64, u8)] = &[(110.0, 97), (100.0, 89), (90.0, 79), (80.0, 69), (70.0, 62)];
const IELTS_BANDS: &[(f64, u8)] = &[(8.0, 97), (7.5, 89), (7.0, 79), (6.5, 69), (6.0, 62)];
const GRE_BANDS: &[(f64, u8)] = &[(330.0, 97), (325.0, 89), (320.0, 79), (315.0, 69), (310.0, 62)];
const GMAT_BANDS: &[(f64, u8)] = &[(730.0, 97), (700.0, 89), (650.0, 79), (600.0, 69), (550.0, 62)];
const BELOW_BANDS: u8 = 29;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("non-finite {0} score")]
    NonFinite(&'static str),
}

fn bands(kind: TestKind) -> &'static [(f64, u8)] {
    match kind {
        TestKind::Toefl => TOEFL_BANDS,
        TestKind::Ielts => IELTS_BANDS,
        TestKind::Gre => GRE_BANDS,
        TestKind::Gmat => GMAT_BANDS,
    }
}

/// Banding midpoint for one test. Scores off the test's scale are ignored.
pub fn test_band_score(test: &TestScore) -> Option<u8> {
    if !test.is_valid() {
        return None;
    }
    let score = bands(test.kind)
        .iter()
        .find(|(lower, _)| test.total >= *lower)
        .map(|(_, midpoint)| *midpoint)
        .unwrap_or(BELOW_BANDS);
    Some(score)
}

pub fn language_score(tests: &[TestScore]) -> u8 {
    tests.iter().filter_map(test_band_score).max().unwrap_or(NO_TEST)
}

pub fn academic_score(profile: &Profile) -> Result<u8, CapabilityError> {
    let gpa = normalize_gpa(profile.gpa, profile.gpa_scale);
    let score = (gpa * 25.0).round();
    if !score.is_finite() {
        return Err(CapabilityError::NonFinite("academic"));
    }
    Ok(score.clamp(0.0, 100.0) as u8)
}

/// First integer in the answer, clamped to 30–100.
pub fn parse_qualitative(answer: &str) -> Option<u8> {
    let digits: String = answer
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let value: u64 = digits.parse().ok()?;
    Some(value.clamp(u64::from(QUALITATIVE_MIN), u64::from(QUALITATIVE_MAX)) as u8)
}

fn experience_text(entries: &[Experience]) -> String {
    entries
        .iter()
        .map(Experience::text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct CapabilityScorer {
    tiers: Arc<TierResolver>,
    qualitative: Arc<dyn InferenceClient>,
}

impl CapabilityScorer {
    pub fn new(tiers: Arc<TierResolver>, qualitative: Arc<dyn InferenceClient>) -> Self {
        Self { tiers, qualitative }
    }

    /// Never fails: any internal error yields `CapabilityVector::FALLBACK`.
    pub async fn score(&self, profile: &Profile) -> CapabilityVector {
        match self.try_score(profile).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("capability scoring failed, using fallback vector: {e}");
                CapabilityVector::FALLBACK
            }
        }
    }

    async fn try_score(&self, profile: &Profile) -> Result<CapabilityVector, CapabilityError> {
        let academic = academic_score(profile)?;
        let language = language_score(&profile.tests);
        let research = self
            .experience_score(PromptKind::ResearchScore, &profile.research_experiences)
            .await;
        let internship = self
            .experience_score(PromptKind::InternshipScore, &profile.internship_experiences)
            .await;

        let (tier_score, _) = self.tiers.resolve(&profile.institution);
        if !tier_score.is_finite() {
            return Err(CapabilityError::NonFinite("university"));
        }
        let university = tier_score.round().clamp(0.0, 100.0) as u8;

        let vector = CapabilityVector::new(academic, language, research, internship, university);
        debug!(
            academic = vector.academic(),
            language = vector.language(),
            research = vector.research(),
            internship = vector.internship(),
            university = vector.university(),
            "capability vector computed"
        );
        Ok(vector)
    }

    async fn experience_score(&self, kind: PromptKind, entries: &[Experience]) -> u8 {
        let text = experience_text(entries);
        if text.trim().is_empty() {
            return ABSENT_EXPERIENCE;
        }

        let raw = match self.qualitative.generate(kind, &Value::String(text)).await {
            Ok(Value::String(answer)) => parse_qualitative(&answer),
            Ok(Value::Number(n)) => n.as_u64().map(|v| v.min(u64::from(QUALITATIVE_MAX)) as u8),
            Ok(_) => None,
            Err(e) => {
                warn!(%kind, "qualitative scoring failed: {e}");
                None
            }
        };
        raw.unwrap_or(EXPERIENCE_FLOOR)
            .clamp(EXPERIENCE_FLOOR, QUALITATIVE_MAX)
    }
}

//! Inference steps: each analysis call as a typed, retried unit of work.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::analysis::retry::{RetryPolicy, StepError};
use crate::llm_client::{InferenceClient, PromptKind};
use crate::matching::ranker::SimilarityResult;
use crate::models::profile::Profile;
use crate::models::report::{CaseAnalysis, Competitiveness, ImprovementPlan, Recommendations};

/// Cases shown to the model when asking for school recommendations.
const RECOMMENDATION_CASES: usize = 20;

fn applicant(profile: &Profile) -> Value {
    serde_json::to_value(profile).unwrap_or_default()
}

fn case_summary(result: &SimilarityResult) -> Value {
    let case = &result.case;
    json!({
        "case_id": case.id.to_string(),
        "similarity_score": (result.score * 1000.0).round() / 1000.0,
        "admitted_university": case.admitted_university,
        "admitted_program": case.admitted_program,
        "gpa_4_scale": case.gpa,
        "undergraduate_university_tier": case.tier,
        "language_test": case.language_test,
    })
}

fn case_detail(result: &SimilarityResult) -> Value {
    let case = &result.case;
    json!({
        "admitted_university": case.admitted_university,
        "admitted_program": case.admitted_program,
        "gpa_4_scale": case.gpa,
        "undergraduate_university": case.undergraduate_university,
        "undergraduate_major": case.undergraduate_major,
        "language_test": case.language_test,
        "gre_total": case.gre_total,
        "gmat_total": case.gmat_total,
        "experience_text": case.experience_text,
    })
}

#[derive(Clone)]
pub struct InferenceSteps {
    client: Arc<dyn InferenceClient>,
    retry: RetryPolicy,
}

impl InferenceSteps {
    pub fn new(client: Arc<dyn InferenceClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// One retried inference call whose output must deserialize into `T`.
    /// Output of the wrong shape is fatal.
    async fn call<T: DeserializeOwned>(&self, kind: PromptKind, input: Value) -> Result<T, StepError> {
        let client = &self.client;
        let input = &input;
        self.retry
            .run(kind.name(), move || async move {
                let value = client.generate(kind, input).await?;
                serde_json::from_value::<T>(value)
                    .map_err(|e| StepError::Fatal(format!("unexpected {kind} output: {e}")))
            })
            .await
    }

    pub async fn assess_competitiveness(&self, profile: &Profile) -> Result<Competitiveness, StepError> {
        self.call(PromptKind::Competitiveness, json!({ "applicant": applicant(profile) }))
            .await
    }

    pub async fn recommend_schools(
        &self,
        profile: &Profile,
        cases: &[SimilarityResult],
    ) -> Result<Recommendations, StepError> {
        let cases: Vec<Value> = cases
            .iter()
            .take(RECOMMENDATION_CASES)
            .map(case_summary)
            .collect();
        self.call(
            PromptKind::SchoolRecommendations,
            json!({ "applicant": applicant(profile), "similar_cases": cases }),
        )
        .await
    }

    /// Identity and outcome fields come from the ranked case, not from the model.
    pub async fn analyze_case(
        &self,
        profile: &Profile,
        result: &SimilarityResult,
    ) -> Result<CaseAnalysis, StepError> {
        let mut analysis: CaseAnalysis = self
            .call(
                PromptKind::CaseAnalysis,
                json!({ "applicant": applicant(profile), "case": case_detail(result) }),
            )
            .await?;

        analysis.case_id = result.case_id;
        analysis.similarity_score = result.score;
        if !result.case.admitted_university.is_empty() {
            analysis.admitted_university = result.case.admitted_university.clone();
        }
        if !result.case.admitted_program.is_empty() {
            analysis.admitted_program = result.case.admitted_program.clone();
        }
        Ok(analysis)
    }

    pub async fn plan_improvement(
        &self,
        profile: &Profile,
        weaknesses: &str,
    ) -> Result<ImprovementPlan, StepError> {
        self.call(
            PromptKind::ImprovementPlan,
            json!({
                "applicant": applicant(profile),
                "weaknesses": weaknesses,
                "target_majors": profile.targets.majors,
            }),
        )
        .await
    }
}

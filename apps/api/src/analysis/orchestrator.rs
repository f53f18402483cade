//! Task Orchestrator: runs one analysis per submitted profile.
//!
//! Fixed sequence per task:
//!   1. rank similar cases            (not retried, failure fails the task)
//!   2. competitiveness assessment    (retried, failure fails the task)
//!   3. school recommendations        (retried, failure degrades the report)
//!   4. per-case analyses             (each retried, bounded concurrency, failures degrade)
//!   5. improvement plan              (retried, failure degrades; skipped with no weaknesses)
//!   6. capability vector             (local, never fails)
//!
//! Cancellation is cooperative: the flow checks the task status between steps and
//! stops advancing once it sees `cancelled`.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::capability::CapabilityScorer;
use crate::analysis::retry::StepError;
use crate::analysis::steps::InferenceSteps;
use crate::analysis::task_store::{CancelError, TaskStatus, TaskStatusView, TaskStore};
use crate::matching::matcher::CaseMatcher;
use crate::matching::ranker::SimilarityResult;
use crate::models::profile::Profile;
use crate::models::report::{CaseAnalysis, Recommendations, Report};

const NO_CASES_SUMMARY: &str =
    "No similar admission cases matched this profile, so no schools could be recommended.";
const RECOMMENDATIONS_UNAVAILABLE: &str = "School recommendations are unavailable for this analysis.";
const IMPROVEMENT_KEY: &str = "background_improvement";
const RECOMMENDATIONS_KEY: &str = "recommendations";

// Progress after each step.
const PROGRESS_RANKED: u8 = 10;
const PROGRESS_COMPETITIVENESS: u8 = 25;
const PROGRESS_RECOMMENDATIONS: u8 = 40;
const PROGRESS_CASES_DONE: u8 = 80;
const PROGRESS_IMPROVEMENT: u8 = 90;
const PROGRESS_CAPABILITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// How many ranked cases feed the analysis.
    pub similar_cases_limit: usize,
    /// How many of the top cases get an individual analysis.
    pub case_analysis_limit: usize,
    pub case_analysis_concurrency: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            similar_cases_limit: 150,
            case_analysis_limit: 20,
            case_analysis_concurrency: 4,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("task {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Cancel(#[from] CancelError),
}

/// Why a flow stopped before assembling a report.
enum Halt {
    Cancelled,
    Failed(String),
}

pub struct Orchestrator {
    matcher: Arc<CaseMatcher>,
    steps: InferenceSteps,
    scorer: Arc<CapabilityScorer>,
    store: Arc<TaskStore>,
    settings: AnalysisSettings,
}

impl Orchestrator {
    pub fn new(
        matcher: Arc<CaseMatcher>,
        steps: InferenceSteps,
        scorer: Arc<CapabilityScorer>,
        store: Arc<TaskStore>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            matcher,
            steps,
            scorer,
            store,
            settings,
        }
    }

    /// Validates the profile, registers a pending task and starts its flow.
    pub async fn submit(self: &Arc<Self>, profile: Profile) -> Result<Uuid, AnalysisError> {
        profile.validate().map_err(AnalysisError::InvalidInput)?;

        let id = self.store.create(Arc::new(profile)).await;
        info!(task_id = %id, "analysis task submitted");

        let this = Arc::clone(self);
        tokio::spawn(async move { this.execute(id).await });
        Ok(id)
    }

    pub async fn status(&self, id: Uuid) -> Result<TaskStatusView, AnalysisError> {
        self.store
            .status_view(id)
            .await
            .ok_or(AnalysisError::NotFound(id))
    }

    pub async fn cancel(&self, id: Uuid) -> Result<TaskStatus, AnalysisError> {
        let previous = self.store.cancel(id).await?;
        info!(task_id = %id, from = %previous, "analysis task cancelled");
        Ok(previous)
    }

    async fn execute(&self, id: Uuid) {
        let Some(profile) = self.store.begin(id).await else {
            info!(task_id = %id, "task cancelled before it started");
            return;
        };

        match self.run(id, &profile).await {
            Ok(report) => {
                let degraded = report.degraded;
                let failures = report.partial_failures.len();
                if self.store.complete(id, report).await {
                    info!(task_id = %id, degraded, failures, "analysis completed");
                }
            }
            Err(Halt::Cancelled) => info!(task_id = %id, "task cancelled, flow stopped"),
            Err(Halt::Failed(message)) => {
                error!(task_id = %id, "analysis failed: {message}");
                self.store.fail(id, message).await;
            }
        }
    }

    /// Stops the flow if the task was cancelled, otherwise records progress.
    async fn checkpoint(&self, id: Uuid, progress: u8) -> Result<(), Halt> {
        if self.store.is_cancelled(id).await {
            return Err(Halt::Cancelled);
        }
        self.store.set_progress(id, progress).await;
        Ok(())
    }

    async fn run(&self, id: Uuid, profile: &Arc<Profile>) -> Result<Report, Halt> {
        let mut partial_failures = BTreeMap::new();

        let ranked = self
            .matcher
            .rank(Arc::clone(profile), self.settings.similar_cases_limit)
            .await
            .map_err(|e| Halt::Failed(format!("similar case lookup failed: {e}")))?;
        info!(task_id = %id, cases = ranked.len(), "similar cases ranked");
        self.checkpoint(id, PROGRESS_RANKED).await?;

        let competitiveness = self
            .steps
            .assess_competitiveness(profile)
            .await
            .map_err(|e| Halt::Failed(format!("competitiveness analysis failed: {e}")))?;
        self.checkpoint(id, PROGRESS_COMPETITIVENESS).await?;

        let recommendations = if ranked.is_empty() {
            Recommendations::empty(NO_CASES_SUMMARY)
        } else {
            match self.steps.recommend_schools(profile, &ranked).await {
                Ok(recommendations) => recommendations,
                Err(e) => {
                    warn!(task_id = %id, "school recommendations failed: {e}");
                    partial_failures.insert(RECOMMENDATIONS_KEY.to_string(), e.to_string());
                    Recommendations::empty(RECOMMENDATIONS_UNAVAILABLE)
                }
            }
        };
        self.checkpoint(id, PROGRESS_RECOMMENDATIONS).await?;

        let top = &ranked[..ranked.len().min(self.settings.case_analysis_limit)];
        let similar_cases = self
            .analyze_cases(id, profile, top, &mut partial_failures)
            .await?;
        self.checkpoint(id, PROGRESS_CASES_DONE).await?;

        let improvement_plan = if competitiveness.weaknesses.trim().is_empty() {
            None
        } else {
            match self
                .steps
                .plan_improvement(profile, &competitiveness.weaknesses)
                .await
            {
                Ok(plan) => Some(plan),
                Err(e) => {
                    warn!(task_id = %id, "improvement plan failed: {e}");
                    partial_failures.insert(IMPROVEMENT_KEY.to_string(), e.to_string());
                    None
                }
            }
        };
        self.checkpoint(id, PROGRESS_IMPROVEMENT).await?;

        let capability_vector = self.scorer.score(profile).await;
        self.checkpoint(id, PROGRESS_CAPABILITY).await?;

        Ok(Report::assemble(
            competitiveness,
            recommendations,
            similar_cases,
            improvement_plan,
            capability_vector,
            partial_failures,
        ))
    }

    /// Analyzes `cases` concurrently. Successful analyses come back in rank order;
    /// failures are recorded as `case_<rank>` (1-based).
    async fn analyze_cases(
        &self,
        id: Uuid,
        profile: &Arc<Profile>,
        cases: &[SimilarityResult],
        partial_failures: &mut BTreeMap<String, String>,
    ) -> Result<Vec<CaseAnalysis>, Halt> {
        if cases.is_empty() {
            return Ok(Vec::new());
        }

        let permits = Arc::new(Semaphore::new(self.settings.case_analysis_concurrency.max(1)));
        let mut set = JoinSet::new();
        for (rank, result) in cases.iter().cloned().enumerate() {
            let steps = self.steps.clone();
            let profile = Arc::clone(profile);
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                (rank, steps.analyze_case(&profile, &result).await)
            });
        }

        let total = cases.len();
        let mut outcomes: Vec<Option<Result<CaseAnalysis, StepError>>> = vec![None; total];
        let mut done = 0;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((rank, outcome)) => outcomes[rank] = Some(outcome),
                Err(e) => warn!(task_id = %id, "case analysis worker failed: {e}"),
            }
            done += 1;

            if self.store.is_cancelled(id).await {
                set.abort_all();
                return Err(Halt::Cancelled);
            }
            let span = usize::from(PROGRESS_CASES_DONE - PROGRESS_RECOMMENDATIONS);
            let progress = PROGRESS_RECOMMENDATIONS as usize + span * done / total;
            self.store.set_progress(id, progress as u8).await;
        }

        let mut analyses = Vec::with_capacity(total);
        for (rank, outcome) in outcomes.into_iter().enumerate() {
            let key = format!("case_{}", rank + 1);
            match outcome {
                Some(Ok(analysis)) => analyses.push(analysis),
                Some(Err(e)) => {
                    warn!(task_id = %id, case = %key, "case analysis failed: {e}");
                    partial_failures.insert(key, e.to_string());
                }
                None => {
                    partial_failures.insert(key, "case analysis did not complete".to_string());
                }
            }
        }
        Ok(analyses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::retry::testing::instant_policy;
    use crate::llm_client::testing::FakeInference;
    use crate::llm_client::{InferenceClient, InferenceError, PromptKind};
    use crate::matching::ranker::fixtures::case;
    use crate::matching::ranker::{RankingWeights, SimilarityRanker};
    use crate::matching::tiers::{Tier, TierResolver};
    use crate::models::case::CaseRecord;
    use crate::models::profile::fixtures::profile;
    use crate::repository::{CaseRepository, InMemoryCaseRepository, RepositoryError};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn happy(kind: PromptKind, _input: &Value) -> Result<Value, InferenceError> {
        Ok(match kind {
            PromptKind::Competitiveness => json!({
                "strengths": "strong GPA",
                "weaknesses": "little research",
                "summary": "competitive"
            }),
            PromptKind::SchoolRecommendations => json!({
                "recommendations": [{
                    "university": "University 1",
                    "program": "MS CS",
                    "reason": "similar GPA",
                    "supporting_cases": [{"case_id": "1", "similarity_score": 0.9}]
                }],
                "summary": "good fit"
            }),
            PromptKind::CaseAnalysis => json!({"success_factors": "research", "takeaways": "publish"}),
            PromptKind::ImprovementPlan => json!({
                "action_plan": [{"timeframe": "1-3 months", "action": "join a lab", "goal": "paper"}],
                "summary": "build research"
            }),
            PromptKind::ResearchScore | PromptKind::InternshipScore => json!("75"),
        })
    }

    struct DownRepository;

    #[async_trait]
    impl CaseRepository for DownRepository {
        async fn get_all_cases(&self) -> Result<Vec<CaseRecord>, RepositoryError> {
            Err(RepositoryError::Unavailable("connection refused".to_string()))
        }

        fn describe(&self) -> String {
            "down".to_string()
        }
    }

    fn build(
        repository: Arc<dyn CaseRepository>,
        client: Arc<dyn InferenceClient>,
        settings: AnalysisSettings,
    ) -> Arc<Orchestrator> {
        let tiers = Arc::new(TierResolver::default());
        let ranker = SimilarityRanker::new(Arc::clone(&tiers), RankingWeights::default());
        let matcher = Arc::new(CaseMatcher::new(repository, ranker));
        let (policy, _) = instant_policy(0.5);
        let steps = InferenceSteps::new(Arc::clone(&client), policy);
        let scorer = Arc::new(CapabilityScorer::new(tiers, client));
        Arc::new(Orchestrator::new(
            matcher,
            steps,
            scorer,
            Arc::new(TaskStore::default()),
            settings,
        ))
    }

    fn orchestrator_with(
        repository: Arc<dyn CaseRepository>,
        fake: Arc<FakeInference>,
    ) -> Arc<Orchestrator> {
        build(repository, fake, AnalysisSettings::default())
    }

    /// Answers like `happy`, but each case analysis reports itself as started,
    /// tracks how many are in flight, and waits for the gate to open.
    struct GatedCases {
        gate: Semaphore,
        started: Notify,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: Mutex<Vec<PromptKind>>,
    }

    impl GatedCases {
        fn new(open: bool) -> Self {
            Self {
                gate: Semaphore::new(if open { Semaphore::MAX_PERMITS } else { 0 }),
                started: Notify::new(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn count(&self, kind: PromptKind) -> usize {
            self.calls.lock().unwrap().iter().filter(|k| **k == kind).count()
        }
    }

    #[async_trait]
    impl InferenceClient for GatedCases {
        async fn generate(&self, kind: PromptKind, input: &Value) -> Result<Value, InferenceError> {
            self.calls.lock().unwrap().push(kind);
            if kind == PromptKind::CaseAnalysis {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                self.started.notify_one();
                let _open = self.gate.acquire().await;
                tokio::task::yield_now().await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            happy(kind, input)
        }

        fn name(&self) -> String {
            "gated".to_string()
        }
    }

    fn orchestrator(cases: Vec<CaseRecord>, fake: Arc<FakeInference>) -> Arc<Orchestrator> {
        orchestrator_with(Arc::new(InMemoryCaseRepository::new(cases)), fake)
    }

    /// Registers a task and drives its flow to the end on the current task.
    async fn run_task(orchestrator: &Orchestrator) -> TaskStatusView {
        let id = orchestrator.store.create(Arc::new(profile())).await;
        orchestrator.execute(id).await;
        orchestrator.status(id).await.unwrap()
    }

    fn identical_cases(n: i64) -> Vec<CaseRecord> {
        (1..=n).map(|id| case(id, Tier::One, 3.5)).collect()
    }

    #[tokio::test]
    async fn test_end_to_end_ranks_tier_one_case_first() {
        let fake = Arc::new(FakeInference::new("fake", happy));
        let orch = orchestrator(
            vec![case(1, Tier::Four, 2.0), case(2, Tier::One, 3.6)],
            fake,
        );

        let view = run_task(&orch).await;
        assert_eq!(view.status, TaskStatus::Completed);
        assert_eq!(view.progress, 100);
        let report = view.result.unwrap();
        assert_eq!(report.similar_cases[0].case_id, 2);
        assert_eq!(report.similar_cases[1].case_id, 1);
        assert!(report.similar_cases[0].similarity_score > report.similar_cases[1].similarity_score);
        assert!(!report.degraded);
        assert!(report.improvement_plan.is_some());
        assert_eq!(report.capability_vector.as_array().len(), 5);
    }

    #[tokio::test]
    async fn test_one_failed_case_degrades_report() {
        let fake = Arc::new(FakeInference::new("fake", |kind, input| {
            if kind == PromptKind::CaseAnalysis
                && input["case"]["admitted_university"] == "University 2"
            {
                return Err(InferenceError::Api {
                    status: 503,
                    message: "overloaded".to_string(),
                });
            }
            happy(kind, input)
        }));
        let orch = orchestrator(identical_cases(3), fake.clone());

        let view = run_task(&orch).await;
        assert_eq!(view.status, TaskStatus::Completed);
        let report = view.result.unwrap();
        let ids: Vec<i64> = report.similar_cases.iter().map(|a| a.case_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(report.degraded);
        assert_eq!(report.partial_failures.len(), 1);
        assert!(report.partial_failures.contains_key("case_2"));
        // 2 successes plus 3 attempts for the failing case.
        assert_eq!(fake.count(PromptKind::CaseAnalysis), 5);
    }

    #[tokio::test]
    async fn test_analyses_keep_rank_order_under_concurrency() {
        let fake = Arc::new(FakeInference::new("fake", happy));
        let orch = orchestrator(identical_cases(9), fake);
        let report = run_task(&orch).await.result.unwrap();
        let ids: Vec<i64> = report.similar_cases.iter().map(|a| a.case_id).collect();
        assert_eq!(ids, (1..=9).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_case_analysis_is_capped() {
        let fake = Arc::new(FakeInference::new("fake", happy));
        let orch = orchestrator(identical_cases(25), fake.clone());
        let report = run_task(&orch).await.result.unwrap();
        assert_eq!(report.similar_cases.len(), 20);
        assert_eq!(fake.count(PromptKind::CaseAnalysis), 20);
    }

    #[tokio::test]
    async fn test_competitiveness_failure_fails_task() {
        let fake = Arc::new(FakeInference::new("fake", |kind, input| {
            if kind == PromptKind::Competitiveness {
                return Err(InferenceError::Api {
                    status: 401,
                    message: "invalid key".to_string(),
                });
            }
            happy(kind, input)
        }));
        let orch = orchestrator(identical_cases(2), fake.clone());

        let view = run_task(&orch).await;
        assert_eq!(view.status, TaskStatus::Failed);
        assert!(view.error.unwrap().contains("competitiveness"));
        assert!(view.result.is_none());
        assert_eq!(fake.count(PromptKind::Competitiveness), 1);
        assert_eq!(fake.count(PromptKind::CaseAnalysis), 0);
    }

    #[tokio::test]
    async fn test_repository_outage_fails_task() {
        let fake = Arc::new(FakeInference::new("fake", happy));
        let orch = orchestrator_with(Arc::new(DownRepository), fake.clone());

        let view = run_task(&orch).await;
        assert_eq!(view.status, TaskStatus::Failed);
        assert!(view.error.unwrap().contains("connection refused"));
        assert_eq!(fake.total(), 0);
    }

    #[tokio::test]
    async fn test_empty_corpus_skips_recommendation_call() {
        let fake = Arc::new(FakeInference::new("fake", happy));
        let orch = orchestrator(vec![], fake.clone());

        let view = run_task(&orch).await;
        assert_eq!(view.status, TaskStatus::Completed);
        let report = view.result.unwrap();
        assert!(report.recommendations.recommendations.is_empty());
        assert_eq!(report.recommendations.summary, NO_CASES_SUMMARY);
        assert!(report.similar_cases.is_empty());
        assert!(!report.degraded);
        assert_eq!(fake.count(PromptKind::SchoolRecommendations), 0);
    }

    #[tokio::test]
    async fn test_recommendation_failure_is_partial() {
        let fake = Arc::new(FakeInference::new("fake", |kind, input| {
            if kind == PromptKind::SchoolRecommendations {
                return Err(InferenceError::Malformed("truncated".to_string()));
            }
            happy(kind, input)
        }));
        let orch = orchestrator(identical_cases(2), fake);

        let view = run_task(&orch).await;
        assert_eq!(view.status, TaskStatus::Completed);
        let report = view.result.unwrap();
        assert!(report.degraded);
        assert!(report.partial_failures.contains_key(RECOMMENDATIONS_KEY));
        assert_eq!(report.similar_cases.len(), 2);
    }

    #[tokio::test]
    async fn test_no_weaknesses_skips_improvement_plan() {
        let fake = Arc::new(FakeInference::new("fake", |kind, input| {
            if kind == PromptKind::Competitiveness {
                return Ok(json!({"strengths": "everything", "weaknesses": "", "summary": "top"}));
            }
            happy(kind, input)
        }));
        let orch = orchestrator(identical_cases(1), fake.clone());

        let report = run_task(&orch).await.result.unwrap();
        assert!(report.improvement_plan.is_none());
        assert!(!report.degraded);
        assert_eq!(fake.count(PromptKind::ImprovementPlan), 0);
    }

    #[tokio::test]
    async fn test_improvement_failure_is_partial() {
        let fake = Arc::new(FakeInference::new("fake", |kind, input| {
            if kind == PromptKind::ImprovementPlan {
                return Err(InferenceError::Timeout);
            }
            happy(kind, input)
        }));
        let orch = orchestrator(identical_cases(1), fake);

        let report = run_task(&orch).await.result.unwrap();
        assert!(report.improvement_plan.is_none());
        assert!(report.partial_failures.contains_key(IMPROVEMENT_KEY));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_runs() {
        let fake = Arc::new(FakeInference::new("fake", happy));
        let orch = orchestrator(identical_cases(2), fake.clone());

        let id = orch.store.create(Arc::new(profile())).await;
        assert_eq!(orch.cancel(id).await.unwrap(), TaskStatus::Pending);
        orch.execute(id).await;

        let view = orch.status(id).await.unwrap();
        assert_eq!(view.status, TaskStatus::Cancelled);
        assert_eq!(fake.total(), 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_profile() {
        let fake = Arc::new(FakeInference::new("fake", happy));
        let orch = orchestrator(identical_cases(1), fake);

        let mut invalid = profile();
        invalid.major = String::new();
        let err = orch.submit(invalid).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
        assert_eq!(orch.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_submit_then_poll_then_cancel_rejected() {
        let fake = Arc::new(FakeInference::new("fake", happy));
        let orch = orchestrator(identical_cases(3), fake);

        let id = orch.submit(profile()).await.unwrap();
        let mut status = TaskStatus::Pending;
        for _ in 0..500 {
            status = orch.status(id).await.unwrap().status;
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(status, TaskStatus::Completed);

        let err = orch.cancel(id).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Cancel(CancelError::AlreadyTerminal { .. })
        ));
        assert!(matches!(
            orch.status(Uuid::new_v4()).await,
            Err(AnalysisError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_case_analysis_concurrency_is_bounded() {
        let client = Arc::new(GatedCases::new(true));
        let settings = AnalysisSettings {
            case_analysis_concurrency: 2,
            ..AnalysisSettings::default()
        };
        let orch = build(
            Arc::new(InMemoryCaseRepository::new(identical_cases(8))),
            client.clone(),
            settings,
        );

        let view = run_task(&orch).await;
        assert_eq!(view.status, TaskStatus::Completed);
        assert_eq!(client.count(PromptKind::CaseAnalysis), 8);
        assert_eq!(client.peak.load(Ordering::SeqCst), settings.case_analysis_concurrency);
    }

    #[tokio::test]
    async fn test_cancel_while_processing_stops_the_flow() {
        let client = Arc::new(GatedCases::new(false));
        let orch = build(
            Arc::new(InMemoryCaseRepository::new(identical_cases(3))),
            client.clone(),
            AnalysisSettings::default(),
        );

        let id = orch.store.create(Arc::new(profile())).await;
        let flow = tokio::spawn({
            let orch = Arc::clone(&orch);
            async move { orch.execute(id).await }
        });

        client.started.notified().await;
        assert_eq!(orch.cancel(id).await.unwrap(), TaskStatus::Processing);
        client.gate.add_permits(Semaphore::MAX_PERMITS);
        flow.await.unwrap();

        let view = orch.status(id).await.unwrap();
        assert_eq!(view.status, TaskStatus::Cancelled);
        assert!(view.result.is_none());
        assert!(view.error.is_none());
        assert_eq!(client.count(PromptKind::ImprovementPlan), 0);
    }
}

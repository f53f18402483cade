//! Similarity Ranker: scores every corpus case against a profile and keeps the top N.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::majors::categorize_major;
use crate::matching::similarity::{
    gpa_similarity, major_similarity, normalize_gpa, test_similarity, tier_similarity, NEUTRAL,
};
use crate::matching::text_index::TextIndex;
use crate::matching::tiers::TierResolver;
use crate::models::case::CaseRecord;
use crate::models::profile::Profile;

// ────────────────────────────────────────────────────────────────────────────
// Weights
// ────────────────────────────────────────────────────────────────────────────

/// Per-dimension weights. Expected to sum to 1.0 so the aggregate stays in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub major: f64,
    pub gpa: f64,
    pub tier: f64,
    pub language: f64,
    pub experience: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            major: 0.25,
            gpa: 0.25,
            tier: 0.40,
            language: 0.05,
            experience: 0.05,
        }
    }
}

impl RankingWeights {
    pub fn combine(&self, c: &ComponentScores) -> f64 {
        let total = self.major * c.major
            + self.gpa * c.gpa
            + self.tier * c.tier
            + self.language * c.language
            + self.experience * c.experience;
        total.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentScores {
    pub major: f64,
    pub gpa: f64,
    pub tier: f64,
    pub language: f64,
    pub experience: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarityResult {
    pub case_id: i64,
    pub score: f64,
    pub components: ComponentScores,
    pub case: CaseRecord,
}

// ────────────────────────────────────────────────────────────────────────────
// Corpus snapshot
// ────────────────────────────────────────────────────────────────────────────

/// One loaded corpus plus the text index fitted over it. Never mutated after build;
/// a reload produces a new snapshot with a higher version.
#[derive(Debug)]
pub struct CorpusSnapshot {
    pub version: u64,
    pub loaded_at: DateTime<Utc>,
    pub cases: Vec<CaseRecord>,
    text_index: Option<TextIndex>,
}

impl CorpusSnapshot {
    pub fn build(version: u64, cases: Vec<CaseRecord>) -> Self {
        let texts: Vec<&str> = cases.iter().map(|c| c.experience_text.as_str()).collect();
        let text_index = TextIndex::fit(&texts);
        Self {
            version,
            loaded_at: Utc::now(),
            cases,
            text_index,
        }
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.text_index.as_ref().map_or(0, TextIndex::vocabulary_size)
    }

    pub fn case(&self, id: i64) -> Option<&CaseRecord> {
        self.cases.iter().find(|c| c.id == id)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ranker
// ────────────────────────────────────────────────────────────────────────────

fn matches_ignore_case(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Indices of cases admitted to one of the target countries with the target degree.
/// Falls back to every case when nothing survives the filter.
fn candidate_indices(profile: &Profile, cases: &[CaseRecord]) -> Vec<usize> {
    let countries = &profile.targets.countries;
    let degree = profile
        .targets
        .degree_type
        .as_deref()
        .filter(|d| !d.trim().is_empty());

    let filtered: Vec<usize> = cases
        .iter()
        .enumerate()
        .filter(|(_, case)| {
            countries.is_empty()
                || countries
                    .iter()
                    .any(|c| matches_ignore_case(c, &case.admitted_country))
        })
        .filter(|(_, case)| degree.map_or(true, |d| matches_ignore_case(d, &case.admitted_degree_type)))
        .map(|(i, _)| i)
        .collect();

    if filtered.is_empty() {
        (0..cases.len()).collect()
    } else {
        filtered
    }
}

#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    tiers: Arc<TierResolver>,
    weights: RankingWeights,
}

impl SimilarityRanker {
    pub fn new(tiers: Arc<TierResolver>, weights: RankingWeights) -> Self {
        Self { tiers, weights }
    }

    pub fn tiers(&self) -> &Arc<TierResolver> {
        &self.tiers
    }

    /// Ranks the snapshot against `profile`, best first. Equal scores are ordered by
    /// ascending case id. An empty corpus gives an empty result.
    pub fn rank(
        &self,
        profile: &Profile,
        snapshot: &CorpusSnapshot,
        top_n: usize,
    ) -> Vec<SimilarityResult> {
        let candidates = candidate_indices(profile, &snapshot.cases);
        if candidates.is_empty() {
            return Vec::new();
        }

        let profile_gpa = (profile.gpa > 0.0).then(|| normalize_gpa(profile.gpa, profile.gpa_scale));
        let profile_tier = self.tiers.tier_of(&profile.institution);
        let profile_major = categorize_major(&profile.major);
        let profile_test = profile.language_test();

        let profile_text = profile.experience_text();
        let query = match &snapshot.text_index {
            Some(index) if !profile_text.trim().is_empty() => Some((index, index.transform(&profile_text))),
            _ => None,
        };

        let mut results: Vec<SimilarityResult> = candidates
            .into_iter()
            .map(|i| {
                let case = &snapshot.cases[i];
                let components = ComponentScores {
                    major: major_similarity(profile_major, case.major_category),
                    gpa: gpa_similarity(profile_gpa, case.gpa),
                    tier: tier_similarity(profile_tier, case.tier),
                    language: test_similarity(profile_test, case.language_test.as_ref()),
                    experience: query
                        .as_ref()
                        .map_or(NEUTRAL, |(index, vector)| index.similarity(vector, i)),
                };
                SimilarityResult {
                    case_id: case.id,
                    score: self.weights.combine(&components),
                    components,
                    case: case.clone(),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.case_id.cmp(&b.case_id))
        });
        results.truncate(top_n.clamp(1, results.len()));
        results
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::case;
    use super::*;
    use crate::matching::tiers::Tier;
    use crate::models::profile::fixtures::profile;

    fn ranker() -> SimilarityRanker {
        SimilarityRanker::new(Arc::new(TierResolver::default()), RankingWeights::default())
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = RankingWeights::default();
        let sum = w.major + w.gpa + w.tier + w.language + w.experience;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tier_one_case_ranks_above_tier_four() {
        // 浙江大学 is a tier-1 institution in the built-in table.
        let snapshot = CorpusSnapshot::build(1, vec![case(1, Tier::Four, 2.0), case(2, Tier::One, 3.6)]);
        let results = ranker().rank(&profile(), &snapshot, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].case_id, 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].components.tier, 1.0);
    }

    #[test]
    fn test_ties_break_by_case_id() {
        let snapshot = CorpusSnapshot::build(
            1,
            vec![
                case(30, Tier::One, 3.5),
                case(10, Tier::One, 3.5),
                case(20, Tier::One, 3.5),
            ],
        );
        let first = ranker().rank(&profile(), &snapshot, 10);
        let ids: Vec<i64> = first.iter().map(|r| r.case_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);

        let second = ranker().rank(&profile(), &snapshot, 10);
        assert_eq!(ids, second.iter().map(|r| r.case_id).collect::<Vec<_>>());
    }

    #[test]
    fn test_filter_falls_back_to_full_corpus() {
        let mut uk = case(1, Tier::One, 3.5);
        uk.admitted_country = "UK".to_string();
        let mut phd = case(2, Tier::Two, 3.0);
        phd.admitted_country = "UK".to_string();
        phd.admitted_degree_type = "PhD".to_string();
        let snapshot = CorpusSnapshot::build(1, vec![uk, phd]);

        let results = ranker().rank(&profile(), &snapshot, 10);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_filter_keeps_matching_cases_only() {
        let mut uk = case(1, Tier::One, 3.5);
        uk.admitted_country = "UK".to_string();
        let us = case(2, Tier::Four, 2.0);
        let snapshot = CorpusSnapshot::build(1, vec![uk, us]);

        let results = ranker().rank(&profile(), &snapshot, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].case_id, 2);
    }

    #[test]
    fn test_top_n_is_clamped() {
        let cases = (1..=5).map(|id| case(id, Tier::Two, 3.0)).collect();
        let snapshot = CorpusSnapshot::build(1, cases);
        assert_eq!(ranker().rank(&profile(), &snapshot, 0).len(), 1);
        assert_eq!(ranker().rank(&profile(), &snapshot, 3).len(), 3);
        assert_eq!(ranker().rank(&profile(), &snapshot, 500).len(), 5);
    }

    #[test]
    fn test_empty_corpus_is_empty_result() {
        let snapshot = CorpusSnapshot::build(1, vec![]);
        assert!(ranker().rank(&profile(), &snapshot, 10).is_empty());
    }

    #[test]
    fn test_scores_and_components_are_bounded() {
        let mut blank = CaseRecord::new(9);
        blank.admitted_country = "US".to_string();
        let snapshot = CorpusSnapshot::build(1, vec![case(1, Tier::Zero, 4.0), blank]);
        for result in ranker().rank(&profile(), &snapshot, 10) {
            assert!((0.0..=1.0).contains(&result.score));
            let c = result.components;
            for v in [c.major, c.gpa, c.tier, c.language, c.experience] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_experience_without_profile_text_is_neutral() {
        let mut with_text = case(1, Tier::One, 3.5);
        with_text.experience_text = "computer vision lab".to_string();
        let snapshot = CorpusSnapshot::build(1, vec![with_text]);
        assert!(snapshot.vocabulary_size() > 0);

        let results = ranker().rank(&profile(), &snapshot, 1);
        assert_eq!(results[0].components.experience, NEUTRAL);
    }
}

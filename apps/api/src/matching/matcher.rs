//! Case Matcher: owns the loaded corpus snapshot and runs rankings against it.
//!
//! The corpus is loaded lazily on first use. `refresh` builds a complete new snapshot
//! and swaps it in; rankings already running keep the snapshot they started with.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::matching::ranker::{CorpusSnapshot, SimilarityRanker, SimilarityResult};
use crate::models::case::CaseRecord;
use crate::models::profile::Profile;
use crate::repository::{CaseRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    DependencyUnavailable(#[from] RepositoryError),

    #[error("ranking worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub struct CaseMatcher {
    repository: Arc<dyn CaseRepository>,
    ranker: SimilarityRanker,
    snapshot: RwLock<Option<Arc<CorpusSnapshot>>>,
    /// Serializes loads so concurrent first requests hit the repository once.
    load_lock: Mutex<()>,
    next_version: AtomicU64,
}

impl CaseMatcher {
    pub fn new(repository: Arc<dyn CaseRepository>, ranker: SimilarityRanker) -> Self {
        Self {
            repository,
            ranker,
            snapshot: RwLock::new(None),
            load_lock: Mutex::new(()),
            next_version: AtomicU64::new(1),
        }
    }

    pub fn ranker(&self) -> &SimilarityRanker {
        &self.ranker
    }

    pub fn repository_label(&self) -> String {
        self.repository.describe()
    }

    /// Whether a snapshot is loaded. Never triggers a load.
    pub async fn is_loaded(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    /// Current snapshot, loading it on first call.
    pub async fn snapshot(&self) -> Result<Arc<CorpusSnapshot>, MatchError> {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let _guard = self.load_lock.lock().await;
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        self.load().await
    }

    /// Reloads the corpus and atomically replaces the current snapshot.
    pub async fn refresh(&self) -> Result<Arc<CorpusSnapshot>, MatchError> {
        let _guard = self.load_lock.lock().await;
        self.load().await
    }

    async fn load(&self) -> Result<Arc<CorpusSnapshot>, MatchError> {
        let cases = self.repository.get_all_cases().await?;
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let snapshot =
            Arc::new(tokio::task::spawn_blocking(move || CorpusSnapshot::build(version, cases)).await?);

        info!(
            version = snapshot.version,
            cases = snapshot.len(),
            vocabulary = snapshot.vocabulary_size(),
            loaded_at = %snapshot.loaded_at,
            "corpus snapshot ready"
        );
        *self.snapshot.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Ranks the corpus against `profile` on the blocking pool.
    pub async fn rank(
        &self,
        profile: Arc<Profile>,
        top_n: usize,
    ) -> Result<Vec<SimilarityResult>, MatchError> {
        let snapshot = self.snapshot().await?;
        let ranker = self.ranker.clone();
        let results =
            tokio::task::spawn_blocking(move || ranker.rank(&profile, &snapshot, top_n)).await?;
        Ok(results)
    }

    /// Stored records for `ids`, in request order. Unknown ids are skipped.
    pub async fn case_details(&self, ids: &[i64]) -> Result<Vec<CaseRecord>, MatchError> {
        let snapshot = self.snapshot().await?;
        Ok(ids
            .iter()
            .filter_map(|id| snapshot.case(*id).cloned())
            .collect())
    }
}

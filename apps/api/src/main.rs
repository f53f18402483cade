mod analysis;
mod config;
mod errors;
mod llm_client;
mod matching;
mod models;
mod repository;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::analysis::capability::CapabilityScorer;
use crate::analysis::orchestrator::Orchestrator;
use crate::analysis::retry::{RetryPolicy, StepError};
use crate::analysis::steps::InferenceSteps;
use crate::analysis::task_store::TaskStore;
use crate::config::Config;
use crate::llm_client::{InferenceClient, ProviderChain};
use crate::matching::matcher::CaseMatcher;
use crate::matching::ranker::{RankingWeights, SimilarityRanker};
use crate::matching::tiers::TierResolver;
use crate::repository::{
    create_pool, CaseRepository, InMemoryCaseRepository, PgCaseRepository, RepositoryError,
};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Compass API v{}", env!("CARGO_PKG_VERSION"));

    // Institution tier table
    let tiers = Arc::new(match &config.tier_table_path {
        Some(path) => TierResolver::from_file(path)
            .with_context(|| format!("failed to load tier table {}", path.display()))?,
        None => TierResolver::default(),
    });
    info!("Tier table: {}", tiers.source());

    let retry = config.retry_policy()?;
    info!("Retry policy: up to {} attempts per step", retry.max_attempts());

    // Case repository; the corpus itself loads lazily on first use
    let repository = build_repository(&config, &retry).await?;
    info!("Case repository: {}", repository.describe());

    // Inference provider chain
    let chain = ProviderChain::from_models(
        &config.inference_api_url,
        &config.inference_api_key,
        &config.inference_models,
    )?;
    let providers = chain.len();
    let inference: Arc<dyn InferenceClient> = Arc::new(chain);
    let inference_name = inference.name();
    info!("Inference client initialized ({inference_name}, {providers} providers)");

    let ranker = SimilarityRanker::new(Arc::clone(&tiers), RankingWeights::default());
    let matcher = Arc::new(CaseMatcher::new(repository, ranker));
    let steps = InferenceSteps::new(Arc::clone(&inference), retry);
    let scorer = Arc::new(CapabilityScorer::new(tiers, inference));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&matcher),
        steps,
        scorer,
        Arc::new(TaskStore::new(config.task_retention)),
        config.analysis_settings(),
    ));

    let state = AppState {
        orchestrator,
        matcher,
        config: config.clone(),
        inference_name,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Postgres when `DATABASE_URL` is set, else the fixture file, else an empty corpus.
async fn build_repository(
    config: &Config,
    retry: &RetryPolicy,
) -> Result<Arc<dyn CaseRepository>> {
    if let Some(url) = &config.database_url {
        let pool = create_pool(url).await?;
        return Ok(Arc::new(PgCaseRepository::new(pool, &config.cases_table)?));
    }
    if let Some(path) = config.cases_fixture_path.clone() {
        // Read errors are retried; a malformed file is not.
        let repository = retry
            .run_blocking("load case fixture", move || {
                InMemoryCaseRepository::from_file(&path).map_err(|e| match e {
                    RepositoryError::Unavailable(msg) => StepError::Retryable(msg),
                    RepositoryError::InvalidData(msg) => StepError::Fatal(msg),
                })
            })
            .await?;
        return Ok(Arc::new(repository));
    }
    warn!("Neither DATABASE_URL nor CASES_FIXTURE_PATH is set; serving an empty corpus");
    Ok(Arc::new(InMemoryCaseRepository::new(Vec::new())))
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::analysis::orchestrator::AnalysisSettings;
use crate::analysis::retry::{RetryConfigError, RetryPolicy};
use crate::llm_client::{DEFAULT_API_URL, DEFAULT_MODELS};
use crate::repository::is_valid_table_name;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres case repository. Without it the corpus comes from `cases_fixture_path`.
    pub database_url: Option<String>,
    pub cases_table: String,
    pub cases_fixture_path: Option<PathBuf>,
    pub inference_api_key: String,
    pub inference_api_url: String,
    /// Ordered model fallback chain.
    pub inference_models: Vec<String>,
    pub tier_table_path: Option<PathBuf>,
    pub retry_max_attempts: u32,
    pub retry_base: f64,
    pub retry_max_backoff: Duration,
    pub similar_cases_limit: usize,
    pub case_analysis_limit: usize,
    pub case_analysis_concurrency: usize,
    pub similar_cases_api_limit: usize,
    /// How long finished tasks stay pollable.
    pub task_retention: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cases_table = get("CASES_TABLE").unwrap_or_else(|| "processed_cases".to_string());
        if !is_valid_table_name(&cases_table) {
            bail!("CASES_TABLE '{cases_table}' is not a valid table name");
        }

        let inference_models: Vec<String> = match get("INFERENCE_MODELS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        };
        if inference_models.is_empty() {
            bail!("INFERENCE_MODELS must name at least one model");
        }

        let backoff_secs: f64 = parse_or(&get, "RETRY_MAX_BACKOFF_SECS", 5.0)?;
        let retry_max_backoff = Duration::try_from_secs_f64(backoff_secs)
            .with_context(|| format!("RETRY_MAX_BACKOFF_SECS '{backoff_secs}' is not a valid duration"))?;

        let config = Config {
            database_url: get("DATABASE_URL"),
            cases_table,
            cases_fixture_path: get("CASES_FIXTURE_PATH").map(PathBuf::from),
            inference_api_key: get("INFERENCE_API_KEY").with_context(|| {
                "Required environment variable 'INFERENCE_API_KEY' is not set".to_string()
            })?,
            inference_api_url: get("INFERENCE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            inference_models,
            tier_table_path: get("TIER_TABLE_PATH").map(PathBuf::from),
            retry_max_attempts: parse_or(&get, "RETRY_MAX_ATTEMPTS", 3)?,
            retry_base: parse_or(&get, "RETRY_BASE", 2.0)?,
            retry_max_backoff,
            similar_cases_limit: parse_or(&get, "SIMILAR_CASES_LIMIT", 150)?,
            case_analysis_limit: parse_or(&get, "CASE_ANALYSIS_LIMIT", 20)?,
            case_analysis_concurrency: parse_or(&get, "CASE_ANALYSIS_CONCURRENCY", 4)?,
            similar_cases_api_limit: parse_or(&get, "SIMILAR_CASES_API_LIMIT", 200)?,
            task_retention: Duration::from_secs(parse_or(&get, "TASK_RETENTION_SECS", 3600)?),
            port: parse_or(&get, "PORT", 8080)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        if config.case_analysis_concurrency == 0 {
            bail!("CASE_ANALYSIS_CONCURRENCY must be at least 1");
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, RetryConfigError> {
        RetryPolicy::new(self.retry_max_attempts, self.retry_base, self.retry_max_backoff)
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            similar_cases_limit: self.similar_cases_limit,
            case_analysis_limit: self.case_analysis_limit,
            case_analysis_concurrency: self.case_analysis_concurrency,
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_lookup(|key| (key == "INFERENCE_API_KEY").then(|| "test-key".to_string()))
        .unwrap()
}

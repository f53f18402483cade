//! Case Repository: where the admission corpus comes from.
//!
//! Postgres in production, an in-memory store (optionally seeded from a JSON
//! fixture file) for local runs and tests.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::matching::majors::MajorCategory;
use crate::matching::tiers::Tier;
use crate::models::case::CaseRecord;
use crate::models::profile::{TestKind, TestScore};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("case repository unavailable: {0}")]
    Unavailable(String),

    #[error("invalid case data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        RepositoryError::Unavailable(e.to_string())
    }
}

#[async_trait]
pub trait CaseRepository: Send + Sync {
    async fn get_all_cases(&self) -> Result<Vec<CaseRecord>, RepositoryError>;

    /// Short label for logs and the health endpoint.
    fn describe(&self) -> String;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub async fn create_pool(database_url: &str) -> Result<PgPool, RepositoryError> {
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Table names are interpolated into SQL, so only plain (optionally schema-qualified)
/// identifiers are accepted.
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').count() <= 2
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[derive(Debug, FromRow)]
struct CaseRow {
    id: i64,
    original_id: Option<i64>,
    gpa_4_scale: Option<f64>,
    undergraduate_university_tier: Option<String>,
    undergraduate_major_category: Option<String>,
    language_test_type: Option<String>,
    language_total_score: Option<f64>,
    gre_total: Option<f64>,
    gmat_total: Option<f64>,
    research_experience_count: Option<i32>,
    internship_experience_count: Option<i32>,
    work_experience_years: Option<f64>,
    experience_text: Option<String>,
    admitted_university: Option<String>,
    admitted_program: Option<String>,
    admitted_country: Option<String>,
    admitted_degree_type: Option<String>,
    undergraduate_university: Option<String>,
    undergraduate_major: Option<String>,
}

/// Language scores are stored as a test type plus total. IELTS totals stored
/// ten-fold (75 for 7.5) are scaled back to bands.
fn language_test(kind: Option<&str>, total: Option<f64>) -> Option<TestScore> {
    scaled_language(TestKind::from_str(kind?).ok()?, total?)
}

fn scaled_language(kind: TestKind, total: f64) -> Option<TestScore> {
    let mut total = positive(Some(total))?;
    if kind == TestKind::Ielts && total > kind.scale_max() && total <= kind.scale_max() * 10.0 {
        total /= 10.0;
    }
    Some(TestScore::new(kind, total))
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Same cleanup database rows get, for records loaded from JSON.
fn normalize(mut case: CaseRecord) -> CaseRecord {
    case.gpa = positive(case.gpa);
    case.language_test = case
        .language_test
        .and_then(|test| scaled_language(test.kind, test.total));
    case.gre_total = positive(case.gre_total);
    case.gmat_total = positive(case.gmat_total);
    case.work_years = positive(Some(case.work_years)).unwrap_or(0.0);
    case
}

impl From<CaseRow> for CaseRecord {
    fn from(row: CaseRow) -> Self {
        CaseRecord {
            id: row.id,
            original_id: row.original_id,
            gpa: positive(row.gpa_4_scale),
            tier: Tier::from(row.undergraduate_university_tier.unwrap_or_default()),
            major_category: row
                .undergraduate_major_category
                .as_deref()
                .map(MajorCategory::from_code)
                .unwrap_or_default(),
            language_test: language_test(row.language_test_type.as_deref(), row.language_total_score),
            gre_total: positive(row.gre_total),
            gmat_total: positive(row.gmat_total),
            research_count: row.research_experience_count.unwrap_or(0).max(0) as u32,
            internship_count: row.internship_experience_count.unwrap_or(0).max(0) as u32,
            work_years: positive(row.work_experience_years).unwrap_or(0.0),
            experience_text: row.experience_text.unwrap_or_default(),
            admitted_university: row.admitted_university.unwrap_or_default(),
            admitted_program: row.admitted_program.unwrap_or_default(),
            admitted_country: row.admitted_country.unwrap_or_default(),
            admitted_degree_type: row.admitted_degree_type.unwrap_or_default(),
            undergraduate_university: row.undergraduate_university.unwrap_or_default(),
            undergraduate_major: row.undergraduate_major.unwrap_or_default(),
        }
    }
}

pub struct PgCaseRepository {
    pool: PgPool,
    table: String,
}

impl PgCaseRepository {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self, RepositoryError> {
        let table = table.into();
        if !is_valid_table_name(&table) {
            return Err(RepositoryError::InvalidData(format!(
                "'{table}' is not a valid table name"
            )));
        }
        Ok(Self { pool, table })
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT id::int8 AS id, original_id::int8 AS original_id, \
             gpa_4_scale::float8 AS gpa_4_scale, \
             undergraduate_university_tier, undergraduate_major_category, \
             language_test_type, language_total_score::float8 AS language_total_score, \
             gre_total::float8 AS gre_total, gmat_total::float8 AS gmat_total, \
             research_experience_count::int4 AS research_experience_count, \
             internship_experience_count::int4 AS internship_experience_count, \
             work_experience_years::float8 AS work_experience_years, \
             experience_text, admitted_university, admitted_program, admitted_country, \
             admitted_degree_type, undergraduate_university, undergraduate_major \
             FROM {} ORDER BY id",
            self.table
        )
    }
}

#[async_trait]
impl CaseRepository for PgCaseRepository {
    async fn get_all_cases(&self) -> Result<Vec<CaseRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, CaseRow>(&self.select_sql())
            .fetch_all(&self.pool)
            .await?;
        info!(table = %self.table, count = rows.len(), "loaded cases from postgres");
        Ok(rows.into_iter().map(CaseRecord::from).collect())
    }

    fn describe(&self) -> String {
        format!("postgres:{}", self.table)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryCaseRepository {
    cases: RwLock<Vec<CaseRecord>>,
    source: String,
}

impl InMemoryCaseRepository {
    pub fn new(cases: Vec<CaseRecord>) -> Self {
        Self {
            cases: RwLock::new(cases),
            source: "memory".to_string(),
        }
    }

    /// Loads a JSON array of case records, normalized like database rows.
    pub fn from_file(path: &Path) -> Result<Self, RepositoryError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RepositoryError::Unavailable(format!("failed to read {}: {e}", path.display()))
        })?;
        let cases: Vec<CaseRecord> = serde_json::from_str::<Vec<CaseRecord>>(&raw)
            .map_err(|e| RepositoryError::InvalidData(format!("{}: {e}", path.display())))?
            .into_iter()
            .map(normalize)
            .collect();
        info!("Loaded {} cases from {}", cases.len(), path.display());
        Ok(Self {
            cases: RwLock::new(cases),
            source: format!("file:{}", path.display()),
        })
    }

    /// Replaces the stored cases; picked up by the next corpus load.
    pub async fn replace(&self, cases: Vec<CaseRecord>) {
        *self.cases.write().await = cases;
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn get_all_cases(&self) -> Result<Vec<CaseRecord>, RepositoryError> {
        Ok(self.cases.read().await.clone())
    }

    fn describe(&self) -> String {
        self.source.clone()
    }
}

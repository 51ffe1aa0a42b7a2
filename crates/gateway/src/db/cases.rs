//! Case Store: cases and the per-case set of analyzed image digests.
//!
//! Every operation is scoped by owner. A case that belongs to someone else
//! is indistinguishable from one that does not exist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use forensight_core::{CaseId, CaseStatus, ImageDigest, UserId};

use super::RepositoryError;
use crate::models::{Case, CaseUpdate, NewCase};

/// Persisted cases.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Create a case owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    async fn create(&self, owner: UserId, new: NewCase) -> Result<Case, RepositoryError>;

    /// All cases owned by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Case>, RepositoryError>;

    /// Get a case if it exists and is owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    async fn get(&self, owner: UserId, id: CaseId) -> Result<Option<Case>, RepositoryError>;

    /// Apply a partial update; `None` when the case is missing or not owned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the update fails.
    async fn update(
        &self,
        owner: UserId,
        id: CaseId,
        update: CaseUpdate,
    ) -> Result<Option<Case>, RepositoryError>;

    /// Delete a case and its analyzed digests. Returns whether a case was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    async fn delete(&self, owner: UserId, id: CaseId) -> Result<bool, RepositoryError>;

    /// Add digests to the case's analyzed set (idempotent).
    ///
    /// Returns `false` without recording anything when the case is missing
    /// or not owned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    async fn record_analyzed(
        &self,
        owner: UserId,
        id: CaseId,
        digests: &[ImageDigest],
    ) -> Result<bool, RepositoryError>;

    /// Whether `digest` is in the case's analyzed set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    async fn is_analyzed(
        &self,
        owner: UserId,
        id: CaseId,
        digest: &ImageDigest,
    ) -> Result<bool, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct CaseRow {
    id: CaseId,
    owner_id: UserId,
    title: String,
    description: String,
    case_type: String,
    status: String,
    location: String,
    date_of_incident: Option<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CaseRow> for Case {
    type Error = RepositoryError;

    fn try_from(row: CaseRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<CaseStatus>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: row.id,
            owner: row.owner_id,
            title: row.title,
            description: row.description,
            case_type: row.case_type,
            status,
            location: row.location,
            date_of_incident: row.date_of_incident,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const CASE_COLUMNS: &str = "id, owner_id, title, description, case_type, status, location, \
                            date_of_incident, tags, created_at, updated_at";

/// `PostgreSQL`-backed [`CaseStore`].
#[derive(Clone)]
pub struct PgCaseStore {
    pool: PgPool,
}

impl PgCaseStore {
    /// Create a new case store over a pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CaseStore for PgCaseStore {
    async fn create(&self, owner: UserId, new: NewCase) -> Result<Case, RepositoryError> {
        let sql = format!(
            "INSERT INTO cases (owner_id, title, description, case_type, status, location, \
             date_of_incident, tags) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {CASE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(owner)
            .bind(&new.title)
            .bind(&new.description)
            .bind(&new.case_type)
            .bind(new.status.as_str())
            .bind(&new.location)
            .bind(&new.date_of_incident)
            .bind(&new.tags)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Case>, RepositoryError> {
        let sql = format!(
            "SELECT {CASE_COLUMNS} FROM cases WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Case::try_from).collect()
    }

    async fn get(&self, owner: UserId, id: CaseId) -> Result<Option<Case>, RepositoryError> {
        let sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = $1 AND owner_id = $2");
        let row = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Case::try_from).transpose()
    }

    async fn update(
        &self,
        owner: UserId,
        id: CaseId,
        update: CaseUpdate,
    ) -> Result<Option<Case>, RepositoryError> {
        let sql = format!(
            "UPDATE cases SET \
                title = COALESCE($3, title), \
                description = COALESCE($4, description), \
                case_type = COALESCE($5, case_type), \
                status = COALESCE($6, status), \
                location = COALESCE($7, location), \
                date_of_incident = COALESCE($8, date_of_incident), \
                tags = COALESCE($9, tags), \
                updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING {CASE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(update.title)
            .bind(update.description)
            .bind(update.case_type)
            .bind(update.status.map(|s| s.as_str()))
            .bind(update.location)
            .bind(update.date_of_incident)
            .bind(update.tags)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Case::try_from).transpose()
    }

    async fn delete(&self, owner: UserId, id: CaseId) -> Result<bool, RepositoryError> {
        // case_analyzed_images rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM cases WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_analyzed(
        &self,
        owner: UserId,
        id: CaseId,
        digests: &[ImageDigest],
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let owned: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM cases WHERE id = $1 AND owner_id = $2 FOR SHARE")
                .bind(id)
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await?;
        if owned.is_none() {
            return Ok(false);
        }

        for digest in digests {
            sqlx::query(
                r"
                INSERT INTO case_analyzed_images (case_id, digest)
                VALUES ($1, $2)
                ON CONFLICT (case_id, digest) DO NOTHING
                ",
            )
            .bind(id)
            .bind(digest)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn is_analyzed(
        &self,
        owner: UserId,
        id: CaseId,
        digest: &ImageDigest,
    ) -> Result<bool, RepositoryError> {
        let found: Option<i32> = sqlx::query_scalar(
            r"
            SELECT 1
            FROM case_analyzed_images i
            JOIN cases c ON c.id = i.case_id
            WHERE i.case_id = $1 AND c.owner_id = $2 AND i.digest = $3
            ",
        )
        .bind(id)
        .bind(owner)
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }
}

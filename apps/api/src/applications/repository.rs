use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{classify, StoreError};
use crate::models::application::{Application, NewApplication};

/// Storage for applications. Implementations must enforce uniqueness of
/// `(user_id, job_id)` and report a duplicate insert as
/// `StoreError::UniqueViolation`.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Application>, StoreError>;

    async fn find_by_user_and_job(
        &self,
        user_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<Application>, StoreError>;

    async fn create(&self, new: NewApplication) -> Result<Application, StoreError>;

    /// Persists the submission fields of a resubmitted snapshot (see
    /// `Application::resubmitted`) in one statement. Status and the reviewed
    /// flag are never written here.
    async fn resubmit(&self, snapshot: &Application) -> Result<Option<Application>, StoreError>;

    /// Flips the reviewed flag atomically and returns the new record.
    async fn toggle_reviewed(&self, id: Uuid) -> Result<Option<Application>, StoreError>;

    async fn list_for_job(
        &self,
        job_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Application>, StoreError>;

    async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Application>, StoreError>;
}

pub struct PgApplicationRepository {
    pool: PgPool,
}

impl PgApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationRepository for PgApplicationRepository {
    async fn get(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn find_by_user_and_job(
        &self,
        user_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<Application>, StoreError> {
        sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE user_id = $1 AND job_id = $2",
        )
        .bind(user_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn create(&self, new: NewApplication) -> Result<Application, StoreError> {
        sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (id, user_id, job_id, status, resume_key, ai_score, ai_analysis)
            VALUES ($1, $2, $3, 'APPLIED', $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(new.job_id)
        .bind(&new.resume_key)
        .bind(new.ai_score)
        .bind(&new.ai_analysis)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn resubmit(&self, snapshot: &Application) -> Result<Option<Application>, StoreError> {
        sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET resume_key = $2, ai_score = $3, ai_analysis = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(snapshot.id)
        .bind(&snapshot.resume_key)
        .bind(snapshot.ai_score)
        .bind(&snapshot.ai_analysis)
        .bind(snapshot.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn toggle_reviewed(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        sqlx::query_as::<_, Application>(
            "UPDATE applications SET is_reviewed = NOT is_reviewed WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn list_for_job(
        &self,
        job_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Application>, StoreError> {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE job_id = $1
            ORDER BY updated_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(job_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Application>, StoreError> {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE user_id = $1
            ORDER BY updated_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }
}

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{classify, StoreError};
use crate::jobs::filter::JobQuery;
use crate::models::job::{Job, JobUpdate, NewJob};

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, owner_id: Uuid, job: &NewJob) -> Result<Job, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Job>, StoreError>;

    async fn list(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError>;

    async fn update(&self, id: Uuid, update: &JobUpdate) -> Result<Option<Job>, StoreError>;

    /// Removes the posting (applications cascade) and returns what was deleted.
    async fn delete(&self, id: Uuid) -> Result<Option<Job>, StoreError>;
}

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn create(&self, owner_id: Uuid, job: &NewJob) -> Result<Job, StoreError> {
        sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs
                (id, title, description, requirements, nice_to_have_requirements,
                 location, salary_range, job_type, experience_level, is_active, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.requirements)
        .bind(&job.nice_to_have_requirements)
        .bind(&job.location)
        .bind(&job.salary_range)
        .bind(&job.job_type)
        .bind(&job.experience_level)
        .bind(job.is_active)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Job>, StoreError> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn list(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError> {
        let mut qb = query.to_sql();
        qb.build_query_as::<Job>()
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn update(&self, id: Uuid, update: &JobUpdate) -> Result<Option<Job>, StoreError> {
        // Nullable columns take a (present, value) pair so an explicit null clears them.
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET
                title                     = COALESCE($2, title),
                description               = COALESCE($3, description),
                requirements              = CASE WHEN $4 THEN $5 ELSE requirements END,
                nice_to_have_requirements = CASE WHEN $6 THEN $7 ELSE nice_to_have_requirements END,
                location                  = CASE WHEN $8 THEN $9 ELSE location END,
                salary_range              = CASE WHEN $10 THEN $11 ELSE salary_range END,
                job_type                  = CASE WHEN $12 THEN $13 ELSE job_type END,
                experience_level          = CASE WHEN $14 THEN $15 ELSE experience_level END,
                is_active                 = COALESCE($16, is_active),
                updated_at                = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.requirements.is_some())
        .bind(update.requirements.clone().flatten())
        .bind(update.nice_to_have_requirements.is_some())
        .bind(update.nice_to_have_requirements.clone().flatten())
        .bind(update.location.is_some())
        .bind(update.location.clone().flatten())
        .bind(update.salary_range.is_some())
        .bind(update.salary_range.clone().flatten())
        .bind(update.job_type.is_some())
        .bind(update.job_type.clone().flatten())
        .bind(update.experience_level.is_some())
        .bind(update.experience_level.clone().flatten())
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        sqlx::query_as::<_, Job>("DELETE FROM jobs WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }
}

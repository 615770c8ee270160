use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{classify, StoreError};
use crate::models::user::{ProfileUpdate, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError>;

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>, StoreError>;

    /// Fails with `UniqueViolation` when the new email is already taken for the same role.
    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at OFFSET $1 LIMIT $2")
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>("UPDATE users SET is_active = $1 WHERE id = $2 RETURNING *")
            .bind(is_active)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email               = COALESCE($2, email),
                first_name          = COALESCE($3, first_name),
                middle_initial      = COALESCE($4, middle_initial),
                last_name           = COALESCE($5, last_name),
                phone_number        = COALESCE($6, phone_number),
                city                = COALESCE($7, city),
                state               = COALESCE($8, state),
                years_of_experience = COALESCE($9, years_of_experience),
                work_permit_type    = COALESCE($10, work_permit_type),
                linkedin_url        = COALESCE($11, linkedin_url),
                company_name        = COALESCE($12, company_name),
                designation         = COALESCE($13, designation)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.email)
        .bind(&update.first_name)
        .bind(&update.middle_initial)
        .bind(&update.last_name)
        .bind(&update.phone_number)
        .bind(&update.city)
        .bind(&update.state)
        .bind(update.years_of_experience)
        .bind(&update.work_permit_type)
        .bind(&update.linkedin_url)
        .bind(&update.company_name)
        .bind(&update.designation)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }
}

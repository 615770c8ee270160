use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::policy::{authorize, Action};
use crate::auth::CurrentUser;
use crate::db::StoreError;
use crate::errors::AppError;
use crate::models::user::{ProfileUpdate, User};
use crate::routes::Pagination;
use crate::state::AppState;

/// GET /api/v1/users/me
pub async fn handle_get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// PUT /api/v1/users/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
    if let Some(email) = &update.email {
        if !looks_like_email(email) {
            return Err(AppError::Validation(format!("'{email}' is not a valid email")));
        }
    }

    let updated = match state.users.update_profile(user.id, &update).await {
        Ok(updated) => updated,
        Err(StoreError::UniqueViolation(_)) => {
            return Err(AppError::Conflict(
                "The user with this email already exists in the system".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    updated
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))
}

/// GET /api/v1/admin/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<User>>, AppError> {
    authorize(&current.actor(), Action::ManageUsers)?;
    let (offset, limit) = page.bounds();
    Ok(Json(state.users.list(offset, limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub is_active: bool,
}

/// PUT /api/v1/admin/users/:id/status?is_active=
pub async fn handle_set_user_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<User>, AppError> {
    authorize(&current.actor(), Action::ManageUsers)?;

    let user = state
        .users
        .set_active(user_id, query.is_active)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    info!(user_id = %user.id, is_active = user.is_active, "User activation changed");
    Ok(Json(user))
}

fn looks_like_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

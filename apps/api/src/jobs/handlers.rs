use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::policy::{authorize, Action};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::jobs::filter::{visible_jobs, JobFilter};
use crate::models::job::{Job, JobUpdate, NewJob};
use crate::state::AppState;

/// Loads a job or fails with `NotFound`.
pub async fn load_job(state: &AppState, id: Uuid) -> Result<Job, AppError> {
    state
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(new_job): Json<NewJob>,
) -> Result<Json<Job>, AppError> {
    let actor = current.actor();
    authorize(&actor, Action::CreateJob)?;

    if new_job.title.trim().is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    if new_job.description.trim().is_empty() {
        return Err(AppError::Validation("description cannot be empty".to_string()));
    }

    let job = state.jobs.create(actor.id, &new_job).await?;
    info!(job_id = %job.id, owner_id = %actor.id, "Job created");
    Ok(Json(job))
}

/// GET /api/v1/jobs
///
/// Role-scoped listing; see `jobs::filter` for which filters each role gets.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<JobFilter>,
) -> Result<Json<Vec<Job>>, AppError> {
    let query = visible_jobs(&current.actor(), filter);
    Ok(Json(state.jobs.list(&query).await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let job = load_job(&state, id).await?;
    authorize(
        &current.actor(),
        Action::ViewJob {
            owner_id: job.owner_id,
            is_active: job.is_active,
        },
    )?;
    Ok(Json(job))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<JobUpdate>,
) -> Result<Json<Job>, AppError> {
    let job = load_job(&state, id).await?;
    authorize(
        &current.actor(),
        Action::ModifyJob {
            owner_id: job.owner_id,
        },
    )?;

    if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }

    let updated = state
        .jobs
        .update(id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(updated))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let job = load_job(&state, id).await?;
    authorize(
        &current.actor(),
        Action::ModifyJob {
            owner_id: job.owner_id,
        },
    )?;

    let deleted = state
        .jobs
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    info!(job_id = %id, "Job deleted");
    Ok(Json(deleted))
}

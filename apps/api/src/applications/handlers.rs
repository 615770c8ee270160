use std::collections::HashMap;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::applications::intake::{submit_application, Submission};
use crate::auth::policy::{authorize, Action, Actor};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::jobs::handlers::load_job;
use crate::models::application::{Application, ApplicationView};
use crate::models::user::CandidateSummary;
use crate::routes::Pagination;
use crate::state::AppState;
use crate::storage::content_type_for;

async fn load_application(state: &AppState, id: Uuid) -> Result<Application, AppError> {
    state
        .applications
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

/// POST /api/v1/applications
///
/// Multipart fields: `job_id`, `resume` (file), `force_update` (optional).
/// Responds 201 for a new application and 200 when an earlier one was
/// overwritten.
pub async fn handle_submit_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApplicationView>), AppError> {
    // Reject non-candidates before reading the upload.
    authorize(&Actor::from(&user), Action::SubmitApplication)?;

    let submission = read_submission(multipart).await?;
    let outcome = submit_application(&state, &user, submission).await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let view = ApplicationView::new(outcome.application).with_job(Some(outcome.job));
    Ok((status, Json(view)))
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, AppError> {
    let mut job_id = None;
    let mut resume: Option<(String, Bytes)> = None;
    let mut overwrite = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, "Malformed upload"))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("job_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| upload_error(e, "Malformed job_id"))?;
                let id = Uuid::parse_str(text.trim())
                    .map_err(|_| AppError::Validation(format!("'{text}' is not a valid job id")))?;
                job_id = Some(id);
            }
            Some("resume") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| upload_error(e, "Invalid resume file"))?;
                resume = Some((filename, data));
            }
            Some("force_update") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| upload_error(e, "Malformed force_update"))?;
                overwrite = parse_flag(&text)?;
            }
            _ => {}
        }
    }

    let job_id = job_id.ok_or_else(|| AppError::Validation("job_id is required".to_string()))?;
    let (filename, resume) =
        resume.ok_or_else(|| AppError::Validation("No resume file provided".to_string()))?;

    Ok(Submission {
        job_id,
        filename,
        resume,
        overwrite,
    })
}

fn parse_flag(value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "" | "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "'{value}' is not a valid force_update value"
        ))),
    }
}

/// A body over the configured upload limit surfaces as a multipart error;
/// keep it distinct from a malformed form.
fn upload_error(err: MultipartError, context: &str) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("{context}: {}", err.body_text()))
    }
}

/// Quotes `filename` for a `Content-Disposition` header.
fn attachment_disposition(filename: &str) -> String {
    let mut quoted = String::with_capacity(filename.len());
    for c in filename.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    format!("attachment; filename=\"{quoted}\"")
}

/// GET /api/v1/applications/me
pub async fn handle_my_applications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<ApplicationView>>, AppError> {
    let (offset, limit) = page.bounds();
    let applications = state
        .applications
        .list_for_user(user.id, offset, limit)
        .await?;

    let job_ids: Vec<Uuid> = applications.iter().map(|a| a.job_id).collect();
    let jobs: HashMap<Uuid, _> = state
        .jobs
        .get_many(&job_ids)
        .await?
        .into_iter()
        .map(|j| (j.id, j))
        .collect();

    let views = applications
        .into_iter()
        .map(|a| {
            let job = jobs.get(&a.job_id).cloned();
            ApplicationView::new(a).with_job(job)
        })
        .collect();
    Ok(Json(views))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationView>, AppError> {
    let application = load_application(&state, id).await?;
    let job = load_job(&state, application.job_id).await?;
    authorize(
        &current.actor(),
        Action::ReadApplication {
            applicant_id: application.user_id,
            job_owner_id: job.owner_id,
        },
    )?;

    let candidate = state
        .users
        .get(application.user_id)
        .await?
        .as_ref()
        .map(CandidateSummary::from);
    Ok(Json(
        ApplicationView::new(application)
            .with_job(Some(job))
            .with_candidate(candidate),
    ))
}

/// GET /api/v1/applications/:id/resume
pub async fn handle_download_resume(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let application = load_application(&state, id).await?;
    let job = load_job(&state, application.job_id).await?;
    authorize(
        &current.actor(),
        Action::ReadApplication {
            applicant_id: application.user_id,
            job_owner_id: job.owner_id,
        },
    )?;

    let key = application
        .resume_key
        .ok_or_else(|| AppError::NotFound(format!("Application {id} has no resume")))?;
    let body = state.blobs.get(&key).await?;
    let filename = key.rsplit('/').next().unwrap_or(&key).to_string();

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&filename).to_string()),
            (header::CONTENT_DISPOSITION, attachment_disposition(&filename)),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
pub struct ReviewedResponse {
    pub id: Uuid,
    pub is_reviewed: bool,
}

/// PATCH /api/v1/applications/:id/reviewed
pub async fn handle_toggle_reviewed(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewedResponse>, AppError> {
    let application = load_application(&state, id).await?;
    let job = load_job(&state, application.job_id).await?;
    authorize(
        &current.actor(),
        Action::ToggleReviewed {
            job_owner_id: job.owner_id,
        },
    )?;

    let toggled = state
        .applications
        .toggle_reviewed(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
    Ok(Json(ReviewedResponse {
        id: toggled.id,
        is_reviewed: toggled.is_reviewed,
    }))
}

/// GET /api/v1/jobs/:id/applications
pub async fn handle_list_job_applications(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(job_id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<ApplicationView>>, AppError> {
    let job = load_job(&state, job_id).await?;
    authorize(
        &current.actor(),
        Action::ListJobApplications {
            job_owner_id: job.owner_id,
        },
    )?;

    let (offset, limit) = page.bounds();
    let applications = state
        .applications
        .list_for_job(job_id, offset, limit)
        .await?;

    let user_ids: Vec<Uuid> = applications.iter().map(|a| a.user_id).collect();
    let candidates: HashMap<Uuid, CandidateSummary> = state
        .users
        .get_many(&user_ids)
        .await?
        .iter()
        .map(|u| (u.id, CandidateSummary::from(u)))
        .collect();

    let views = applications
        .into_iter()
        .map(|a| {
            let candidate = candidates.get(&a.user_id).cloned();
            ApplicationView::new(a)
                .with_job(Some(job.clone()))
                .with_candidate(candidate)
        })
        .collect();
    Ok(Json(views))
}

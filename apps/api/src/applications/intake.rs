//! Application intake: one candidate submitting one resume against one job.
//!
//! Order of effects is fixed: authorization and input checks, job state,
//! duplicate check, blob write, text extraction, screening, then a single
//! insert or update. The `(user_id, job_id)` unique index decides races; the
//! loser of a concurrent first submission is handled exactly like a caller
//! who found an existing record.

use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::policy::{authorize, Action, Actor};
use crate::db::StoreError;
use crate::errors::AppError;
use crate::models::application::{Application, NewApplication, Resubmission};
use crate::models::job::Job;
use crate::models::user::User;
use crate::screening::{extract, ScreeningRequest};
use crate::state::AppState;
use crate::storage::{content_type_for, resume_key};

/// A parsed upload.
#[derive(Debug, Clone)]
pub struct Submission {
    pub job_id: Uuid,
    pub filename: String,
    pub resume: Bytes,
    /// Caller consented to replacing an earlier application to the same job.
    pub overwrite: bool,
}

#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    pub application: Application,
    pub job: Job,
    /// `false` when an existing record was overwritten.
    pub created: bool,
}

pub async fn submit_application(
    state: &AppState,
    applicant: &User,
    submission: Submission,
) -> Result<IntakeOutcome, AppError> {
    let actor = Actor::from(applicant);
    authorize(&actor, Action::SubmitApplication)?;
    validate(&submission)?;

    let job = state
        .jobs
        .get(submission.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", submission.job_id)))?;
    if !job.is_active {
        return Err(AppError::JobNotOpen(job.id));
    }

    let existing = state
        .applications
        .find_by_user_and_job(actor.id, job.id)
        .await?;
    if let Some(existing) = &existing {
        if !submission.overwrite {
            info!(
                application_id = %existing.id,
                job_id = %job.id,
                "Duplicate submission without overwrite consent"
            );
            return Err(AppError::ApplicationExists {
                application_id: existing.id,
            });
        }
    }

    let key = resume_key(actor.id, job.id, &submission.filename);
    state
        .blobs
        .put(
            &key,
            submission.resume.clone(),
            content_type_for(&submission.filename),
        )
        .await?;

    let resume_text = extract_text(submission.resume, submission.filename).await;
    let screening = state
        .screening
        .evaluate(&ScreeningRequest {
            resume_text: &resume_text,
            job_title: &job.title,
            must_haves: job.requirements.as_deref().unwrap_or_default(),
            nice_to_haves: job.nice_to_have_requirements.as_deref(),
        })
        .await;

    let ai_analysis = serde_json::to_value(&screening)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode screening: {e}")))?;
    let ai_score = screening.score as i32;

    if let Some(existing) = existing {
        let patch = Resubmission {
            resume_key: key,
            ai_score,
            ai_analysis,
            submitted_at: Utc::now(),
        };
        let application = overwrite(state, &existing, &patch).await?;
        return Ok(IntakeOutcome {
            application,
            job,
            created: false,
        });
    }

    let new = NewApplication {
        id: Uuid::new_v4(),
        user_id: actor.id,
        job_id: job.id,
        resume_key: key.clone(),
        ai_score,
        ai_analysis: ai_analysis.clone(),
    };
    match state.applications.create(new).await {
        Ok(application) => {
            info!(
                application_id = %application.id,
                job_id = %job.id,
                score = ai_score,
                "Application created"
            );
            Ok(IntakeOutcome {
                application,
                job,
                created: true,
            })
        }
        Err(StoreError::UniqueViolation(constraint)) => {
            warn!(%constraint, job_id = %job.id, "Lost first-submission race");
            let winner = state
                .applications
                .find_by_user_and_job(actor.id, job.id)
                .await?
                .ok_or_else(|| {
                    AppError::Conflict(format!("Record violates unique constraint {constraint}"))
                })?;
            if !submission.overwrite {
                return Err(AppError::ApplicationExists {
                    application_id: winner.id,
                });
            }
            let patch = Resubmission {
                resume_key: key,
                ai_score,
                ai_analysis,
                submitted_at: Utc::now(),
            };
            let application = overwrite(state, &winner, &patch).await?;
            Ok(IntakeOutcome {
                application,
                job,
                created: false,
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn validate(submission: &Submission) -> Result<(), AppError> {
    if submission.filename.trim().is_empty() {
        return Err(AppError::Validation("resume filename is required".to_string()));
    }
    if submission.resume.is_empty() {
        return Err(AppError::Validation("resume file is empty".to_string()));
    }
    Ok(())
}

/// Persists `existing` with the patch applied. The record disappearing in
/// between (job deleted) surfaces as `NotFound`.
async fn overwrite(
    state: &AppState,
    existing: &Application,
    patch: &Resubmission,
) -> Result<Application, AppError> {
    let snapshot = existing.resubmitted(patch);
    let stored = state
        .applications
        .resubmit(&snapshot)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {} not found", snapshot.id)))?;
    info!(
        application_id = %stored.id,
        job_id = %stored.job_id,
        score = patch.ai_score,
        "Application overwritten"
    );
    Ok(stored)
}

/// Extraction is CPU bound and may be slow for large PDFs.
async fn extract_text(resume: Bytes, filename: String) -> String {
    match tokio::task::spawn_blocking(move || extract::extract(&resume, &filename)).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Resume extraction task failed: {e}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::llm_client::LlmError;
    use crate::models::application::ApplicationStatus;
    use crate::models::user::Role;
    use crate::screening::ScreeningService;
    use crate::testing::{job, sample_result, user, ScriptedProvider, TestApp};

    fn upload(job_id: Uuid, filename: &str, overwrite: bool) -> Submission {
        Submission {
            job_id,
            filename: filename.to_string(),
            resume: Bytes::from_static(b"not really a pdf"),
            overwrite,
        }
    }

    async fn seeded(provider: Arc<ScriptedProvider>) -> (TestApp, User, Job) {
        let app = TestApp::new(ScreeningService::new(provider, None));
        let client = app.add_user(user(Role::Client, "client@corp.io"));
        let candidate = app.add_user(user(Role::Candidate, "cand@mail.io"));
        let posting = app.add_job(job(client.id, "Backend Engineer", true));
        (app, candidate, posting)
    }

    #[tokio::test]
    async fn test_first_submission_creates_applied_record() {
        let (app, candidate, posting) =
            seeded(ScriptedProvider::ok("primary", sample_result(85))).await;

        let outcome = submit_application(&app.state, &candidate, upload(posting.id, "cv.pdf", false))
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.application.user_id, candidate.id);
        assert_eq!(outcome.application.status, ApplicationStatus::Applied);
        assert_eq!(outcome.application.ai_score, Some(85));
        assert_eq!(
            outcome.application.resume_key,
            Some(resume_key(candidate.id, posting.id, "cv.pdf"))
        );
        assert_eq!(app.blobs.keys().len(), 1);
    }

    #[tokio::test]
    async fn test_second_submission_without_overwrite_conflicts() {
        let (app, candidate, posting) =
            seeded(ScriptedProvider::ok("primary", sample_result(70))).await;

        let first = submit_application(&app.state, &candidate, upload(posting.id, "cv.pdf", false))
            .await
            .unwrap();
        let second =
            submit_application(&app.state, &candidate, upload(posting.id, "cv2.pdf", false)).await;

        match second {
            Err(AppError::ApplicationExists { application_id }) => {
                assert_eq!(application_id, first.application.id)
            }
            other => panic!("expected ApplicationExists, got {other:?}"),
        }
        assert_eq!(app.applications.len(), 1);
        // rejected before touching the blob store
        assert_eq!(app.blobs.keys().len(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_patches_same_record() {
        let provider = ScriptedProvider::ok("primary", sample_result(40));
        let (app, candidate, posting) = seeded(provider.clone()).await;

        let first = submit_application(&app.state, &candidate, upload(posting.id, "old.pdf", false))
            .await
            .unwrap();
        app.applications.mark_reviewed(first.application.id);

        provider.set_result(sample_result(92));
        let second =
            submit_application(&app.state, &candidate, upload(posting.id, "new.docx", true))
                .await
                .unwrap();

        assert!(!second.created);
        assert_eq!(second.application.id, first.application.id);
        assert_eq!(second.application.ai_score, Some(92));
        assert_eq!(
            second.application.resume_key,
            Some(resume_key(candidate.id, posting.id, "new.docx"))
        );
        assert!(second.application.updated_at >= first.application.updated_at);
        assert_eq!(second.application.created_at, first.application.created_at);
        assert_eq!(second.application.status, ApplicationStatus::Applied);
        assert!(second.application.is_reviewed);
        assert_eq!(app.applications.len(), 1);
    }

    #[tokio::test]
    async fn test_inactive_job_is_rejected_before_screening() {
        let provider = ScriptedProvider::ok("primary", sample_result(90));
        let (app, candidate, _) = seeded(provider.clone()).await;
        let closed = app.add_job(job(Uuid::new_v4(), "Closed role", false));

        let result = submit_application(&app.state, &candidate, upload(closed.id, "cv.pdf", true)).await;

        assert!(matches!(result, Err(AppError::JobNotOpen(id)) if id == closed.id));
        assert_eq!(provider.calls(), 0);
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn test_missing_job_is_not_found() {
        let (app, candidate, _) = seeded(ScriptedProvider::ok("primary", sample_result(1))).await;
        let result =
            submit_application(&app.state, &candidate, upload(Uuid::new_v4(), "cv.pdf", false)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_non_candidates_are_rejected_before_any_io() {
        let provider = ScriptedProvider::ok("primary", sample_result(50));
        let (app, _, posting) = seeded(provider.clone()).await;
        let admin = app.add_user(user(Role::Admin, "root@corp.io"));
        let client = app.add_user(user(Role::Client, "other@corp.io"));

        for caller in [&admin, &client] {
            let result =
                submit_application(&app.state, caller, upload(posting.id, "cv.pdf", false)).await;
            assert!(matches!(result, Err(AppError::Forbidden(_))));
        }
        assert!(app.blobs.keys().is_empty());
        assert_eq!(provider.calls(), 0);
        assert_eq!(app.applications.len(), 0);
    }

    #[tokio::test]
    async fn test_malformed_upload_is_validation_error() {
        let provider = ScriptedProvider::ok("primary", sample_result(50));
        let (app, candidate, posting) = seeded(provider.clone()).await;

        let mut empty = upload(posting.id, "cv.pdf", false);
        empty.resume = Bytes::new();
        let nameless = upload(posting.id, "  ", false);

        for submission in [empty, nameless] {
            let result = submit_application(&app.state, &candidate, submission).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
        assert!(app.blobs.keys().is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_suffix_is_still_screened() {
        let provider = ScriptedProvider::ok("primary", sample_result(12));
        let (app, candidate, posting) = seeded(provider.clone()).await;

        let outcome =
            submit_application(&app.state, &candidate, upload(posting.id, "cv.txt", false))
                .await
                .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.last_resume_text().as_deref(), Some(""));
        assert_eq!(outcome.application.ai_score, Some(12));
    }

    #[tokio::test]
    async fn test_rate_limit_without_secondary_stores_zero_score() {
        let provider = ScriptedProvider::failing("primary", || {
            LlmError::RateLimited("quota exhausted".into())
        });
        let (app, candidate, posting) = seeded(provider).await;

        let outcome =
            submit_application(&app.state, &candidate, upload(posting.id, "cv.pdf", false))
                .await
                .unwrap();

        assert_eq!(outcome.application.ai_score, Some(0));
        let stored = outcome.application.analysis().unwrap();
        assert!(stored.justification.starts_with("Error during AI evaluation"));
        assert!(stored.justification.contains("quota exhausted"));
    }

    #[tokio::test]
    async fn test_concurrent_first_submissions_yield_one_record() {
        let provider = ScriptedProvider::ok("primary", sample_result(60))
            .with_delay(Duration::from_millis(20));
        let (app, candidate, posting) = seeded(provider).await;

        let (a, b) = tokio::join!(
            submit_application(&app.state, &candidate, upload(posting.id, "a.pdf", false)),
            submit_application(&app.state, &candidate, upload(posting.id, "b.pdf", false)),
        );

        let outcomes = [a, b];
        let created = outcomes.iter().filter(|r| r.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|r| matches!(r, Err(AppError::ApplicationExists { .. })))
            .count();
        assert_eq!(created, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(app.applications.len(), 1);
        // both uploads reached the store; the loser's blob is left behind
        assert_eq!(app.blobs.keys().len(), 2);
    }
}

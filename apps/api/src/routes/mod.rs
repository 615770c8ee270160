pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use serde::Deserialize;

use crate::applications::handlers as applications;
use crate::jobs::handlers as jobs;
use crate::state::AppState;
use crate::users::handlers as users;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 100;

/// `skip` / `limit` query parameters shared by the list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// `(offset, limit)` with defaults applied and the limit capped.
    pub fn bounds(&self) -> (i64, i64) {
        let offset = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(0, MAX_LIMIT);
        (offset, limit)
    }
}

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Users
        .route(
            "/api/v1/users/me",
            get(users::handle_get_me).put(users::handle_update_me),
        )
        .route("/api/v1/admin/users", get(users::handle_list_users))
        .route(
            "/api/v1/admin/users/:id/status",
            put(users::handle_set_user_status),
        )
        // Jobs
        .route(
            "/api/v1/jobs",
            post(jobs::handle_create_job).get(jobs::handle_list_jobs),
        )
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route(
            "/api/v1/jobs/:id/applications",
            get(applications::handle_list_job_applications),
        )
        // Applications
        .route(
            "/api/v1/applications",
            post(applications::handle_submit_application),
        )
        .route(
            "/api/v1/applications/me",
            get(applications::handle_my_applications),
        )
        .route(
            "/api/v1/applications/:id",
            get(applications::handle_get_application),
        )
        .route(
            "/api/v1/applications/:id/resume",
            get(applications::handle_download_resume),
        )
        .route(
            "/api/v1/applications/:id/reviewed",
            patch(applications::handle_toggle_reviewed),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

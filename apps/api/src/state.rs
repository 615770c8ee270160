use std::sync::Arc;

use crate::applications::ApplicationRepository;
use crate::jobs::JobRepository;
use crate::screening::ScreeningService;
use crate::storage::BlobStore;
use crate::users::UserRepository;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub applications: Arc<dyn ApplicationRepository>,
    /// Resume uploads. S3 / MinIO in production.
    pub blobs: Arc<dyn BlobStore>,
    /// Primary provider plus optional fallback, built from config at startup.
    pub screening: ScreeningService,
    pub max_upload_bytes: usize,
}

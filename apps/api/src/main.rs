mod applications;
mod auth;
mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod screening;
mod state;
mod storage;
mod users;

#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::applications::PgApplicationRepository;
use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::PgJobRepository;
use crate::llm_client::{LlmClient, ProviderConfig};
use crate::routes::build_router;
use crate::screening::{LlmScreeningProvider, ScreeningProvider, ScreeningService};
use crate::state::AppState;
use crate::storage::S3BlobStore;
use crate::users::PgUserRepository;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hiring API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let screening = build_screening(&config)?;

    let state = AppState {
        users: Arc::new(PgUserRepository::new(db.clone())),
        jobs: Arc::new(PgJobRepository::new(db.clone())),
        applications: Arc::new(PgApplicationRepository::new(db)),
        blobs: Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone())),
        screening,
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn screening_provider(config: &ProviderConfig) -> Result<Arc<dyn ScreeningProvider>> {
    let client = LlmClient::new(config.clone())?;
    info!(
        "Screening provider '{}' initialized (model: {})",
        client.name(),
        client.model()
    );
    Ok(Arc::new(LlmScreeningProvider::new(client)))
}

fn build_screening(config: &Config) -> Result<ScreeningService> {
    let primary = screening_provider(&config.primary_provider)?;
    let secondary = match &config.secondary_provider {
        Some(provider) => Some(screening_provider(provider)?),
        None => {
            info!("No fallback screening provider configured");
            None
        }
    };
    Ok(ScreeningService::new(primary, secondary))
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "hiring-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}

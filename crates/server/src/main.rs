//! qsticker server entry point.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Response},
    Router,
};
use qsticker_api::{middleware::AppState, proxy, proxy::IMMUTABLE_CACHE_CONTROL};
use qsticker_common::{ArchiveStorage, Config};
use qsticker_core::{
    CatalogService, ImageOptimizer, JobService, ProviderClient, UpdateService, ZipArchiver,
};
use qsticker_db::repositories::EmoticonRepository;
use qsticker_queue::{start_scheduler, SchedulerConfig, UpdateSweep};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    services::{fs::ServeFileSystemResponseBody, ServeDir},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Directory under the storage root holding the frontend build.
const PUBLIC_DIR: &str = "public";

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Assemble the HTTP application, mounted under `base` (`/` or `/x/`).
///
/// Under the mount point: `/api/*`, `/parcel/*`, archives at `/storage/*`,
/// and everything else from the public directory. Only successful archive
/// responses are marked immutable.
fn build_app(state: AppState, storage: &ArchiveStorage, base: &str) -> Router {
    let archives = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            |res: &Response<ServeFileSystemResponseBody>| {
                res.status()
                    .is_success()
                    .then(|| HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL))
            },
        ))
        .service(ServeDir::new(storage.archive_dir()));

    let app = Router::new()
        .nest("/api", qsticker_api::router(&state))
        .merge(proxy::router())
        .nest_service("/storage", archives)
        .fallback_service(ServeDir::new(storage.root().join(PUBLIC_DIR)))
        .with_state(state);

    let mount = base.trim_end_matches('/');
    let app = if mount.is_empty() {
        app
    } else {
        Router::new().nest(mount, app)
    };

    app.layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qsticker=info,tower_http=info".into()),
        )
        .init();

    info!("Starting qsticker server...");

    // Load configuration
    let config = Config::load()?;

    // Open database
    let db = qsticker_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    qsticker_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);
    let emoticon_repo = EmoticonRepository::new(Arc::clone(&db));
    let storage = ArchiveStorage::new(config.storage.root.clone());

    // Ingestion pipeline
    let provider = ProviderClient::new(&config.provider)?;
    let archiver = ZipArchiver::new(
        provider.http().clone(),
        ImageOptimizer::new(config.optimize.clone()),
        config.update.download_concurrency,
    );
    let update_service = Arc::new(UpdateService::new(
        Arc::new(emoticon_repo.clone()),
        Arc::new(provider.clone()),
        Arc::new(archiver),
        storage.clone(),
        config.update.salt.clone(),
        config.update.concurrency,
    ));

    let job_service = JobService::new();
    let jobs = job_service.sender();
    job_service.start(Arc::clone(&update_service));
    info!(
        concurrency = config.update.concurrency,
        download_concurrency = config.update.download_concurrency,
        "Update worker started"
    );

    // Periodic sweep
    let sweep = Arc::new(UpdateSweep::new(
        Arc::new(emoticon_repo.clone()),
        jobs.clone(),
        config.update.range,
    ));
    let mut scheduler = start_scheduler(SchedulerConfig::from(&config.update), sweep).await?;

    let base = config.server.base_path();
    let state = AppState {
        catalog_service: CatalogService::new(emoticon_repo),
        jobs,
        status_log: update_service.status_log(),
        provider,
        base_path: Arc::from(base.as_str()),
        admin_token: config.update.admin_token().map(Arc::from),
    };
    if state.admin_token.is_none() {
        info!("No update token configured, update endpoints are open");
    }

    let app = build_app(state, &storage, &base);

    // Start server with graceful shutdown
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!(addr = %listener.local_addr()?, base = %base, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = scheduler.shutdown().await {
        error!(error = %e, "Failed to stop scheduler");
    }

    info!("Checkpointing database...");
    qsticker_db::checkpoint(&db).await?;

    info!("Server shutdown complete");
    Ok(())
}

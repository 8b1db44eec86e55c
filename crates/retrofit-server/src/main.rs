//! Retrofit Register Server - Main entry point

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use retrofit_common::logging::{init_logging, LogConfig};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use retrofit_server::{
    audit,
    config::Config,
    db, features,
    ingest::{CsvIngestionPipeline, FileSource, S3FileSource},
    jobs::{JobDispatcher, RegisterJobRunner, RegisterJobSupervisor, TokioJobDispatcher},
    middleware,
    storage::{config::StorageConfig, Storage},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("retrofit-server")
        .filter_directives("retrofit_server=debug,tower_http=debug,sqlx=info")
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Retrofit Register Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let db_pool = db::create_pool(&config.database).await?;
    info!("Database connection pool established");

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    let storage_config = StorageConfig::from_env()?;
    let storage = Storage::new(storage_config);
    info!("Storage client initialized");

    let source: Arc<dyn FileSource> =
        Arc::new(S3FileSource::new(storage, config.register.max_file_size_bytes));
    let supervisor = RegisterJobSupervisor::new(db_pool.clone(), config.register.max_errors_count);

    let recovered = supervisor.recover_stale_jobs(config.register.job_timeout()).await?;
    info!(recovered, "Stale register jobs checked");

    let _audit_cleanup = audit::spawn_cleanup_task(db_pool.clone(), config.audit.clone());
    info!(
        retention_days = config.audit.retention_days,
        "Audit cleanup scheduled"
    );

    let pipeline = Arc::new(CsvIngestionPipeline::new(db_pool.clone(), &config.register)?);
    let runner = RegisterJobRunner::new(supervisor.clone(), Arc::clone(&source), pipeline);
    let dispatcher: Arc<dyn JobDispatcher> =
        Arc::new(TokioJobDispatcher::new(Arc::new(runner), config.register.job_timeout()));

    let feature_state = features::FeatureState {
        db: db_pool,
        supervisor,
        source,
        dispatcher,
    };

    let app = create_router(feature_state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: features::FeatureState) -> Router {
    let db = state.db.clone();

    Router::new()
        .route("/health", get(health_check))
        .with_state(db)
        .merge(features::router(state))
        // Apply layers from innermost to outermost
        .layer(middleware::correlation_id_layer())
        .layer(middleware::tracing_layer())
}

/// Health check handler
async fn health_check(State(db): State<sqlx::PgPool>) -> Result<Response, StatusCode> {
    match db::health_check(&db).await {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}

async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // In-flight register jobs are not awaited; the next start fails them as stale
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}

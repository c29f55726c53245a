//! Auth Service
//!
//! Issues and rotates JWT access/refresh token pairs for organization users.

use auth_service::config::Config;
use auth_service::crypto::signer_from_config;
use auth_service::observability::metrics::init_metrics_recorder;
use auth_service::repositories::{
    PgRevocationStore, PgUserStore, RedisRevocationStore, RevocationStore, UserStore,
};
use auth_service::routes::{self, AppState};
use auth_service::services::cleanup_service::start_revocation_cleanup;
use auth_service::services::{TokenService, TokenSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Auth Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        signing_algorithm = ?config.jwt_signing_algorithm,
        access_token_ttl_seconds = config.access_token_ttl_seconds,
        refresh_token_ttl_days = config.refresh_token_ttl_days,
        revocation_backend = if config.redis_url.is_some() { "redis" } else { "postgres" },
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run database migrations: {}", e);
            e
        })?;

    info!("Database connection established");

    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(db_pool.clone()));
    let revocations: Arc<dyn RevocationStore> = match &config.redis_url {
        Some(redis_url) => Arc::new(RedisRevocationStore::connect(redis_url).await?),
        None => Arc::new(PgRevocationStore::new(db_pool.clone())),
    };

    let signer = signer_from_config(&config).map_err(|e| {
        error!("Failed to initialize token signer: {}", e);
        e
    })?;
    info!(key_id = signer.key_id(), "Token signer ready");

    let token_service = Arc::new(TokenService::new(
        Arc::clone(&users),
        Arc::clone(&revocations),
        signer,
        TokenSettings::from_config(&config),
    ));

    let cancel_token = CancellationToken::new();
    let cleanup_handle = tokio::spawn(start_revocation_cleanup(
        Arc::clone(&revocations),
        Duration::from_secs(config.revocation_purge_interval_seconds),
        cancel_token.child_token(),
    ));

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState {
        token_service,
        users,
        revocations,
        config,
    });

    let app = routes::build_routes(state, metrics_handle);

    info!("Auth Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cancel_token.cancel();
    if let Err(e) = cleanup_handle.await {
        error!("Revocation cleanup task failed: {}", e);
    }
    db_pool.close().await;

    info!("Auth Service shutdown complete");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

//! taskforge HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskforge_api::{
    router, AppConfig, AppState, BoardService, ProvisioningService, ShadowIndexer,
};
use taskforge_core::{MigrationRunner, TenantDirectory};
use taskforge_db::{ConnectionCache, Database, EmbeddedMigrationRunner, PoolConfig, TenantResolver};
use taskforge_provision::{
    CommandMigrationRunner, GeminiBackend, MigrationMode, NeonProvisioner, PineconeClient,
};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "taskforge_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskforge_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("taskforge-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = AppConfig::from_env()?;

    // Central directory
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;
    let directory: Arc<dyn TenantDirectory> = Arc::new(db.tenants.clone());

    // External services
    let databases = Arc::new(NeonProvisioner::from_env()?);
    let pinecone = Arc::new(PineconeClient::from_env()?);
    let embedder = Arc::new(GeminiBackend::from_env()?);
    let migrations: Arc<dyn MigrationRunner> = match config.migration_mode {
        MigrationMode::Embedded => Arc::new(EmbeddedMigrationRunner::new()),
        MigrationMode::Command => Arc::new(CommandMigrationRunner::from_env()),
    };
    info!(runner = migrations.name(), "Tenant migration runner selected");

    // Tenant connections
    let cache = Arc::new(ConnectionCache::postgres(
        PoolConfig::tenant().max_connections(config.tenant_pool_max_connections),
    ));
    let resolver = TenantResolver::new(directory.clone(), cache);

    let shadow = Arc::new(ShadowIndexer::new(
        embedder,
        pinecone.clone(),
        config.shadow_retry,
    ));
    let provisioning = ProvisioningService::new(
        directory,
        databases,
        pinecone,
        migrations,
        config.index.clone(),
    );
    let board = BoardService::new(resolver, shadow.clone());
    let app = router(AppState::new(provisioning, board), &config.allowed_origins);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(pending = shadow.pending(), "Draining shadow sync jobs");
    shadow.drain().await;
    Ok(())
}

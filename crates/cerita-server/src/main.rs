mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use cerita_api::storage::ObjectStore;
use cerita_api::{AppState, AppStateInner, AuthConfig};

use crate::config::{Config, StorageConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cerita=debug,cerita_api=debug,cerita_db=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}.");
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    // Init database
    let db = cerita_db::Database::open(&config.db_path)?;

    let storage = match &config.storage {
        StorageConfig::Local { dir, public_url } => ObjectStore::local(dir, public_url)?,
        StorageConfig::Supabase { url, service_key } => {
            info!("Supabase object storage at {}", url);
            ObjectStore::supabase(url, service_key)
        }
    };

    let state: AppState = Arc::new(AppStateInner {
        db,
        auth: AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
            cookie_secure: config.cookie_secure,
        },
        teacher_code: config.teacher_code.clone(),
        storage,
        utc_offset: config.utc_offset,
    });

    if let Some(dir) = &config.static_dir {
        info!("Serving frontend from {}", dir.display());
    }
    let app = cerita_api::router(state, config.static_dir.as_deref());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("CeritaKita server listening on {} (mood day offset {})", addr, config.utc_offset);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable ({}), waiting for Ctrl+C", e);
                let _ = ctrl_c.await;
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}

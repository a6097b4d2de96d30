//! Clustered Cache node
//!
//! Starts one cluster member: an in-memory repository, the caches this node
//! hosts and the admin API that receives departure signals.
//!
//! This is a single-process demo host. The `MemoryRepository` lives inside
//! this process, so separate node processes never share a store and a
//! departure only purges what this process wrote. A real cluster supplies a
//! `CacheRepository` backed by an external database to every node.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clustered_cache::api::create_router;
use clustered_cache::cache::CacheRegistry;
use clustered_cache::cluster::ClusterMembership;
use clustered_cache::store::MemoryRepository;
use clustered_cache::{spawn_cleanup_task, AppState, Config};

/// Main entry point for a cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the shared repository and start the expiration sweep
/// 4. Create the configured caches and track them for membership changes
/// 5. Start HTTP admin server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clustered_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Starting node {}: port={}, cleanup_interval={}s, max_lifetime={}ms",
        config.node_id, config.server_port, config.cleanup_interval, config.default_max_lifetime_ms
    );

    let repository = Arc::new(MemoryRepository::new());
    let cleanup_handle = spawn_cleanup_task(repository.clone(), config.cleanup_interval);

    let registry = CacheRegistry::with_defaults(repository);
    let membership = ClusterMembership::new(config.node_id.clone());

    let names = if config.cache_names.is_empty() {
        registry.registered_names()
    } else {
        config.cache_names.clone()
    };
    for name in &names {
        let cache = registry
            .create_managed_cache(name, config.cache_settings(), config.node_id.clone())
            .with_context(|| format!("failed to create cache {}", name))?;
        membership.track(cache).await;
    }
    info!("{} caches ready", names.len());

    let app = create_router(AppState::new(membership));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Admin API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Node shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweep task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Expiration sweep aborted");
}

//! Pushgate server wiring.

pub mod config;

use std::sync::Arc;

use color_eyre::eyre::WrapErr as _;
use push_dispatch::{ChannelQueue, PushService, spawn_workers};
use push_driver::DriverRegistry;
use push_storage::AllStorage;
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Serve the push API on `config.server.addr` until `shutdown` resolves.
///
/// Queue workers are stopped after the listener and drain jobs that were
/// already queued.
pub async fn run<S>(
    config: Config,
    store: S,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> color_eyre::eyre::Result<()>
where
    S: AllStorage + 'static,
{
    for credential in &config.credentials {
        store
            .upsert_credential(&credential.to_credential())
            .wrap_err_with(|| format!("failed to store credential {}", credential.id))?;
    }

    let registry =
        DriverRegistry::from_config(&config.drivers).wrap_err("failed to build drivers")?;
    if registry.is_empty() {
        tracing::warn!("no drivers configured, every send will fail");
    }

    let (queue, jobs) = ChannelQueue::new(config.dispatch.queue_capacity);
    let workers = config.dispatch.workers;
    let service = Arc::new(PushService::new(store, registry, queue, config.dispatch));

    let (stop_workers, worker_shutdown) = tokio::sync::watch::channel(false);
    let handles = spawn_workers(workers, service.clone(), jobs, worker_shutdown);

    let app = push_http::push_router(service).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.server.addr)
        .await
        .wrap_err("failed to bind")?;
    tracing::info!(addr = %config.server.addr, workers, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .wrap_err("server error");

    tracing::info!("stopping workers");
    let _ = stop_workers.send(true);
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "worker panicked");
        }
    }

    served
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

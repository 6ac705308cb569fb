//! Standalone binary wiring a [`CoordinatorConfig`] and a [`LocalLog`] into
//! a running coordinator node, serving the `/api/v1/*` RPC surface until
//! shutdown is requested.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use silhouette_coordinator::{CoordinatorBuilder, CoordinatorConfig};
use silhouette_store::{LocalLog, ReplicatedLog};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = CoordinatorConfig::parse();
    tracing::info!(?config, "starting silhouette-db coordinator node");

    let log = Arc::new(LocalLog::new(config.node_id.clone()));
    for peer in &config.peers {
        if let Err(err) = log.add_voter(peer).await {
            tracing::error!(peer, %err, "failed to add voter");
            return ExitCode::FAILURE;
        }
    }

    let router = CoordinatorBuilder::init(&config, log).await.build();

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(addr = %config.listen_addr, %err, "failed to bind listen address");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(addr = %config.listen_addr, "listening");

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    match result {
        Ok(()) => {
            tracing::info!("shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "server exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("installing Ctrl+C handler should never fail");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing SIGTERM handler should never fail")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

//! Insert-task worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mmsearch_service::{SearchService, ServiceConfig};
use mmsearch_tasks::{RedisStore, TaskManager};
use mmsearch_worker::{Worker, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("mmsearch=info".parse().unwrap()))
        .init();

    info!("Starting mmsearch-worker");

    // Load configuration
    let worker_config = WorkerConfig::from_env();
    info!("Worker config: {:?}", worker_config);

    let service_config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Create the task store and manager
    let store = match RedisStore::from_env() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to create task store: {}", e);
            std::process::exit(1);
        }
    };
    let manager = TaskManager::new(store);

    // The service initializes its pipeline and index lazily on first task
    let service = Arc::new(SearchService::new(service_config));

    let worker = Arc::new(Worker::new(manager, service, worker_config));

    // Stop the loop at the next sleep boundary on ctrl-c
    let shutdown_worker = Arc::clone(&worker);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_worker.stop();
    });

    if let Err(e) = worker.run().await {
        error!("Worker error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

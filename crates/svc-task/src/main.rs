//! # svc-task
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and metrics
//! 2. Load the service configuration (`CONFIG_FILE_PATH`)
//! 3. Build the dispatch queue and the bus consumer
//! 4. Subscribe to the task events topic
//! 5. Spawn task workers
//! 6. Run until Ctrl-C, then close subscriptions and drain the queue
//!
//! ## Bus backends
//!
//! The bus client comes from `factory_for(MessageBusType)`. Only the
//! in-process bus is linked, and nothing outside the process publishes to
//! it. With `Kafka` or `RedisStreams` configured (the default is `Kafka`)
//! the service starts, logs that no client is available and receives no
//! task events until a client for that backend is added to `factory_for`.

use std::sync::Arc;

use anyhow::{Context, Result};
use odim_telemetry::{init_telemetry, TelemetryConfig};
use svc_task::config::config_file_path;
use svc_task::{
    bounded, factory_for, spawn_workers, LoggingProcessor, MetricsDropObserver, ServiceConfig, SharedConfig,
    SubscriptionManager, TaskEventConsumer, SERVICE_NAME,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_service(SERVICE_NAME))
        .context("Failed to initialize telemetry")?;

    let config_path = config_file_path();
    let config = ServiceConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    let shared_config = SharedConfig::new(config.clone());

    #[cfg(unix)]
    reload_on_hangup(shared_config.clone(), config_path)?;

    let (sender, receiver) = bounded(config.task_queue.queue_size);
    let consumer = Arc::new(TaskEventConsumer::new(sender, Arc::new(MetricsDropObserver)));

    let topic = &config.message_bus.task_events_topic;
    let bus_type = config.message_bus.bus_type;
    let manager = match factory_for(bus_type) {
        Ok(factory) => {
            let manager = SubscriptionManager::new(shared_config, factory, consumer);
            if let Err(e) = manager.subscribe(topic).await {
                warn!(topic = %topic, error = %e, "Task events will not be received");
            }
            Some(manager)
        }
        Err(e) => {
            warn!(
                topic = %topic,
                bus_type = %bus_type,
                error = %e,
                "No message bus client available, task events will not be received"
            );
            drop(consumer);
            None
        }
    };

    let workers = spawn_workers(
        config.task_queue.workers,
        Arc::new(receiver),
        Arc::new(LoggingProcessor),
    );

    info!(
        topic = %topic,
        queue_size = config.task_queue.queue_size,
        workers = config.task_queue.workers,
        "Task service started"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    if let Some(manager) = &manager {
        manager.close().await;
    }
    // Last queue sender goes with the manager; workers stop once drained.
    drop(manager);

    for worker in workers {
        if let Err(e) = worker.await {
            warn!(error = %e, "Task worker ended abnormally");
        }
    }

    info!("Task service stopped");
    Ok(())
}

/// Reload the configuration file on SIGHUP.
#[cfg(unix)]
fn reload_on_hangup(config: SharedConfig, path: std::path::PathBuf) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            if let Err(e) = config.reload(&path) {
                warn!(path = %path.display(), error = %e, "Configuration reload failed");
            }
        }
    });
    Ok(())
}

use queue_sync::queue::{patient_queues_list, QueueListResult};
use queue_sync::{ClientConfig, SynchronizationRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("queue_sync=info,queue_watch=info"))
        )
        .init();

    let config_path = std::env::var("QUEUE_SYNC_CONFIG").ok().map(PathBuf::from);
    let config = match ClientConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let Some(room) = config.room.clone() else {
        tracing::error!("No queue room configured, set QUEUE_SYNC_ROOM");
        std::process::exit(1);
    };

    tracing::info!(
        "Watching room {} (status {}) on {}",
        room,
        config.status,
        config.server_url
    );

    let registry = SynchronizationRegistry::new(Arc::new(config.transport()));
    let mut list = patient_queues_list(&registry, &config.base_route, &room, &config.status);

    loop {
        tokio::select! {
            _ = list.changed() => {
                let result = list.result();
                if !result.is_validating {
                    report(&result);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                break;
            }
        }
    }
}

fn report(result: &QueueListResult) {
    if let Some(e) = &result.is_error {
        tracing::warn!(
            "Refresh failed, showing {} cached entries: {}",
            result.patient_queue_count,
            e
        );
        return;
    }

    tracing::info!("{} patients waiting", result.patient_queue_count);
    for entry in &result.patient_queue_entries {
        tracing::info!(
            "{} | {} | {} | {} | waiting {} min | {}",
            entry.visit_number.as_deref().unwrap_or("--"),
            entry.name.as_deref().unwrap_or("--"),
            entry.patient_sex,
            entry.priority.as_deref().unwrap_or("--"),
            entry.wait_time,
            entry.status.as_deref().unwrap_or("--"),
        );
    }
}

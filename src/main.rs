//! Process entrypoint: loads configuration, wires every collaborator
//! behind [`nts::Collaborators`], starts the Prometheus exporter and the
//! liveness expiry loop as background tasks, then serves the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

use nts::admission::AlwaysResolves;
use nts::cli::Cli;
use nts::config::{ConfigManager, NtsConfig};
use nts::decommission::DecommissionWatcher;
use nts::dynamic_resources::DynamicResourceTable;
use nts::events::{EventDispatcher, NatsEventDispatcher, RecordingEventDispatcher};
use nts::labels::{InMemoryAttributesManager, InMemoryDelegatedUpdater, InMemoryLabelManager};
use nts::liveness::LivenessMonitor;
use nts::metrics_init::initialize_metrics;
use nts::ports::{DefaultRackResolver, KeyStoreTokenManager};
use nts::registry::NodeRegistry;
use nts::server::build_router;
use nts::types::{MasterKey, StaticKeyStore};
use nts::Collaborators;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "nts=info".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting Node Tracker Service v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let mut config = NtsConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(metrics_bind) = cli.metrics_bind {
        config.server.metrics_bind_addr = metrics_bind;
    }
    // Cluster epoch: fixed once per incarnation, read concurrently by every
    // register/heartbeat response afterwards without further sync.
    config.server.rm_identifier = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);

    let server_config = config.server.clone();
    let config_manager = Arc::new(ConfigManager::new(config));

    let events: Arc<dyn EventDispatcher> = match server_config.nats_url.as_deref() {
        Some(nats_url) => {
            info!(nats_url, "connecting to NATS for node event fan-out");
            match NatsEventDispatcher::connect(nats_url, "nts.events").await {
                Ok(dispatcher) => Arc::new(dispatcher),
                Err(e) => {
                    error!(error = %e, "failed to connect to NATS, falling back to in-process dispatcher");
                    Arc::new(RecordingEventDispatcher::new())
                }
            }
        }
        None => {
            info!("no nats_url configured, node events are recorded in-process only");
            Arc::new(RecordingEventDispatcher::new())
        }
    };

    let container_key_store = StaticKeyStore::new(MasterKey::new(1, vec![0u8; 32]));
    let container_tokens = Arc::new(KeyStoreTokenManager::new(container_key_store));
    let nm_key_store = StaticKeyStore::new(MasterKey::new(1, vec![0u8; 32]));
    let nm_tokens = Arc::new(KeyStoreTokenManager::new(nm_key_store));

    let collaborators = Collaborators {
        registry: Arc::new(NodeRegistry::new()),
        liveness: Arc::new(LivenessMonitor::new(Duration::from_millis(
            server_config.liveness_timeout_ms,
        ))),
        decommission: Arc::new(DecommissionWatcher::new()),
        dynamic_resources: Arc::new(DynamicResourceTable::new()),
        config: config_manager,
        events,
        container_tokens,
        nm_tokens,
        rack_resolver: Arc::new(DefaultRackResolver),
        host_resolver: Arc::new(AlwaysResolves),
        label_manager: Arc::new(InMemoryLabelManager::new()),
        delegated_updater: Arc::new(InMemoryDelegatedUpdater::new()),
        attributes_manager: Arc::new(InMemoryAttributesManager::new()),
    };

    initialize_metrics();
    let metrics_bind_addr = server_config.metrics_bind_addr;
    tokio::spawn(async move {
        if let Err(e) = start_metrics_server(metrics_bind_addr).await {
            error!(error = %e, "failed to start Prometheus metrics server");
        }
    });

    let liveness = collaborators.liveness.clone();
    let registry_for_liveness = collaborators.registry.clone();
    let events_for_liveness = collaborators.events.clone();
    let scan_interval = Duration::from_millis(server_config.liveness_scan_interval_ms);
    tokio::spawn(async move {
        liveness
            .run_expiry_loop(registry_for_liveness, events_for_liveness, scan_interval)
            .await;
    });

    let app = build_router(collaborators);

    info!(bind_addr = %server_config.bind_addr, "starting node tracker API server");
    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", server_config.bind_addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("node tracker API server error")?;

    Ok(())
}

async fn start_metrics_server(addr: SocketAddr) -> Result<()> {
    info!(metrics_addr = %addr, "starting Prometheus metrics server");
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;
    info!(metrics_addr = %addr, "Prometheus metrics server started");
    Ok(())
}

//! Main entry point for the control-plane binary
//!
//! Wires the real `kubectl` and HTTP leaf clients into the control plane,
//! starts the background loops and serves the API until Ctrl+C.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use control_plane::{
    ControlPlane, ControlPlaneConfig, ControlPlaneError, ControlPlaneResult, ServiceCatalog,
    services::{HttpLeafClient, KubectlClient, scheduler},
    web,
};
use shared::{ProcessId, logging, process_debug, process_info};

/// Chaos control plane for train-ticket services
#[derive(Parser)]
#[command(name = "control-plane")]
#[command(about = "Discovers service fault switches and injects chaos-mesh faults")]
pub struct Args {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTTP port, overrides config and CONTROL_PLANE_PORT
    #[arg(long)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Namespace chaos resources are created in
    #[arg(long)]
    pub namespace: Option<String>,

    /// Path to the kubectl binary
    #[arg(long)]
    pub kubectl: Option<String>,

    /// Service interface catalog, overrides config
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Skip background service discovery
    #[arg(long)]
    pub no_discovery: bool,
}

fn load_config(args: &Args) -> ControlPlaneResult<ControlPlaneConfig> {
    let mut config = match &args.config {
        Some(path) => ControlPlaneConfig::load(path)?,
        None => ControlPlaneConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(namespace) = &args.namespace {
        config.chaos.namespace = namespace.clone();
    }
    if let Some(kubectl) = &args.kubectl {
        config.chaos.kubectl = kubectl.clone();
    }
    if let Some(catalog) = &args.catalog {
        config.catalog.path = Some(catalog.clone());
    }
    if args.no_discovery {
        config.discovery.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ControlPlaneResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    ProcessId::init_control_plane();
    logging::init_tracing(Some(&args.log_level));
    logging::log_startup(ProcessId::current(), "chaos control plane");

    let config = load_config(&args)?;
    process_debug!(
        ProcessId::current(),
        "Namespace: {}, kubectl: {}, services: {}",
        config.chaos.namespace,
        config.chaos.kubectl,
        config.services.len()
    );

    let catalog = match &config.catalog.path {
        Some(path) => ServiceCatalog::load_or_empty(path),
        None => ServiceCatalog::empty(),
    }
    .with_package_overrides(config.catalog.package_overrides.clone());
    process_info!(
        ProcessId::current(),
        "📚 Service catalog covers {} services",
        catalog.service_names().len()
    );

    let leaf_client = HttpLeafClient::new(config.discovery.timeout())?;
    let cluster = KubectlClient::from_config(&config.chaos);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .map_err(|e| ControlPlaneError::config(format!("Invalid bind address: {e}")))?;

    let plane = Arc::new(ControlPlane::new(config, leaf_client, cluster, catalog));

    // Set up graceful shutdown
    let shutdown_rx = scheduler::shutdown_on(signal::ctrl_c());

    let background = plane.start_background(shutdown_rx.clone()).await;

    web::serve(Arc::clone(&plane), addr, shutdown_rx).await?;

    for handle in background {
        let _ = handle.await;
    }

    logging::log_success(ProcessId::current(), "Control plane stopped gracefully");
    Ok(())
}

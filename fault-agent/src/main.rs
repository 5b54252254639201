//! Main entry point for the fault-agent binary
//!
//! Loads a service's fault descriptors, seeds the switches from the
//! environment and serves the fault contract until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use fault_agent::{FaultSwitchSet, load_descriptors, serve};
use shared::{ProcessId, logging, process_debug};

/// Fault switch endpoints for one train-ticket service
#[derive(Parser)]
#[command(name = "fault-agent")]
#[command(about = "Serves /fault/info, /fault/status and /fault/control for one service")]
pub struct Args {
    /// JSON file holding the service's fault descriptors
    #[arg(long)]
    pub faults: PathBuf,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let info = load_descriptors(&args.faults).with_context(|| format!("loading {}", args.faults.display()))?;
    ProcessId::init_fault_agent(info.service_id.clone());
    logging::init_tracing(Some(&args.log_level));
    logging::log_startup(ProcessId::current(), &format!("fault agent for {}", info.service_id));

    let switches = Arc::new(FaultSwitchSet::from_env(info)?);
    let status = switches.status();
    process_debug!(ProcessId::current(), "Initial switches: {}", status.details);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal"),
            Err(err) => {
                logging::log_error(ProcessId::current(), "Signal handling", &err);
                std::future::pending::<()>().await;
            }
        }
    };
    serve(listener, switches, shutdown).await?;

    logging::log_success(ProcessId::current(), "Fault agent stopped gracefully");
    Ok(())
}

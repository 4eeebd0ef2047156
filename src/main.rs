//! Route Risk Core - Main Entry Point

use std::sync::Arc;
use std::time::Duration;

use route_risk_core::api::RiskService;
use route_risk_core::constants::{APP_NAME, APP_VERSION};
use route_risk_core::logic::config::PipelineConfig;
use route_risk_core::logic::risk::{FileRiskStore, RiskMapper};
use route_risk_core::logic::serial::DeviceTransport;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);

    let config = PipelineConfig::from_env();
    let code = match run(config).await {
        Ok(()) => 0,
        Err(e) => {
            log::error!("Fatal: {}", e);
            1
        }
    };

    // A parked stdin reader would otherwise hold the runtime open
    std::process::exit(code);
}

async fn run(config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let topology = config.load_topology()?;
    log::info!(
        "Topology: {} edges, update mode {:?}",
        topology.edges.len(),
        config.update_mode
    );
    let mapper = RiskMapper::new(topology, config.update_mode)?;

    let store = Arc::new(FileRiskStore::new(&config.data_dir)?);
    log::info!("Risk snapshot: {:?}", store.file_path());

    let service = RiskService::new(mapper, store, config.max_line_bytes)?;
    let transport = DeviceTransport::new(&config.device, config.chunk_size);
    service.connect_serial(transport).await?;

    let mut ticker = tokio::time::interval(Duration::from_secs(config.refresh_secs));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutdown requested");
                break;
            }
            _ = service.closed() => {
                log::info!("Sensor stream ended");
                break;
            }
            _ = ticker.tick() => {
                let status = service.get_risk_status();
                log::info!(
                    "Auto refresh ({}s): {} edges at risk, {} records, {}",
                    config.refresh_secs,
                    status.edges_at_risk,
                    status.records_applied,
                    status.last_updated_label
                );
            }
        }
    }

    if let Some(summary) = service.disconnect_serial().await? {
        log::info!(
            "Read loop stopped: {:?}, {} chunks, {} lines",
            summary.reason,
            summary.chunks_read,
            summary.lines_decoded
        );
    }

    let stats = service.get_pipeline_stats();
    log::info!(
        "Applied {} records, rejected {} non-JSON and {} malformed lines",
        stats.records_applied,
        stats.rejected_non_json,
        stats.rejected_malformed
    );
    Ok(())
}

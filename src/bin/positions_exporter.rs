use std::sync::Arc;

use dotenvy::dotenv;
use eyre::WrapErr;
use tracing::{error, info, instrument, warn};

use positions_exporter::config;
use positions_exporter::enrichment::EnrichmentEngine;
use positions_exporter::logging;
use positions_exporter::market_data::SchwabClient;
use positions_exporter::positions::{accounts, export, load_holdings};

#[instrument(name = "positions_exporter_main")]
#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    // Load configuration and read the access token
    let cfg = Arc::new(config::Config::load().wrap_err("failed to load configuration")?);
    let access_token = cfg.token_source.access_token().wrap_err("failed to read access token")?;
    info!(
        chains_url = %cfg.chains_url,
        max_in_flight = cfg.max_in_flight,
        requests_per_second = cfg.requests_per_second,
        "Configuration loaded and logging initialized"
    );

    // Initialize the market data client
    let client = Arc::new(SchwabClient::new(&cfg, access_token)?);

    // Load the raw holdings payload
    let payload = load_holdings(&cfg.holdings_source, client.as_ref()).await?;
    if let Some(path) = &cfg.raw_dump_path {
        export::write_raw_dump(path, &payload)?;
        info!(path = %path.display(), "Raw holdings payload saved");
    }

    if accounts(&payload).is_empty() {
        warn!("No accounts found in holdings payload");
        return Ok(());
    }

    // Phase 1: materialize positions and write the unenriched table
    let mut engine = EnrichmentEngine::from_config(client, &cfg);
    let position_count = engine.load_positions(&payload)?;
    export::write_csv(&cfg.output_path, engine.records())?;
    info!(position_count, "Phase 1 complete");

    // Phase 2: enrich option rows until done or Ctrl-C
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        warn!("Shutdown requested, finishing rows in flight");
    };
    let summary = engine.enrich(shutdown).await?;

    // Rewrite the table with whatever was enriched
    export::write_csv(&cfg.output_path, engine.records())?;

    info!(
        updated = summary.updated,
        failed = summary.failures.len(),
        failed_symbols = ?summary.failed_symbols(),
        elapsed_secs = %format!("{:.1}", summary.elapsed.as_secs_f64()),
        cancelled = summary.cancelled,
        "Phase 2 complete"
    );
    Ok(())
}

//! # Guild Gate Runtime
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `GG_CONFIG` file, `GG_*` environment)
//! 2. Install logging
//! 3. Validate configuration
//! 4. Connect the stores, build the gate context and start bucket cleanup
//! 5. Open the realm and serve the role procedures
//! 6. Run until Ctrl+C

use anyhow::{anyhow, Context, Result};
use gate_runtime::{serve_role_procedures, GateConfig, GateContext, GateRealm};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = GateConfig::load().context("Failed to load configuration")?;
    gg_telemetry::init_logging(&config.telemetry).context("Failed to initialize logging")?;
    config.validate().context("Invalid configuration")?;

    info!("===========================================");
    info!("  Guild Gate v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let sink = gg_telemetry::sink_for(&config.telemetry);
    let ctx = GateContext::connect(config, sink)
        .await
        .context("Failed to connect stores")?;

    let maintenance = ctx.spawn_maintenance();
    let realm = GateRealm::open(&ctx);
    serve_role_procedures(&realm, ctx.roles())
        .await
        .map_err(|res| anyhow!("Failed to serve role procedures: {:?}", res.error))?;

    info!(realm = %realm.uri(), "Gate is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    maintenance.abort();

    info!("Shutdown complete");
    Ok(())
}

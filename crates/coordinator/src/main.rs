//! Escrow Coordinator Server
//!
//! Serves the fund-escrow and multisig-payment flows over HTTP, plus the
//! business transaction records kept for the UI.

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coordinator::{build_state, start_server, CoordinatorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("========================================");
    info!("  Escrow Coordinator Starting");
    info!("========================================");

    // Every missing key is reported here, before any ledger connection.
    let config = CoordinatorConfig::from_env()?;
    let state = build_state(&config)?;

    let flows = state.flows.config();
    let wallets = state.flows.wallets();
    info!("Configuration:");
    info!("  - Listen address: {}", config.listen_addr);
    info!("  - Ledger node: {}", flows.node_url);
    info!("  - Issuer: {}", wallets.issuer.address());
    info!("  - Vault: {}", wallets.vault.address());
    info!("  - Signer: {}", wallets.signer.address());
    info!(
        "  - Asset: {} issued by {}",
        flows.asset.currency.display_name(),
        flows.asset.issuer
    );
    info!("  - Signer quorum: {}", flows.signer_quorum);
    info!(
        "  - Swap: {}",
        if flows.swap.is_some() { "enabled" } else { "disabled" }
    );
    info!("");
    info!("Endpoints:");
    info!("  GET    /health              - Health check");
    info!("  POST   /escrow/fund         - Fund the vault with the issued asset");
    info!("  POST   /multisig/sign       - Multisigned payment from the vault");
    info!("  POST   /transaction/create  - Record a business transaction");
    info!("  GET    /transaction         - List business transactions");

    if let Err(e) = start_server(state, config.listen_addr).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}

/// `RUST_LOG` filters; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

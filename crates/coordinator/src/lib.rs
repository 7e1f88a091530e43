//! HTTP coordinator for the escrow and multisig payment flows.
//!
//! - `POST /escrow/fund`: trust line + issuer payment into the vault
//! - `POST /multisig/sign`: signer list + multisigned vault payment (+ swap)
//! - `POST /transaction/create`, `GET /transaction`: business records
//! - `GET /health`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use chains::xrpl::{HttpConnector, LedgerGateway};
use orchestrator::PaymentFlows;

pub mod config;
pub mod error;
pub mod records;
pub mod routes;
pub mod state;

pub use config::CoordinatorConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use records::{MemoryRecordStore, RecordStore, SupabaseRecordStore};

/// Create the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/escrow/fund", post(routes::escrow::fund_escrow))
        .route("/multisig/sign", post(routes::multisig::multisig_sign))
        .route(
            "/transaction/create",
            post(routes::transactions::create_transaction),
        )
        .route("/transaction", get(routes::transactions::list_transactions))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Derive wallets and pick the record store. Fails on any bad seed.
pub fn build_state(config: &CoordinatorConfig) -> anyhow::Result<AppState> {
    let flow_config = config.flows.clone();
    let connector = HttpConnector::new(
        flow_config.node_url.clone(),
        flow_config.gateway.connect_timeout,
    );
    let gateway = LedgerGateway::new(Arc::new(connector), flow_config.gateway.clone());
    let flows = PaymentFlows::new(gateway, flow_config)?;

    let records: Arc<dyn RecordStore> = match &config.supabase {
        Some(supabase) => {
            info!("Transaction records stored in Supabase at {}", supabase.url);
            Arc::new(SupabaseRecordStore::new(supabase)?)
        }
        None => {
            info!("Supabase not configured, keeping transaction records in memory");
            Arc::new(MemoryRecordStore::new())
        }
    };

    Ok(AppState::new(flows, records))
}

/// Start the API server on the specified address.
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);

    info!("Starting coordinator on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

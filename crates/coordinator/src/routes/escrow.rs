//! Escrow funding endpoint

use axum::{extract::State, Json};

use common::{FundEscrowRequest, FundEscrowResponse};

use crate::{state::AppState, ApiResult};

/// POST /escrow/fund
///
/// Sets up the vault's trust line for the escrow asset if needed, then pays
/// the requested amount from the issuer to the vault.
pub async fn fund_escrow(
    State(state): State<AppState>,
    Json(payload): Json<FundEscrowRequest>,
) -> ApiResult<Json<FundEscrowResponse>> {
    tracing::info!(amount = %payload.amount, currency = %payload.currency, "Fund escrow requested");
    let response = state.flows.fund_escrow(&payload).await?;
    Ok(Json(response))
}

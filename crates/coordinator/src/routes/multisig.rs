//! Multisig payment endpoint

use axum::{extract::State, Json};

use common::MultisigPaymentResponse;

use crate::{state::AppState, ApiResult};

/// POST /multisig/sign
///
/// Installs the vault's signer list if needed, sends the configured payment
/// under a quorum of co-signers, then runs the swap when enabled.
pub async fn multisig_sign(
    State(state): State<AppState>,
) -> ApiResult<Json<MultisigPaymentResponse>> {
    tracing::info!("Multisig payment requested");
    let response = state.flows.multisig_payment().await?;
    Ok(Json(response))
}

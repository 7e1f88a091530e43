//! Transaction record endpoints

use axum::{extract::State, http::StatusCode, Json};

use common::{CreateTransactionRequest, TransactionRecord};

use crate::{error::ApiError, state::AppState, ApiResult};

/// POST /transaction/create
pub async fn create_transaction(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> ApiResult<(StatusCode, Json<TransactionRecord>)> {
    payload.validate().map_err(ApiError::BadRequest)?;

    let record = state.records.insert(payload.into_record()).await?;
    tracing::info!(transaction_id = %record.transaction_id, "Transaction record created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /transaction
pub async fn list_transactions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TransactionRecord>>> {
    let records = state.records.list().await?;
    tracing::debug!(count = records.len(), "Listed transaction records");
    Ok(Json(records))
}

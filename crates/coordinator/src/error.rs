//! HTTP mapping of flow and store failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use common::LedgerError;

use crate::records::StoreError;

/// API Result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A flow failed; status and type come from the ledger error.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Ledger(e) => match e {
                LedgerError::Configuration(_)
                | LedgerError::InvalidSecret(_)
                | LedgerError::InvalidQuorum { .. }
                | LedgerError::InvalidSignerList(_)
                | LedgerError::InvalidAmount(_)
                | LedgerError::InvalidCurrency(_)
                | LedgerError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
                LedgerError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
                LedgerError::SubmitTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                LedgerError::SubmitRejected { .. } | LedgerError::Prepare(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                LedgerError::InsufficientSignatures { .. }
                | LedgerError::DuplicateSubmission { .. } => StatusCode::CONFLICT,
                LedgerError::Signing(_)
                | LedgerError::SignatureMismatch(_)
                | LedgerError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Ledger(e) => e.kind(),
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Store(StoreError::Duplicate(_)) => "duplicate_record",
            ApiError::Store(_) => "record_store_error",
        }
    }

    /// Ledger result code, when the ledger produced one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Ledger(e) => e.result_code(),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
                "code": self.code(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                LedgerError::Configuration("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                LedgerError::InvalidAmount("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                LedgerError::Connection("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                LedgerError::SubmitTimeout { hash: "H".into() },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                LedgerError::rejected("tefBAD_QUORUM"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LedgerError::InsufficientSignatures {
                    collected: 1,
                    quorum: 2,
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status_code(), status);
        }
    }

    #[test]
    fn test_rejection_carries_code() {
        let error = ApiError::from(LedgerError::rejected("tecKILLED"));
        assert_eq!(error.error_type(), "submit_rejected");
        assert_eq!(error.code(), Some("tecKILLED"));

        assert_eq!(ApiError::BadRequest("x".into()).code(), None);
        assert_eq!(
            ApiError::from(StoreError::Duplicate("TX-1".into())).status_code(),
            StatusCode::CONFLICT
        );
    }
}

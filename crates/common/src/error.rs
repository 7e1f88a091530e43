//! Error taxonomy shared by the ledger gateway, the orchestrator and the
//! coordinator.
//!
//! Each variant maps to one failure class of a payment flow. Callers match on
//! the variant to decide whether a retry needs a freshly prepared transaction
//! (`SubmitRejected`), an independent status query (`SubmitTimeout`), or a
//! configuration fix (`InvalidSecret`, `InvalidQuorum`, `Configuration`).

use thiserror::Error;

/// Errors produced while preparing, signing and submitting ledger transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The ledger node could not be reached. No ledger state was changed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Autofill failed: malformed template or unfunded account.
    #[error("Prepare error: {0}")]
    Prepare(String),

    /// A seed could not be decoded.
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    /// Signer-list quorum can never be met by the configured weights.
    #[error("Invalid quorum: quorum {quorum} with total signer weight {total_weight}")]
    InvalidQuorum { quorum: u32, total_weight: u32 },

    /// Signer-list entries are malformed (duplicates, self-reference, bad weight).
    #[error("Invalid signer list: {0}")]
    InvalidSignerList(String),

    /// Collected signer weight is below the active quorum. Nothing was submitted.
    #[error("Insufficient signatures: collected weight {collected} of quorum {quorum}")]
    InsufficientSignatures { collected: u32, quorum: u32 },

    /// A signature could not be produced with the given key.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Partial signatures cover different prepared transactions.
    #[error("Signature mismatch: {0}")]
    SignatureMismatch(String),

    /// The same prepared transaction was submitted twice in one session.
    #[error("Duplicate submission for {account} sequence {sequence}")]
    DuplicateSubmission { account: String, sequence: u32 },

    /// Consensus rejected the transaction. The sequence number may be consumed;
    /// any retry must prepare a fresh transaction.
    #[error("Transaction rejected with {code}")]
    SubmitRejected {
        code: String,
        hash: Option<String>,
        ledger_index: Option<u32>,
    },

    /// Finality was not observed in time. The transaction may still commit;
    /// query the ledger for `hash` before assuming failure.
    #[error("Timed out waiting for validation of {hash}")]
    SubmitTimeout { hash: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Build a rejection from a bare result code.
    pub fn rejected(code: impl Into<String>) -> Self {
        LedgerError::SubmitRejected {
            code: code.into(),
            hash: None,
            ledger_index: None,
        }
    }

    /// The ledger result code carried by this error, if any.
    pub fn result_code(&self) -> Option<&str> {
        match self {
            LedgerError::SubmitRejected { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Stable snake_case name for logs and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Connection(_) => "connection_error",
            LedgerError::Prepare(_) => "prepare_error",
            LedgerError::InvalidSecret(_) => "invalid_secret",
            LedgerError::InvalidQuorum { .. } => "invalid_quorum",
            LedgerError::InvalidSignerList(_) => "invalid_signer_list",
            LedgerError::InsufficientSignatures { .. } => "insufficient_signatures",
            LedgerError::Signing(_) => "signing_error",
            LedgerError::SignatureMismatch(_) => "signature_mismatch",
            LedgerError::DuplicateSubmission { .. } => "duplicate_submission",
            LedgerError::SubmitRejected { .. } => "submit_rejected",
            LedgerError::SubmitTimeout { .. } => "submit_timeout",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::InvalidCurrency(_) => "invalid_currency",
            LedgerError::InvalidAddress(_) => "invalid_address",
            LedgerError::Configuration(_) => "configuration_error",
            LedgerError::Serialization(_) => "serialization_error",
        }
    }
}

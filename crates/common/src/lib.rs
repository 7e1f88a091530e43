//! Shared types for the escrow and multisig payment services.
//!
//! This crate provides:
//! - Ledger amounts, currency codes and classic addresses
//! - Transaction templates and signer lists
//! - API request/response bodies and business records
//! - The `LedgerError` taxonomy

pub mod address;
pub mod amount;
pub mod api;
pub mod error;
pub mod records;
pub mod transaction;

pub use address::{AccountId, ClassicAddress};
pub use amount::{Amount, Asset, CurrencyCode, Drops, IssuedAmount, IssuedValue};
pub use api::*;
pub use error::LedgerError;
pub use records::{CreateTransactionRequest, TransactionRecord};
pub use transaction::{
    SignerEntry, SignerList, SubmissionResult, TxTemplate, TEC_KILLED, TES_SUCCESS,
};

//! Ledger implementations for the payment services.
//!
//! This crate provides ledger-specific functionality:
//! - Seed decoding, key derivation and signing
//! - Binary transaction encoding
//! - The JSON-RPC node client
//! - Ledger sessions: autofill, submission and finality

pub mod xrpl;

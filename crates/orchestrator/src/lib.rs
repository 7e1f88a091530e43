//! Escrow and multisig payment orchestration.
//!
//! Steps, in the order a flow runs them:
//! - `trust_line`: the receiving wallet accepts the issued asset
//! - `signer_list`: co-signers and quorum installed on the vault
//! - `multisig`: quorum signatures collected, combined and submitted
//! - `settlement`: optional immediate-or-cancel swap
//!
//! `flows` strings the steps together per request, each run owning one
//! ledger session.

pub mod config;
pub mod flows;
pub mod multisig;
pub mod payment;
pub mod settlement;
pub mod signer_list;
pub mod trust_line;

pub use config::{FlowConfig, RoleWallets, SwapConfig};
pub use flows::PaymentFlows;
pub use multisig::{SignatureSet, SignerSource, StaticSigners};

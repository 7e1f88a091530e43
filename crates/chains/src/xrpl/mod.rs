//! XRP Ledger support.
//!
//! Includes:
//! - Family and ed25519 seed decoding, key derivation and local signing
//! - The binary transaction codec and transaction hashes
//! - Wallets that sign without exposing their seed
//! - A JSON-RPC client for rippled behind the `LedgerRpc` seam
//! - `LedgerGateway` / `LedgerSession`: autofill, submit, await finality,
//!   with one in-flight preparation per account across sessions
//! - Standalone and partial signatures and the multisig combiner

pub mod codec;
pub mod keys;
pub mod prepared;
pub mod rpc;
pub mod session;
pub mod signature;
pub mod wallet;

pub use keys::*;
pub use prepared::*;
pub use rpc::*;
pub use session::*;
pub use signature::*;
pub use wallet::*;

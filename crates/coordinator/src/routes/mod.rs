pub mod escrow;
pub mod health;
pub mod multisig;
pub mod transactions;

//! Shared fixtures for orchestrator integration tests (named to avoid
//! clashing with the `common` crate).
#![allow(dead_code)]

pub mod fixtures;
pub mod mock_ledger;

pub use fixtures::*;
pub use mock_ledger::*;

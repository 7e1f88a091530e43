//! Deterministic wallets and configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chains::xrpl::{GatewayOptions, LedgerGateway};
use common::{ClassicAddress, Drops};
use orchestrator::config::*;
use orchestrator::{FlowConfig, PaymentFlows};

use super::mock_ledger::MockLedger;

/// secp256k1 seed; also the issuer of the escrow asset.
pub const ISSUER_SEED: &str = "spjjbwMsTH4r4gEAxKR79HGMooipq";
pub const ISSUER_ADDRESS: &str = "rGuN53T7cUp6Ec5L2tX9H7oJ7vQzVy6Cvq";
pub const VAULT_SEED: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";
pub const VAULT_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
/// ed25519 seed.
pub const SIGNER_SEED: &str = "sEdSKaVGtEer9RrxMSMhFM2WVSW5LT3";
pub const SIGNER_ADDRESS: &str = "r3sNTMefq5gsRumMYsNznnX6yzzxVH6dTC";
pub const DESTINATION: &str = "rPFvtDtGjYioWhjiNtienpCEEXSkLK1m77";

/// 40-hex form of "RLUSD".
pub const RLUSD_HEX: &str = "524C555344000000000000000000000000000000";

pub const STARTING_DROPS: u64 = 100_000_000;

pub fn address(s: &str) -> ClassicAddress {
    ClassicAddress::parse(s).unwrap()
}

pub fn config_vars() -> HashMap<String, String> {
    [
        (XRPL_CLIENT, "http://127.0.0.1:5005"),
        (XRPL_ISSUER_SECRET, ISSUER_SEED),
        (XRPL_VAULT_SECRET, VAULT_SEED),
        (XRPL_SIGNER_SECRET, SIGNER_SEED),
        (XRPL_RLUSD_CURRENCY, "RLUSD"),
        (XRPL_RLUSD_ISSUER, ISSUER_ADDRESS),
        (XRPL_SIGNER_ADDRESS, DESTINATION),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn flow_config(overrides: &[(&str, &str)]) -> FlowConfig {
    let mut vars = config_vars();
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    let mut config = FlowConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
    config.gateway = test_options();
    config
}

pub fn test_options() -> GatewayOptions {
    GatewayOptions {
        connect_timeout: Duration::from_secs(1),
        finality_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(10),
        ledger_offset: 20,
        max_fee: Drops::new(2_000_000).unwrap(),
    }
}

pub fn test_gateway(ledger: &MockLedger) -> LedgerGateway {
    LedgerGateway::new(Arc::new(ledger.clone()), test_options())
}

/// A ledger where the issuer, vault and signer accounts exist.
pub fn funded_ledger() -> MockLedger {
    let ledger = MockLedger::new();
    for account in [ISSUER_ADDRESS, VAULT_ADDRESS, SIGNER_ADDRESS] {
        ledger.fund(&address(account), STARTING_DROPS);
    }
    ledger
}

pub fn flows(ledger: &MockLedger, overrides: &[(&str, &str)]) -> PaymentFlows {
    PaymentFlows::new(test_gateway(ledger), flow_config(overrides)).unwrap()
}

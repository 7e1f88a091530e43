//! Flow configuration.
//!
//! Values come from a key lookup (the process environment in production).
//! Every missing required key is reported at once, before any connection to
//! the ledger is attempted.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use zeroize::Zeroizing;

use chains::xrpl::{parse_node_url, GatewayOptions, Wallet};
use common::{Asset, ClassicAddress, CurrencyCode, Drops, IssuedValue, LedgerError};

pub const XRPL_CLIENT: &str = "XRPL_CLIENT";
pub const XRPL_ISSUER_SECRET: &str = "XRPL_ISSUER_SECRET";
pub const XRPL_VAULT_SECRET: &str = "XRPL_VAULT_SECRET";
pub const XRPL_SIGNER_SECRET: &str = "XRPL_SIGNER_SECRET";
pub const XRPL_RLUSD_CURRENCY: &str = "XRPL_RLUSD_CURRENCY";
pub const XRPL_RLUSD_ISSUER: &str = "XRPL_RLUSD_ISSUER";
pub const XRPL_SIGNER_ADDRESS: &str = "XRPL_SIGNER_ADDRESS";

/// Trust limit the vault declares for the issued asset.
pub const DEFAULT_TRUST_LIMIT: &str = "10000000";
pub const DEFAULT_SIGNER_QUORUM: u32 = 2;
/// 0.1 XRP.
pub const DEFAULT_MULTISIG_AMOUNT_DROPS: u64 = 100_000;

// ============================================================================
// Key lookup
// ============================================================================

/// Reads configuration keys and remembers which required ones were absent.
pub struct ConfigReader<F> {
    lookup: F,
    missing: Vec<String>,
}

impl<F> ConfigReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    /// A non-empty value, or `None`.
    pub fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// A required value. Absence is recorded and reported by `check_missing`.
    pub fn required(&mut self, key: &str) -> String {
        match self.optional(key) {
            Some(value) => value,
            None => {
                self.missing.push(key.to_string());
                String::new()
            }
        }
    }

    /// Parse an optional value, falling back to `default`.
    pub fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, LedgerError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw.parse::<T>().map_err(|e| {
                LedgerError::Configuration(format!("{} has an invalid value: {}", key, e))
            }),
            None => Ok(default),
        }
    }

    /// Fail with every missing required key named.
    pub fn check_missing(&self) -> Result<(), LedgerError> {
        if self.missing.is_empty() {
            return Ok(());
        }
        Err(LedgerError::Configuration(format!(
            "missing required configuration: {}",
            self.missing.join(", ")
        )))
    }
}

/// Environment-backed lookup.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ============================================================================
// Secrets
// ============================================================================

/// A configured seed. Zeroized on drop and never printed.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(<redacted>)")
    }
}

// ============================================================================
// Flow configuration
// ============================================================================

/// Follow-on immediate-or-cancel offer after the multisig payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapConfig {
    /// Native amount offered.
    pub taker_gets: Drops,
    /// Issued amount wanted in return.
    pub taker_pays: IssuedValue,
}

#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub node_url: String,
    pub issuer_secret: SecretString,
    pub vault_secret: SecretString,
    pub signer_secret: SecretString,
    pub asset: Asset,
    pub trust_limit: IssuedValue,
    /// Destination of the multisig payment.
    pub payment_destination: ClassicAddress,
    pub signer_quorum: u32,
    pub multisig_amount: Drops,
    /// Whether the vault's own key should count toward its quorum.
    pub vault_cosigns: bool,
    pub swap: Option<SwapConfig>,
    pub gateway: GatewayOptions,
}

impl FlowConfig {
    pub fn from_env() -> Result<Self, LedgerError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LedgerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = ConfigReader::new(lookup);
        Self::read(&mut reader)
    }

    /// Read the XRPL keys through a shared reader, so callers can add keys of
    /// their own before the missing-key check.
    pub fn read<F>(reader: &mut ConfigReader<F>) -> Result<Self, LedgerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let node_url = reader.required(XRPL_CLIENT);
        let issuer_secret = SecretString::new(reader.required(XRPL_ISSUER_SECRET));
        let vault_secret = SecretString::new(reader.required(XRPL_VAULT_SECRET));
        let signer_secret = SecretString::new(reader.required(XRPL_SIGNER_SECRET));
        let currency = reader.required(XRPL_RLUSD_CURRENCY);
        let issuer = reader.required(XRPL_RLUSD_ISSUER);
        let destination = reader.required(XRPL_SIGNER_ADDRESS);
        reader.check_missing()?;

        let invalid = |key: &str, e: LedgerError| {
            LedgerError::Configuration(format!("{} has an invalid value: {}", key, e))
        };

        parse_node_url(&node_url).map_err(|e| invalid(XRPL_CLIENT, e))?;
        let node_url = node_url.trim().to_string();

        let asset = Asset {
            currency: CurrencyCode::parse(&currency).map_err(|e| invalid(XRPL_RLUSD_CURRENCY, e))?,
            issuer: ClassicAddress::parse(&issuer).map_err(|e| invalid(XRPL_RLUSD_ISSUER, e))?,
        };
        let payment_destination =
            ClassicAddress::parse(&destination).map_err(|e| invalid(XRPL_SIGNER_ADDRESS, e))?;

        let trust_limit = match reader.optional("XRPL_TRUST_LIMIT") {
            Some(raw) => IssuedValue::parse(&raw).map_err(|e| invalid("XRPL_TRUST_LIMIT", e))?,
            None => IssuedValue::parse(DEFAULT_TRUST_LIMIT)?,
        };
        let signer_quorum = reader.parsed_or("XRPL_SIGNER_QUORUM", DEFAULT_SIGNER_QUORUM)?;
        let multisig_amount = Drops::new(
            reader.parsed_or("XRPL_MULTISIG_AMOUNT_DROPS", DEFAULT_MULTISIG_AMOUNT_DROPS)?,
        )
        .map_err(|e| invalid("XRPL_MULTISIG_AMOUNT_DROPS", e))?;

        let vault_cosigns = reader.parsed_or("XRPL_VAULT_COSIGNS", false)?;
        if vault_cosigns {
            return Err(LedgerError::Configuration(
                "XRPL_VAULT_COSIGNS=true is not supported: the ledger never counts an \
                 account's own key toward its signer-list quorum"
                    .to_string(),
            ));
        }

        let swap = if reader.parsed_or("XRPL_SWAP_ENABLED", false)? {
            let drops = reader.optional("XRPL_SWAP_DROPS").ok_or_else(|| {
                LedgerError::Configuration("XRPL_SWAP_ENABLED requires XRPL_SWAP_DROPS".to_string())
            })?;
            let value = reader.optional("XRPL_SWAP_VALUE").ok_or_else(|| {
                LedgerError::Configuration("XRPL_SWAP_ENABLED requires XRPL_SWAP_VALUE".to_string())
            })?;
            Some(SwapConfig {
                taker_gets: Drops::parse(&drops).map_err(|e| invalid("XRPL_SWAP_DROPS", e))?,
                taker_pays: IssuedValue::parse(&value).map_err(|e| invalid("XRPL_SWAP_VALUE", e))?,
            })
        } else {
            None
        };

        let defaults = GatewayOptions::default();
        let gateway = GatewayOptions {
            connect_timeout: Duration::from_secs(
                reader.parsed_or("XRPL_CONNECT_TIMEOUT_SECS", defaults.connect_timeout.as_secs())?,
            ),
            finality_timeout: Duration::from_secs(reader.parsed_or(
                "XRPL_FINALITY_TIMEOUT_SECS",
                defaults.finality_timeout.as_secs(),
            )?),
            poll_interval: Duration::from_millis(reader.parsed_or(
                "XRPL_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            ledger_offset: reader.parsed_or("XRPL_LEDGER_OFFSET", defaults.ledger_offset)?,
            max_fee: Drops::new(reader.parsed_or("XRPL_MAX_FEE_DROPS", defaults.max_fee.get())?)
                .map_err(|e| invalid("XRPL_MAX_FEE_DROPS", e))?,
        };

        Ok(Self {
            node_url,
            issuer_secret,
            vault_secret,
            signer_secret,
            asset,
            trust_limit,
            payment_destination,
            signer_quorum,
            multisig_amount,
            vault_cosigns,
            swap,
            gateway,
        })
    }

    /// Derive the three role wallets. Fails on any malformed seed.
    pub fn wallets(&self) -> Result<RoleWallets, LedgerError> {
        let derive = |key: &str, secret: &SecretString| {
            Wallet::from_secret(secret.expose()).map_err(|e| match e {
                LedgerError::InvalidSecret(msg) => {
                    LedgerError::InvalidSecret(format!("{}: {}", key, msg))
                }
                other => other,
            })
        };
        Ok(RoleWallets {
            issuer: derive(XRPL_ISSUER_SECRET, &self.issuer_secret)?,
            vault: derive(XRPL_VAULT_SECRET, &self.vault_secret)?,
            signer: derive(XRPL_SIGNER_SECRET, &self.signer_secret)?,
        })
    }
}

/// One wallet per role.
#[derive(Debug, Clone)]
pub struct RoleWallets {
    pub issuer: Wallet,
    pub vault: Wallet,
    pub signer: Wallet,
}

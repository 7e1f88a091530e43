//! Wallet Provider: a signing identity derived from a stored secret.

use std::fmt;

use common::{AccountId, ClassicAddress, LedgerError};

use super::keys::{account_id, KeyType, Seed};

/// Address and key material of one role (issuer, vault, signer).
///
/// Wallets are read-only once built. The seed never leaves this type; only
/// signatures made with it do.
#[derive(Clone)]
pub struct Wallet {
    address: ClassicAddress,
    account_id: AccountId,
    public_key: [u8; 33],
    seed: Seed,
}

impl Wallet {
    /// Derive a wallet from an encoded seed (`s...` or `sEd...`).
    pub fn from_secret(secret: &str) -> Result<Self, LedgerError> {
        Self::from_seed(Seed::decode(secret)?)
    }

    pub fn from_seed(seed: Seed) -> Result<Self, LedgerError> {
        let public_key = seed.public_key()?;
        let account_id = account_id(&public_key);
        Ok(Self {
            address: account_id.to_address(),
            account_id,
            public_key,
            seed,
        })
    }

    pub fn address(&self) -> &ClassicAddress {
        &self.address
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn key_type(&self) -> KeyType {
        self.seed.key_type()
    }

    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    /// Upper-case hex public key, as the ledger shows `SigningPubKey`.
    pub fn public_key_hex(&self) -> String {
        hex::encode_upper(self.public_key)
    }

    /// Sign `message` with the wallet's key.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, LedgerError> {
        self.seed.sign(message)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("key_type", &self.key_type())
            .finish_non_exhaustive()
    }
}

//! Classic ledger addresses and the base58check codec they share with seeds.
//!
//! Addresses are `base58check(0x00 || account_id)` in the ledger alphabet,
//! where the checksum is the first four bytes of a double SHA-256.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::LedgerError;

/// Version prefix of a classic account address.
const ACCOUNT_ID_VERSION: u8 = 0x00;

/// Length of an account ID (RIPEMD-160 output).
pub const ACCOUNT_ID_LEN: usize = 20;

/// Encode `payload` with a 4-byte double-SHA-256 checksum in the ledger alphabet.
pub fn encode_check(payload: &[u8]) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&checksum(payload));
    bs58::encode(data)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_string()
}

/// Decode a ledger-alphabet base58check string, verifying the checksum.
///
/// Returns the payload without the checksum.
pub fn decode_check(encoded: &str) -> Result<Vec<u8>, String> {
    let data = bs58::decode(encoded)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_vec()
        .map_err(|e| format!("not base58: {}", e))?;

    if data.len() < 5 {
        return Err(format!("too short: {} bytes", data.len()));
    }

    let (payload, check) = data.split_at(data.len() - 4);
    if checksum(payload) != check {
        return Err("checksum mismatch".to_string());
    }
    Ok(payload.to_vec())
}

fn checksum(payload: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(payload));
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// A 20-byte account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub [u8; ACCOUNT_ID_LEN]);

impl AccountId {
    pub fn to_address(&self) -> ClassicAddress {
        let mut payload = Vec::with_capacity(ACCOUNT_ID_LEN + 1);
        payload.push(ACCOUNT_ID_VERSION);
        payload.extend_from_slice(&self.0);
        ClassicAddress(encode_check(&payload))
    }
}

/// A validated classic address (`r...`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClassicAddress(String);

impl ClassicAddress {
    /// Parse and checksum-verify a classic address.
    pub fn parse(address: &str) -> Result<Self, LedgerError> {
        let address = address.trim();
        let payload = decode_check(address)
            .map_err(|e| LedgerError::InvalidAddress(format!("{}: {}", address, e)))?;

        if payload.len() != ACCOUNT_ID_LEN + 1 || payload[0] != ACCOUNT_ID_VERSION {
            return Err(LedgerError::InvalidAddress(format!(
                "{}: not an account address",
                address
            )));
        }
        Ok(Self(address.to_string()))
    }

    /// Decode back to the 20-byte account ID.
    pub fn account_id(&self) -> AccountId {
        // Validated on construction, so the payload shape is known.
        let payload = decode_check(&self.0).unwrap_or_default();
        let mut id = [0u8; ACCOUNT_ID_LEN];
        if payload.len() == ACCOUNT_ID_LEN + 1 {
            id.copy_from_slice(&payload[1..]);
        }
        AccountId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClassicAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ClassicAddress {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClassicAddress {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClassicAddress> for String {
    fn from(address: ClassicAddress) -> Self {
        address.0
    }
}

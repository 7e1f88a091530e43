//! Seed decoding and key derivation.
//!
//! Two seed families exist:
//! - family seeds (`s...`, version `0x21`) derive secp256k1 keys through the
//!   root/account generator scheme;
//! - ed25519 seeds (`sEd...`, version `01 E1 4B`) hash straight to an ed25519
//!   secret key.
//!
//! Both carry 16 bytes of entropy. Secret keys are derived on demand for
//! signing and zeroized afterwards; the seed never leaves the process.

use std::fmt;

use ed25519_dalek::Signer;
use generic_ec::curves::Secp256k1;
use generic_ec::{Point, Scalar};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::RngCore;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

use common::address::{decode_check, encode_check, AccountId, ACCOUNT_ID_LEN};
use common::{ClassicAddress, LedgerError};

/// Bytes of entropy in a seed.
pub const SEED_ENTROPY_LEN: usize = 16;

const FAMILY_SEED_VERSION: [u8; 1] = [0x21];
const ED25519_SEED_VERSION: [u8; 3] = [0x01, 0xE1, 0x4B];

/// Prefix marking an ed25519 public key.
const ED25519_KEY_PREFIX: u8 = 0xED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Secp256k1,
    Ed25519,
}

impl KeyType {
    /// Lower-case name, as in the `key_type` of wallet files.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Secp256k1 => "secp256k1",
            KeyType::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KeyType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "secp256k1" => Ok(KeyType::Secp256k1),
            "ed25519" => Ok(KeyType::Ed25519),
            other => Err(LedgerError::InvalidSecret(format!(
                "unknown key type '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Seeds
// ============================================================================

/// Seed entropy tagged with its key type. Zeroized on drop.
#[derive(Clone)]
pub struct Seed {
    key_type: KeyType,
    entropy: Zeroizing<[u8; SEED_ENTROPY_LEN]>,
}

impl Seed {
    pub fn from_entropy(entropy: [u8; SEED_ENTROPY_LEN], key_type: KeyType) -> Self {
        Self {
            key_type,
            entropy: Zeroizing::new(entropy),
        }
    }

    /// Fresh seed from the OS random source.
    pub fn random(key_type: KeyType) -> Self {
        let mut entropy = [0u8; SEED_ENTROPY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut entropy);
        let seed = Self::from_entropy(entropy, key_type);
        entropy.fill(0);
        seed
    }

    /// Decode an encoded seed. The key type follows from the version prefix.
    pub fn decode(secret: &str) -> Result<Self, LedgerError> {
        let payload = Zeroizing::new(decode_check(secret.trim()).map_err(|e| {
            LedgerError::InvalidSecret(format!("seed is not valid base58check: {}", e))
        })?);

        let (key_type, entropy) = if payload.len() == ED25519_SEED_VERSION.len() + SEED_ENTROPY_LEN
            && payload.starts_with(&ED25519_SEED_VERSION)
        {
            (KeyType::Ed25519, &payload[ED25519_SEED_VERSION.len()..])
        } else if payload.len() == FAMILY_SEED_VERSION.len() + SEED_ENTROPY_LEN
            && payload.starts_with(&FAMILY_SEED_VERSION)
        {
            (KeyType::Secp256k1, &payload[FAMILY_SEED_VERSION.len()..])
        } else {
            return Err(LedgerError::InvalidSecret(format!(
                "unexpected seed version or length ({} bytes)",
                payload.len()
            )));
        };

        let mut bytes = [0u8; SEED_ENTROPY_LEN];
        bytes.copy_from_slice(entropy);
        let seed = Self::from_entropy(bytes, key_type);
        bytes.fill(0);
        Ok(seed)
    }

    /// Base58check encoding with the version prefix of the key type.
    pub fn encode(&self) -> Zeroizing<String> {
        let version: &[u8] = match self.key_type {
            KeyType::Secp256k1 => &FAMILY_SEED_VERSION,
            KeyType::Ed25519 => &ED25519_SEED_VERSION,
        };
        let mut payload = Zeroizing::new(Vec::with_capacity(version.len() + SEED_ENTROPY_LEN));
        payload.extend_from_slice(version);
        payload.extend_from_slice(&self.entropy[..]);
        Zeroizing::new(encode_check(&payload))
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Public key of account index 0 (33 bytes).
    pub fn public_key(&self) -> Result<[u8; 33], LedgerError> {
        match self.key_type {
            KeyType::Ed25519 => Ok(ed25519_public_key(&self.entropy)),
            KeyType::Secp256k1 => secp256k1_public_key(&self.entropy),
        }
    }

    /// Sign `message` with the account key.
    ///
    /// ed25519 signs the message itself. secp256k1 signs its SHA-512 half
    /// with a canonical (low-S) DER-encoded ECDSA signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, LedgerError> {
        match self.key_type {
            KeyType::Ed25519 => {
                let secret = Zeroizing::new(sha512_half(&self.entropy[..]));
                let signing_key = ed25519_dalek::SigningKey::from_bytes(&secret);
                Ok(signing_key.sign(message).to_bytes().to_vec())
            }
            KeyType::Secp256k1 => {
                let secret = secp256k1_account_secret(&self.entropy)?;
                let bytes = Zeroizing::new(secret.to_be_bytes().to_vec());
                let signing_key = k256::ecdsa::SigningKey::from_slice(&bytes)
                    .map_err(|e| LedgerError::Signing(format!("invalid secret key: {}", e)))?;

                let digest = sha512_half(message);
                let signature: k256::ecdsa::Signature = signing_key
                    .sign_prehash(&digest)
                    .map_err(|e| LedgerError::Signing(e.to_string()))?;
                let signature = signature.normalize_s().unwrap_or(signature);
                Ok(signature.to_der().as_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("key_type", &self.key_type)
            .field("entropy", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Derivation
// ============================================================================

/// First half of SHA-512.
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

/// Account ID of a public key: RIPEMD-160(SHA-256(public key)).
pub fn account_id(public_key: &[u8]) -> AccountId {
    let sha256_hash = Sha256::digest(public_key);
    let ripemd_hash = Ripemd160::digest(sha256_hash);

    let mut id = [0u8; ACCOUNT_ID_LEN];
    id.copy_from_slice(&ripemd_hash);
    AccountId(id)
}

/// Classic address of a public key.
pub fn derive_address(public_key: &[u8]) -> ClassicAddress {
    account_id(public_key).to_address()
}

fn ed25519_public_key(entropy: &[u8; SEED_ENTROPY_LEN]) -> [u8; 33] {
    let secret = Zeroizing::new(sha512_half(entropy));
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&secret);

    let mut out = [0u8; 33];
    out[0] = ED25519_KEY_PREFIX;
    out[1..].copy_from_slice(signing_key.verifying_key().as_bytes());
    out
}

/// Hash `data || discriminator || counter` until the result is a valid
/// non-zero scalar.
fn derive_scalar(
    data: &[u8],
    discriminator: Option<u32>,
) -> Result<Scalar<Secp256k1>, LedgerError> {
    for counter in 0u32..=u32::MAX {
        let mut hasher = Sha512::new();
        hasher.update(data);
        if let Some(discriminator) = discriminator {
            hasher.update(discriminator.to_be_bytes());
        }
        hasher.update(counter.to_be_bytes());
        let digest = hasher.finalize();

        if let Ok(scalar) = Scalar::<Secp256k1>::from_be_bytes(&digest[..32]) {
            if scalar != Scalar::zero() {
                return Ok(scalar);
            }
        }
    }
    Err(LedgerError::InvalidSecret("no valid scalar for seed".to_string()))
}

/// Secret of account index 0: root secret plus the account tweak.
fn secp256k1_account_secret(
    entropy: &[u8; SEED_ENTROPY_LEN],
) -> Result<Scalar<Secp256k1>, LedgerError> {
    let root_secret = derive_scalar(entropy, None)?;
    let root_public = (Point::<Secp256k1>::generator() * root_secret).to_bytes(true);

    let account_tweak = derive_scalar(&root_public, Some(0))?;
    Ok(root_secret + account_tweak)
}

fn secp256k1_public_key(entropy: &[u8; SEED_ENTROPY_LEN]) -> Result<[u8; 33], LedgerError> {
    let account_secret = secp256k1_account_secret(entropy)?;
    let bytes = (Point::<Secp256k1>::generator() * account_secret).to_bytes(true);

    let mut out = [0u8; 33];
    out.copy_from_slice(&bytes);
    Ok(out)
}

// ============================================================================
// Verification
// ============================================================================

/// Check `signature` over `message` against a 33-byte ledger public key.
///
/// High-S secp256k1 signatures are refused, as the ledger refuses them.
pub fn verify_signature(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    if public_key.len() != 33 {
        return false;
    }
    if public_key[0] == ED25519_KEY_PREFIX {
        let key = <[u8; 32]>::try_from(&public_key[1..])
            .ok()
            .and_then(|bytes| ed25519_dalek::VerifyingKey::from_bytes(&bytes).ok());
        let signature = ed25519_dalek::Signature::from_slice(signature).ok();
        return match (key, signature) {
            (Some(key), Some(signature)) => key.verify_strict(message, &signature).is_ok(),
            _ => false,
        };
    }

    let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(public_key).ok();
    let signature = k256::ecdsa::Signature::from_der(signature).ok();
    match (key, signature) {
        (Some(key), Some(signature)) => {
            signature.normalize_s().is_none()
                && key
                    .verify_prehash(&sha512_half(message), &signature)
                    .is_ok()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Genesis account of every new ledger ("masterpassphrase").
    const GENESIS_SEED: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";
    const GENESIS_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
    const GENESIS_PUBLIC_KEY: &str =
        "0330E7FC9D56BB25D6893BA3F317AE5BCF33B3291BD63DB32654A313222F7FD020";

    #[test]
    fn test_decode_family_seed() {
        let seed = Seed::decode(GENESIS_SEED).unwrap();
        assert_eq!(seed.key_type(), KeyType::Secp256k1);
        assert_eq!(
            hex::encode(&seed.entropy[..]),
            "dedce9ce67b451d852fd4e846fcde31c"
        );
        assert_eq!(seed.encode().as_str(), GENESIS_SEED);
    }

    #[test]
    fn test_secp256k1_derivation() {
        let seed = Seed::decode(GENESIS_SEED).unwrap();
        let public_key = seed.public_key().unwrap();
        assert_eq!(hex::encode_upper(public_key), GENESIS_PUBLIC_KEY);
        assert_eq!(derive_address(&public_key).as_str(), GENESIS_ADDRESS);
    }

    #[test]
    fn test_secp256k1_derivation_other_entropy() {
        let seed = Seed::from_entropy([3u8; 16], KeyType::Secp256k1);
        assert_eq!(seed.encode().as_str(), "spjjbwMsTH4r4gEAxKR79HGMooipq");
        assert_eq!(
            hex::encode_upper(seed.public_key().unwrap()),
            "020BA4ABEDFE485EA221A5BA22FCB52585FBBC74EE9FE50B6E2382433A642A1F24"
        );
        assert_eq!(
            derive_address(&seed.public_key().unwrap()).as_str(),
            "rGuN53T7cUp6Ec5L2tX9H7oJ7vQzVy6Cvq"
        );
    }

    #[test]
    fn test_ed25519_derivation() {
        let seed = Seed::from_entropy([1u8; 16], KeyType::Ed25519);
        assert_eq!(seed.encode().as_str(), "sEdSKaVGtEer9RrxMSMhFM2WVSW5LT3");

        let decoded = Seed::decode("sEdSKaVGtEer9RrxMSMhFM2WVSW5LT3").unwrap();
        assert_eq!(decoded.key_type(), KeyType::Ed25519);

        let public_key = decoded.public_key().unwrap();
        assert_eq!(
            hex::encode_upper(public_key),
            "ED06895BEC3FDE4090F06D840770D888D49E3089B3757C4285E3851BC33964E0F9"
        );
        assert_eq!(
            hex::encode(account_id(&public_key).0),
            "4d34f18eebfd64c25996d2c5bd8c699ddeb94626"
        );
        assert_eq!(
            derive_address(&public_key).as_str(),
            "r3sNTMefq5gsRumMYsNznnX6yzzxVH6dTC"
        );
    }

    #[test]
    fn test_decode_rejects_malformed_seeds() {
        for secret in [
            "",
            "not a seed",
            // Altered checksum.
            "snoPBrXtMeMyMHUVTgbuqAfg1SUTc",
            // An address is valid base58check but not a seed.
            GENESIS_ADDRESS,
        ] {
            let err = Seed::decode(secret).unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidSecret(_)),
                "{:?} for {}",
                err,
                secret
            );
        }
    }

    #[test]
    fn test_debug_redacts_entropy() {
        let seed = Seed::decode(GENESIS_SEED).unwrap();
        let rendered = format!("{:?}", seed);
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("dedce9ce"));
    }

    #[test]
    fn test_ed25519_signature_is_deterministic() {
        let seed = Seed::from_entropy([1u8; 16], KeyType::Ed25519);
        let signature = seed.sign(b"escrow payment").unwrap();
        assert_eq!(
            hex::encode_upper(&signature),
            "D6733863ADEF2D375ED88B9C784B91A7CBBB8E0233DB00F632ECEBD2C9CBE0D8\
             CAB96ED53918900FE0F376EE3AC15F53380EBBC835D87FA93636B7CAC2A9FE0E"
        );

        let public_key = seed.public_key().unwrap();
        assert!(verify_signature(&public_key, b"escrow payment", &signature));
        assert!(!verify_signature(&public_key, b"escrow paymenT", &signature));
    }

    #[test]
    fn test_secp256k1_signature_verifies() {
        let seed = Seed::decode(GENESIS_SEED).unwrap();
        let public_key = seed.public_key().unwrap();
        let signature = seed.sign(b"escrow payment").unwrap();

        // DER: SEQUENCE tag, then two INTEGERs.
        assert_eq!(signature[0], 0x30);
        assert!(verify_signature(&public_key, b"escrow payment", &signature));
        assert!(!verify_signature(&public_key, b"another message", &signature));

        let other = Seed::from_entropy([3u8; 16], KeyType::Secp256k1);
        assert!(!verify_signature(
            &other.public_key().unwrap(),
            b"escrow payment",
            &signature
        ));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let public_key = Seed::decode(GENESIS_SEED).unwrap().public_key().unwrap();
        assert!(!verify_signature(&public_key, b"m", b"not a signature"));
        assert!(!verify_signature(&public_key[..20], b"m", b"x"));
    }

    #[test]
    fn test_random_seed_round_trips() {
        let seed = Seed::random(KeyType::Ed25519);
        let decoded = Seed::decode(&seed.encode()).unwrap();
        assert_eq!(decoded.key_type(), KeyType::Ed25519);
        assert_eq!(decoded.public_key().unwrap(), seed.public_key().unwrap());
    }
}

//! Signing modes and the multisig combiner.
//!
//! The two signing modes produce different types. A `StandaloneSignature`
//! is a complete blob that can be submitted on its own; a `PartialSignature`
//! is one signer's contribution and only `combine` accepts it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use common::{ClassicAddress, LedgerError};

use super::codec;
use super::keys::verify_signature;
use super::prepared::PreparedTransaction;
use super::wallet::Wallet;

/// A single-signed, independently submittable transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandaloneSignature {
    /// Upper-case hex of the signed binary transaction.
    pub tx_blob: String,
    pub hash: String,
    pub account: ClassicAddress,
    pub sequence: u32,
    pub last_ledger_sequence: u32,
}

/// One signer's contribution to a multisigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSignature {
    pub signer: ClassicAddress,
    pub signing_pub_key: String,
    pub txn_signature: String,
    /// Fingerprint of the prepared transaction that was signed.
    pub fingerprint: String,
}

/// A multisigned transaction with its `Signers` array in ledger order.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedTransaction {
    tx_json: Value,
    tx_blob: String,
    hash: String,
    account: ClassicAddress,
    sequence: u32,
    last_ledger_sequence: u32,
    signers: Vec<ClassicAddress>,
}

impl CombinedTransaction {
    pub fn tx_json(&self) -> &Value {
        &self.tx_json
    }

    /// Upper-case hex of the binary transaction.
    pub fn tx_blob(&self) -> &str {
        &self.tx_blob
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn account(&self) -> &ClassicAddress {
        &self.account
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn last_ledger_sequence(&self) -> u32 {
        self.last_ledger_sequence
    }

    /// Signing accounts, sorted by account ID.
    pub fn signers(&self) -> &[ClassicAddress] {
        &self.signers
    }
}

// ============================================================================
// Signing
// ============================================================================

/// Sign `prepared` with `wallet` alone; the result is submittable on its own.
pub fn sign_standalone(
    wallet: &Wallet,
    prepared: &PreparedTransaction,
) -> Result<StandaloneSignature, LedgerError> {
    if prepared.is_multisig() {
        return Err(LedgerError::Signing(
            "transaction was prepared for multisigning".to_string(),
        ));
    }
    if wallet.address() != prepared.account() {
        return Err(LedgerError::Signing(format!(
            "{} cannot single-sign for {}",
            wallet.address(),
            prepared.account()
        )));
    }

    let mut tx_json = prepared.tx_json().clone();
    tx_json["SigningPubKey"] = Value::from(wallet.public_key_hex());
    let signature = wallet.sign(&codec::signing_data(&tx_json)?)?;
    tx_json["TxnSignature"] = Value::from(hex::encode_upper(signature));

    let blob = codec::encode(&tx_json)?;
    let hash = codec::transaction_hash(&blob);

    tracing::debug!(account = %wallet.address(), hash = %hash, "Signed transaction");

    Ok(StandaloneSignature {
        tx_blob: hex::encode_upper(&blob),
        hash,
        account: prepared.account().clone(),
        sequence: prepared.sequence(),
        last_ledger_sequence: prepared.last_ledger_sequence(),
    })
}

/// Produce `wallet`'s multisig contribution over `prepared`.
pub fn sign_partial(
    wallet: &Wallet,
    prepared: &PreparedTransaction,
) -> Result<PartialSignature, LedgerError> {
    if !prepared.is_multisig() {
        return Err(LedgerError::Signing(
            "transaction was not prepared for multisigning".to_string(),
        ));
    }

    let data = codec::multisigning_data(prepared.tx_json(), &wallet.account_id())?;
    let signature = wallet.sign(&data)?;

    tracing::debug!(
        account = %prepared.account(),
        signer = %wallet.address(),
        sequence = prepared.sequence(),
        "Collected partial signature"
    );

    Ok(PartialSignature {
        signer: wallet.address().clone(),
        signing_pub_key: wallet.public_key_hex(),
        txn_signature: hex::encode_upper(signature),
        fingerprint: prepared.fingerprint().to_string(),
    })
}

// ============================================================================
// Combining
// ============================================================================

/// Merge partial signatures over `prepared` into one submittable transaction.
///
/// Every partial must carry the fingerprint of `prepared` and a signature
/// that verifies over it, and no account may sign twice. Weight against the
/// quorum is the caller's concern.
pub fn combine(
    prepared: &PreparedTransaction,
    mut partials: Vec<PartialSignature>,
) -> Result<CombinedTransaction, LedgerError> {
    if !prepared.is_multisig() {
        return Err(LedgerError::Signing(
            "transaction was not prepared for multisigning".to_string(),
        ));
    }
    if partials.is_empty() {
        return Err(LedgerError::Signing(
            "no partial signatures to combine".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for partial in &partials {
        if partial.fingerprint != prepared.fingerprint() {
            return Err(LedgerError::SignatureMismatch(format!(
                "signature from {} covers a different transaction",
                partial.signer
            )));
        }
        if !seen.insert(partial.signer.account_id()) {
            return Err(LedgerError::SignatureMismatch(format!(
                "{} signed more than once",
                partial.signer
            )));
        }
        verify_partial(prepared, partial)?;
    }

    // The ledger requires Signers sorted by numeric account ID.
    partials.sort_by_key(|p| p.signer.account_id());

    let signers_json: Vec<Value> = partials
        .iter()
        .map(|p| {
            json!({
                "Signer": {
                    "Account": p.signer,
                    "SigningPubKey": p.signing_pub_key,
                    "TxnSignature": p.txn_signature,
                }
            })
        })
        .collect();

    let mut tx_json = prepared.tx_json().clone();
    tx_json["Signers"] = Value::Array(signers_json);

    let blob = codec::encode(&tx_json)?;
    let hash = codec::transaction_hash(&blob);

    Ok(CombinedTransaction {
        tx_json,
        tx_blob: hex::encode_upper(&blob),
        hash,
        account: prepared.account().clone(),
        sequence: prepared.sequence(),
        last_ledger_sequence: prepared.last_ledger_sequence(),
        signers: partials.into_iter().map(|p| p.signer).collect(),
    })
}

fn verify_partial(
    prepared: &PreparedTransaction,
    partial: &PartialSignature,
) -> Result<(), LedgerError> {
    let mismatch = || {
        LedgerError::SignatureMismatch(format!(
            "signature from {} does not verify",
            partial.signer
        ))
    };
    let public_key = hex::decode(&partial.signing_pub_key).map_err(|_| mismatch())?;
    let signature = hex::decode(&partial.txn_signature).map_err(|_| mismatch())?;
    let data = codec::multisigning_data(prepared.tx_json(), &partial.signer.account_id())?;

    if verify_signature(&public_key, &data, &signature) {
        Ok(())
    } else {
        Err(mismatch())
    }
}

//! Autofilled transactions ready for signing.

use serde_json::Value;
use sha2::{Digest, Sha256};

use common::{ClassicAddress, Drops, LedgerError, TxTemplate};

/// A transaction with `Sequence`, `Fee` and `LastLedgerSequence` filled in.
///
/// Only a `LedgerSession` creates these. The JSON is frozen at creation and
/// every signature over it carries its fingerprint, so signatures over
/// different preparations cannot be mixed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTransaction {
    template: TxTemplate,
    tx_json: Value,
    sequence: u32,
    fee: Drops,
    last_ledger_sequence: u32,
    signer_slots: u32,
    fingerprint: String,
}

impl PreparedTransaction {
    pub(crate) fn new(
        template: TxTemplate,
        sequence: u32,
        fee: Drops,
        last_ledger_sequence: u32,
        signer_slots: u32,
    ) -> Result<Self, LedgerError> {
        let mut tx_json = template.to_json()?;
        tx_json["Sequence"] = Value::from(sequence);
        tx_json["Fee"] = Value::from(fee.to_string());
        tx_json["LastLedgerSequence"] = Value::from(last_ledger_sequence);
        if signer_slots > 0 {
            // Multisigned transactions carry an empty signing key.
            tx_json["SigningPubKey"] = Value::from("");
        }

        let fingerprint = fingerprint(&tx_json)?;
        Ok(Self {
            template,
            tx_json,
            sequence,
            fee,
            last_ledger_sequence,
            signer_slots,
            fingerprint,
        })
    }

    pub fn template(&self) -> &TxTemplate {
        &self.template
    }

    pub fn account(&self) -> &ClassicAddress {
        self.template.account()
    }

    pub fn tx_json(&self) -> &Value {
        &self.tx_json
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn fee(&self) -> Drops {
        self.fee
    }

    pub fn last_ledger_sequence(&self) -> u32 {
        self.last_ledger_sequence
    }

    /// Number of signers the fee was sized for; zero for single-signed.
    pub fn signer_slots(&self) -> u32 {
        self.signer_slots
    }

    pub fn is_multisig(&self) -> bool {
        self.signer_slots > 0
    }

    /// Hex SHA-256 of the canonical JSON.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// SHA-256 over the JSON with object keys in sorted order.
pub fn fingerprint(tx_json: &Value) -> Result<String, LedgerError> {
    // serde_json's default map is ordered, so serialization is canonical.
    let bytes =
        serde_json::to_vec(tx_json).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(bytes)))
}

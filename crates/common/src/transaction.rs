//! Transaction templates, signer lists and submission results.
//!
//! Templates serialize to the ledger's JSON transaction format
//! (`TransactionType` tag, PascalCase fields). Autofill fields (`Sequence`,
//! `Fee`, `LastLedgerSequence`) are added later by the gateway.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::ClassicAddress;
use crate::amount::{Amount, IssuedAmount};
use crate::LedgerError;

/// Result code of a committed transaction.
pub const TES_SUCCESS: &str = "tesSUCCESS";

/// An immediate-or-cancel offer found nothing to cross.
pub const TEC_KILLED: &str = "tecKILLED";

/// Maximum number of entries in a signer list.
pub const MAX_SIGNER_ENTRIES: usize = 32;

/// Transaction flags.
pub mod flags {
    /// OfferCreate: fill what crosses immediately, cancel the remainder.
    pub const TF_IMMEDIATE_OR_CANCEL: u32 = 0x0002_0000;
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Payment {
    pub account: ClassicAddress,
    pub destination: ClassicAddress,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustSet {
    pub account: ClassicAddress,
    pub limit_amount: IssuedAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignerListSet {
    pub account: ClassicAddress,
    pub signer_quorum: u32,
    pub signer_entries: Vec<SignerEntryWrapper>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OfferCreate {
    pub account: ClassicAddress,
    pub taker_gets: Amount,
    pub taker_pays: Amount,
    pub flags: u32,
}

/// An unsigned, un-autofilled transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "TransactionType")]
pub enum TxTemplate {
    Payment(Payment),
    TrustSet(TrustSet),
    SignerListSet(SignerListSet),
    OfferCreate(OfferCreate),
}

impl TxTemplate {
    pub fn payment(
        account: ClassicAddress,
        destination: ClassicAddress,
        amount: impl Into<Amount>,
    ) -> Self {
        TxTemplate::Payment(Payment {
            account,
            destination,
            amount: amount.into(),
        })
    }

    pub fn trust_set(account: ClassicAddress, limit_amount: IssuedAmount) -> Self {
        TxTemplate::TrustSet(TrustSet {
            account,
            limit_amount,
        })
    }

    pub fn signer_list_set(account: ClassicAddress, list: &SignerList) -> Self {
        TxTemplate::SignerListSet(SignerListSet {
            account,
            signer_quorum: list.quorum,
            signer_entries: list
                .entries
                .iter()
                .cloned()
                .map(|signer_entry| SignerEntryWrapper { signer_entry })
                .collect(),
        })
    }

    /// An immediate-or-cancel offer: give `taker_gets`, receive `taker_pays`.
    pub fn immediate_offer(
        account: ClassicAddress,
        taker_gets: impl Into<Amount>,
        taker_pays: impl Into<Amount>,
    ) -> Self {
        TxTemplate::OfferCreate(OfferCreate {
            account,
            taker_gets: taker_gets.into(),
            taker_pays: taker_pays.into(),
            flags: flags::TF_IMMEDIATE_OR_CANCEL,
        })
    }

    /// Source account of the transaction.
    pub fn account(&self) -> &ClassicAddress {
        match self {
            TxTemplate::Payment(tx) => &tx.account,
            TxTemplate::TrustSet(tx) => &tx.account,
            TxTemplate::SignerListSet(tx) => &tx.account,
            TxTemplate::OfferCreate(tx) => &tx.account,
        }
    }

    pub fn transaction_type(&self) -> &'static str {
        match self {
            TxTemplate::Payment(_) => "Payment",
            TxTemplate::TrustSet(_) => "TrustSet",
            TxTemplate::SignerListSet(_) => "SignerListSet",
            TxTemplate::OfferCreate(_) => "OfferCreate",
        }
    }

    /// Ledger JSON form of the template.
    pub fn to_json(&self) -> Result<Value, LedgerError> {
        serde_json::to_value(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

// ============================================================================
// Signer lists
// ============================================================================

/// One authorized co-signer and its weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignerEntry {
    pub account: ClassicAddress,
    pub signer_weight: u16,
}

/// The ledger wraps every signer entry in a `{"SignerEntry": {...}}` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerEntryWrapper {
    #[serde(rename = "SignerEntry")]
    pub signer_entry: SignerEntry,
}

/// A quorum over weighted signer entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerList {
    pub quorum: u32,
    pub entries: Vec<SignerEntry>,
}

impl SignerList {
    pub fn new(quorum: u32, entries: Vec<SignerEntry>) -> Self {
        Self { quorum, entries }
    }

    pub fn total_weight(&self) -> u32 {
        self.entries.iter().map(|e| e.signer_weight as u32).sum()
    }

    pub fn weight_of(&self, account: &ClassicAddress) -> Option<u16> {
        self.entries
            .iter()
            .find(|e| &e.account == account)
            .map(|e| e.signer_weight)
    }

    /// Check that the list can be installed on `owner` and can ever be satisfied.
    pub fn validate(&self, owner: &ClassicAddress) -> Result<(), LedgerError> {
        if self.entries.is_empty() || self.entries.len() > MAX_SIGNER_ENTRIES {
            return Err(LedgerError::InvalidSignerList(format!(
                "expected 1 to {} entries, got {}",
                MAX_SIGNER_ENTRIES,
                self.entries.len()
            )));
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if entry.signer_weight == 0 {
                return Err(LedgerError::InvalidSignerList(format!(
                    "{} has zero weight",
                    entry.account
                )));
            }
            if &entry.account == owner {
                return Err(LedgerError::InvalidSignerList(format!(
                    "{} cannot list itself as a signer",
                    owner
                )));
            }
            if !seen.insert(&entry.account) {
                return Err(LedgerError::InvalidSignerList(format!(
                    "{} listed more than once",
                    entry.account
                )));
            }
        }

        let total_weight = self.total_weight();
        if self.quorum == 0 || self.quorum > total_weight {
            return Err(LedgerError::InvalidQuorum {
                quorum: self.quorum,
                total_weight,
            });
        }
        Ok(())
    }

    /// Equal quorum and equal entries, ignoring entry order.
    pub fn same_as(&self, other: &SignerList) -> bool {
        if self.quorum != other.quorum || self.entries.len() != other.entries.len() {
            return false;
        }
        let ours: HashSet<&SignerEntry> = self.entries.iter().collect();
        other.entries.iter().all(|e| ours.contains(e))
    }
}

// ============================================================================
// Results
// ============================================================================

/// The validated outcome of one submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub hash: String,
    pub ledger_index: u32,
    pub result_code: String,
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        self.result_code == TES_SUCCESS
    }
}

//! Multisig Payment Orchestrator.
//!
//! The payment moves through distinct types:
//! `TxTemplate -> PreparedTransaction -> SignatureSet -> CombinedTransaction
//! -> SubmissionResult`. Quorum is checked against the signer list read from
//! the ledger, before the transaction is prepared, so a doomed payment never
//! costs a sequence number or a fee.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;

use chains::xrpl::{
    combine, sign_partial, CombinedTransaction, LedgerSession, PartialSignature,
    PreparedTransaction, Wallet,
};
use common::{ClassicAddress, LedgerError, SignerList, SubmissionResult, TxTemplate};

/// Supplies signer wallets by account.
#[async_trait]
pub trait SignerSource: Send + Sync {
    /// The wallet for `account`, or `None` when that signer is unavailable.
    async fn signer(&self, account: &ClassicAddress) -> Option<Wallet>;
}

/// Signers held in memory.
#[derive(Debug, Default, Clone)]
pub struct StaticSigners {
    wallets: HashMap<ClassicAddress, Wallet>,
}

impl StaticSigners {
    pub fn new(wallets: impl IntoIterator<Item = Wallet>) -> Self {
        Self {
            wallets: wallets
                .into_iter()
                .map(|w| (w.address().clone(), w))
                .collect(),
        }
    }
}

#[async_trait]
impl SignerSource for StaticSigners {
    async fn signer(&self, account: &ClassicAddress) -> Option<Wallet> {
        self.wallets.get(account).cloned()
    }
}

/// Signers that answered, with their weights in the active list.
#[derive(Debug)]
pub struct AvailableSigners {
    signers: Vec<(Wallet, u16)>,
    weight: u32,
    quorum: u32,
}

impl AvailableSigners {
    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

/// Partial signatures over one prepared transaction.
#[derive(Debug)]
pub struct SignatureSet {
    prepared: PreparedTransaction,
    partials: Vec<PartialSignature>,
    weight: u32,
    quorum: u32,
}

impl SignatureSet {
    pub fn prepared(&self) -> &PreparedTransaction {
        &self.prepared
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Combine into one submittable transaction. Refuses sets below quorum.
    pub fn combine(self) -> Result<CombinedTransaction, LedgerError> {
        if self.weight < self.quorum {
            return Err(LedgerError::InsufficientSignatures {
                collected: self.weight,
                quorum: self.quorum,
            });
        }
        combine(&self.prepared, self.partials)
    }
}

/// Look up every signer in `active` and check that the reachable ones meet
/// its quorum.
pub async fn resolve_signers(
    active: &SignerList,
    source: &dyn SignerSource,
) -> Result<AvailableSigners, LedgerError> {
    let lookups = active
        .entries
        .iter()
        .map(|entry| async move { (entry, source.signer(&entry.account).await) });
    let answers = join_all(lookups).await;

    let mut signers = Vec::new();
    let mut weight = 0u32;
    for (entry, wallet) in answers {
        match wallet {
            Some(wallet) if wallet.address() == &entry.account => {
                weight += entry.signer_weight as u32;
                signers.push((wallet, entry.signer_weight));
            }
            Some(wallet) => {
                return Err(LedgerError::InvalidSignerList(format!(
                    "source returned {} for signer {}",
                    wallet.address(),
                    entry.account
                )));
            }
            None => {
                tracing::warn!(signer = %entry.account, "Signer unavailable");
            }
        }
    }

    if weight < active.quorum {
        tracing::warn!(
            collected = weight,
            quorum = active.quorum,
            "Not enough signers available, nothing submitted"
        );
        return Err(LedgerError::InsufficientSignatures {
            collected: weight,
            quorum: active.quorum,
        });
    }

    Ok(AvailableSigners {
        signers,
        weight,
        quorum: active.quorum,
    })
}

/// Collect one partial signature per available signer over `prepared`.
///
/// Signing is local; only the signer lookups in [`resolve_signers`] wait on
/// anything.
pub fn collect_signatures(
    prepared: PreparedTransaction,
    signers: &AvailableSigners,
) -> Result<SignatureSet, LedgerError> {
    let partials = signers
        .signers
        .iter()
        .map(|(wallet, _)| sign_partial(wallet, &prepared))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SignatureSet {
        prepared,
        partials,
        weight: signers.weight,
        quorum: signers.quorum,
    })
}

/// Submit `template` authorized by a quorum of the source account's signers.
///
/// A rejection is returned as-is; retrying means preparing a new transaction.
pub async fn submit_multisigned(
    session: &mut LedgerSession,
    template: TxTemplate,
    source: &dyn SignerSource,
) -> Result<SubmissionResult, LedgerError> {
    let account = template.account().clone();
    let active = session.signer_list(&account).await?.ok_or_else(|| {
        LedgerError::InvalidSignerList(format!("no signer list is active on {}", account))
    })?;

    let available = resolve_signers(&active, source).await?;
    let slots = available.len() as u32;

    let prepared = session.prepare(template, slots).await?;
    let set = collect_signatures(prepared, &available)?;
    let combined = set.combine()?;

    tracing::info!(
        account = %account,
        sequence = combined.sequence(),
        weight = available.weight(),
        quorum = active.quorum,
        "Collected quorum of signatures"
    );

    session.submit_multisigned(combined).await
}

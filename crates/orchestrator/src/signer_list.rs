//! Signer-List Configurator.
//!
//! Installing a signer list permanently changes how the owner's transactions
//! are authorized, so the list is validated before anything is submitted.

use chains::xrpl::{LedgerSession, Wallet};
use common::{LedgerError, SignerList, StepOutcome, SubmissionResult, TxTemplate};

use crate::payment::submit_single_signed;

/// Install `list` on `owner`, signed with the owner's own key.
pub async fn configure_signer_list(
    session: &mut LedgerSession,
    owner: &Wallet,
    list: &SignerList,
) -> Result<SubmissionResult, LedgerError> {
    list.validate(owner.address())?;

    tracing::info!(
        owner = %owner.address(),
        quorum = list.quorum,
        signers = list.entries.len(),
        "Configuring signer list"
    );

    let template = TxTemplate::signer_list_set(owner.address().clone(), list);
    submit_single_signed(session, owner, template).await
}

/// Install `list` unless the same list is already active.
pub async fn ensure_signer_list(
    session: &mut LedgerSession,
    owner: &Wallet,
    list: &SignerList,
) -> Result<StepOutcome, LedgerError> {
    list.validate(owner.address())?;

    if let Some(active) = session.signer_list(owner.address()).await? {
        if active.same_as(list) {
            tracing::debug!(owner = %owner.address(), "Signer list already active");
            return Ok(StepOutcome::Unchanged);
        }
    }

    let result = configure_signer_list(session, owner, list).await?;
    Ok(StepOutcome::Submitted { result })
}

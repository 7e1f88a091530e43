//! Single-signer submission.

use chains::xrpl::{sign_standalone, LedgerSession, Wallet};
use common::{Amount, ClassicAddress, LedgerError, SubmissionResult, TxTemplate};

/// Prepare, sign with `wallet` alone, submit and await validation.
pub async fn submit_single_signed(
    session: &mut LedgerSession,
    wallet: &Wallet,
    template: TxTemplate,
) -> Result<SubmissionResult, LedgerError> {
    let prepared = session.prepare(template, 0).await?;
    let signed = sign_standalone(wallet, &prepared)?;
    session.submit(signed).await
}

/// A payment from `wallet` authorized by its own key.
pub async fn pay(
    session: &mut LedgerSession,
    wallet: &Wallet,
    destination: &ClassicAddress,
    amount: impl Into<Amount>,
) -> Result<SubmissionResult, LedgerError> {
    let template = TxTemplate::payment(wallet.address().clone(), destination.clone(), amount);
    let result = submit_single_signed(session, wallet, template).await?;
    tracing::info!(
        from = %wallet.address(),
        to = %destination,
        hash = %result.hash,
        "Payment validated"
    );
    Ok(result)
}

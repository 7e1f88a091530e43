//! Settlement/Swap step: an immediate-or-cancel offer after the payment.

use chains::xrpl::{LedgerSession, Wallet};
use common::{
    Drops, IssuedAmount, LedgerError, SubmissionResult, SwapOutcome, SwapReport, TxTemplate,
    TEC_KILLED,
};

use crate::payment::submit_single_signed;

/// Offer `sell` drops for `buy`, filling immediately or not at all.
///
/// An empty order book is an expected outcome and comes back as
/// `SwapOutcome::NoLiquidity`, not as an error.
pub async fn swap(
    session: &mut LedgerSession,
    wallet: &Wallet,
    sell: Drops,
    buy: IssuedAmount,
) -> Result<SwapReport, LedgerError> {
    tracing::info!(
        account = %wallet.address(),
        sell_drops = %sell,
        buy_value = %buy.value,
        buy_currency = %buy.currency.display_name(),
        "Submitting immediate-or-cancel offer"
    );

    let template = TxTemplate::immediate_offer(wallet.address().clone(), sell, buy);
    match submit_single_signed(session, wallet, template).await {
        Ok(result) => Ok(SwapReport {
            outcome: SwapOutcome::Filled,
            result,
        }),
        Err(LedgerError::SubmitRejected {
            code,
            hash: Some(hash),
            ledger_index: Some(ledger_index),
        }) if code == TEC_KILLED => {
            tracing::info!(hash = %hash, "Offer killed, no liquidity");
            Ok(SwapReport {
                outcome: SwapOutcome::NoLiquidity,
                result: SubmissionResult {
                    hash,
                    ledger_index,
                    result_code: code,
                },
            })
        }
        Err(e) => Err(e),
    }
}

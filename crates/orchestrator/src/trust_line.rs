//! Trust-Line Setup.
//!
//! A trust line must be validated before the asset can be paid to the
//! holder, so callers await these functions before preparing the payment.

use std::cmp::Ordering;

use chains::xrpl::{LedgerSession, TrustLine, Wallet};
use common::{
    Asset, CurrencyCode, IssuedAmount, IssuedValue, LedgerError, StepOutcome, SubmissionResult,
    TxTemplate,
};

use crate::payment::submit_single_signed;

/// Submit a TrustSet from `holder` for `asset` up to `limit`.
///
/// Always performs the full round trip, even when the line already exists.
pub async fn setup_trust_line(
    session: &mut LedgerSession,
    holder: &Wallet,
    asset: &Asset,
    limit: &IssuedValue,
) -> Result<SubmissionResult, LedgerError> {
    if holder.address() == &asset.issuer {
        return Err(LedgerError::InvalidAddress(format!(
            "{} cannot trust its own issuance",
            asset.issuer
        )));
    }

    tracing::info!(
        holder = %holder.address(),
        currency = %asset.currency.display_name(),
        issuer = %asset.issuer,
        limit = %limit,
        "Setting up trust line"
    );

    let template = TxTemplate::trust_set(
        holder.address().clone(),
        IssuedAmount::new(asset, limit.clone()),
    );
    submit_single_signed(session, holder, template).await
}

/// Set up the trust line only when no line with at least `limit` exists.
pub async fn ensure_trust_line(
    session: &mut LedgerSession,
    holder: &Wallet,
    asset: &Asset,
    limit: &IssuedValue,
) -> Result<StepOutcome, LedgerError> {
    let lines = session.trust_lines(holder.address(), &asset.issuer).await?;

    if lines.iter().any(|line| satisfies(line, asset, limit)) {
        tracing::debug!(
            holder = %holder.address(),
            currency = %asset.currency.display_name(),
            "Trust line already in place"
        );
        return Ok(StepOutcome::Unchanged);
    }

    let result = setup_trust_line(session, holder, asset, limit).await?;
    Ok(StepOutcome::Submitted { result })
}

fn satisfies(line: &TrustLine, asset: &Asset, limit: &IssuedValue) -> bool {
    if line.account != asset.issuer.as_str() {
        return false;
    }
    let same_currency = CurrencyCode::parse(&line.currency)
        .map(|c| c == asset.currency)
        .unwrap_or(false);
    if !same_currency {
        return false;
    }
    match IssuedValue::parse(&line.limit) {
        Ok(existing) => existing.compare(limit) != Ordering::Less,
        Err(_) => false,
    }
}

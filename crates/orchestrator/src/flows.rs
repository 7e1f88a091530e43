//! The two request flows: fund escrow and multisig payment.
//!
//! Each flow validates its inputs, opens its own ledger session, runs its
//! steps strictly in order, and disconnects on every exit path.

use std::sync::Arc;

use chains::xrpl::{LedgerGateway, LedgerSession};
use common::{
    CurrencyCode, FundEscrowRequest, FundEscrowResponse, IssuedAmount, IssuedValue, LedgerError,
    MultisigPaymentResponse, SignerEntry, SignerList, TxTemplate,
};

use crate::config::{FlowConfig, RoleWallets};
use crate::multisig::{submit_multisigned, SignerSource, StaticSigners};
use crate::payment::pay;
use crate::settlement::swap;
use crate::signer_list::ensure_signer_list;
use crate::trust_line::ensure_trust_line;

/// Weight of each configured co-signer.
const SIGNER_WEIGHT: u16 = 1;

/// Escrow and multisig payment flows over one ledger network.
pub struct PaymentFlows {
    gateway: LedgerGateway,
    config: FlowConfig,
    wallets: RoleWallets,
    signers: Arc<dyn SignerSource>,
}

impl PaymentFlows {
    /// Derive the role wallets up front so a bad seed fails before any
    /// request is served.
    pub fn new(gateway: LedgerGateway, config: FlowConfig) -> Result<Self, LedgerError> {
        let wallets = config.wallets()?;
        let signers = Arc::new(StaticSigners::new([
            wallets.signer.clone(),
            wallets.issuer.clone(),
        ]));
        Ok(Self {
            gateway,
            config,
            wallets,
            signers,
        })
    }

    /// Replace where co-signer wallets come from.
    pub fn with_signer_source(mut self, signers: Arc<dyn SignerSource>) -> Self {
        self.signers = signers;
        self
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn wallets(&self) -> &RoleWallets {
        &self.wallets
    }

    /// The signer list installed on the vault: the signer and issuer wallets,
    /// one weight each, under the configured quorum.
    pub fn vault_signer_list(&self) -> SignerList {
        SignerList::new(
            self.config.signer_quorum,
            vec![
                SignerEntry {
                    account: self.wallets.signer.address().clone(),
                    signer_weight: SIGNER_WEIGHT,
                },
                SignerEntry {
                    account: self.wallets.issuer.address().clone(),
                    signer_weight: SIGNER_WEIGHT,
                },
            ],
        )
    }

    // ------------------------------------------------------------------------
    // Fund escrow
    // ------------------------------------------------------------------------

    /// Make sure the vault trusts the asset, then pay it `amount` from the
    /// issuer wallet.
    pub async fn fund_escrow(
        &self,
        request: &FundEscrowRequest,
    ) -> Result<FundEscrowResponse, LedgerError> {
        let amount = IssuedValue::parse(&request.amount)?;
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount(
                "escrow amount must be positive".to_string(),
            ));
        }
        let currency = CurrencyCode::parse(&request.currency)?;
        if currency != self.config.asset.currency {
            return Err(LedgerError::InvalidCurrency(format!(
                "{} is not the configured escrow currency {}",
                request.currency,
                self.config.asset.currency.display_name()
            )));
        }

        tracing::info!(
            amount = %amount,
            currency = %currency.display_name(),
            vault = %self.wallets.vault.address(),
            "Funding escrow"
        );

        let mut session = self.gateway.connect().await?;
        let outcome = self.fund_escrow_steps(&mut session, amount).await;
        release(session).await;

        match &outcome {
            Ok(response) => tracing::info!(hash = %response.result.hash, "Escrow funded"),
            Err(e) => tracing::error!(error = %e, kind = e.kind(), "Escrow funding failed"),
        }
        outcome
    }

    async fn fund_escrow_steps(
        &self,
        session: &mut LedgerSession,
        amount: IssuedValue,
    ) -> Result<FundEscrowResponse, LedgerError> {
        let asset = &self.config.asset;
        let vault = &self.wallets.vault;

        let trust_line = ensure_trust_line(session, vault, asset, &self.config.trust_limit).await?;

        let result = pay(
            session,
            &self.wallets.issuer,
            vault.address(),
            IssuedAmount::new(asset, amount),
        )
        .await?;

        Ok(FundEscrowResponse {
            success: result.is_success(),
            result,
            trust_line,
        })
    }

    // ------------------------------------------------------------------------
    // Multisig payment
    // ------------------------------------------------------------------------

    /// Install the vault's signer list if needed, pay the configured
    /// destination from the vault under that list, then run the optional swap.
    pub async fn multisig_payment(&self) -> Result<MultisigPaymentResponse, LedgerError> {
        let list = self.vault_signer_list();
        list.validate(self.wallets.vault.address())?;

        tracing::info!(
            vault = %self.wallets.vault.address(),
            destination = %self.config.payment_destination,
            drops = %self.config.multisig_amount,
            "Initiating multisig payment"
        );

        let mut session = self.gateway.connect().await?;
        let outcome = self.multisig_payment_steps(&mut session, &list).await;
        release(session).await;

        match &outcome {
            Ok(response) => {
                tracing::info!(hash = %response.payment.hash, "Multisig payment completed")
            }
            Err(e) => tracing::error!(error = %e, kind = e.kind(), "Multisig payment failed"),
        }
        outcome
    }

    async fn multisig_payment_steps(
        &self,
        session: &mut LedgerSession,
        list: &SignerList,
    ) -> Result<MultisigPaymentResponse, LedgerError> {
        let vault = &self.wallets.vault;

        let signer_list = ensure_signer_list(session, vault, list).await?;

        let template = TxTemplate::payment(
            vault.address().clone(),
            self.config.payment_destination.clone(),
            self.config.multisig_amount,
        );
        let payment = submit_multisigned(session, template, self.signers.as_ref()).await?;

        let swap = match &self.config.swap {
            Some(swap_config) => Some(
                swap(
                    session,
                    vault,
                    swap_config.taker_gets,
                    IssuedAmount::new(&self.config.asset, swap_config.taker_pays.clone()),
                )
                .await?,
            ),
            None => None,
        };

        Ok(MultisigPaymentResponse {
            signer_list,
            payment,
            swap,
        })
    }
}

/// Disconnect, logging rather than masking the flow's own outcome.
async fn release(session: LedgerSession) {
    if let Err(e) = session.disconnect().await {
        tracing::warn!(error = %e, "Failed to release ledger session");
    }
}

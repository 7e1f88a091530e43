//! Ledger Gateway: one session per payment flow.
//!
//! A `LedgerSession` owns its own RPC connection. It autofills templates,
//! submits signed blobs, and waits for validation. It remembers every
//! sequence it handed out and every `(account, sequence)` it submitted, so a
//! session never prepares two transactions with the same sequence and never
//! submits the same one twice.
//!
//! Across sessions, an account's sequence is guarded by a per-account lock
//! owned by the gateway. A session takes the lock when it first prepares for
//! the account and gives it back once every transaction it prepared for that
//! account has been submitted and reached an outcome, or when the session
//! ends. Two flows acting for one account therefore never read the same
//! sequence.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

use common::{
    ClassicAddress, Drops, LedgerError, SignerList, SubmissionResult, TxTemplate, TES_SUCCESS,
};

use super::prepared::PreparedTransaction;
use super::rpc::{FeeInfo, LedgerRpc, RpcConnector, RpcError, SubmitResponse, TrustLine};
use super::signature::{CombinedTransaction, StandaloneSignature};

/// Result code used when the transaction's last ledger passed unvalidated.
pub const TEF_MAX_LEDGER: &str = "tefMAX_LEDGER";

/// Timing and fee limits of a session.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub connect_timeout: Duration,
    pub finality_timeout: Duration,
    pub poll_interval: Duration,
    /// Ledgers added to the current index for `LastLedgerSequence`.
    pub ledger_offset: u32,
    pub max_fee: Drops,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            finality_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(1000),
            ledger_offset: 20,
            max_fee: Drops::new(2_000_000).unwrap_or_default(),
        }
    }
}

/// One lock per source account, shared by every session of a gateway.
#[derive(Clone, Default)]
pub struct AccountLocks {
    locks: Arc<Mutex<HashMap<ClassicAddress, Arc<Mutex<()>>>>>,
}

impl AccountLocks {
    async fn lock_for(&self, account: &ClassicAddress) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(account.clone()).or_default().clone()
    }
}

/// Opens sessions against one ledger network.
///
/// Clones share their account locks; keep one gateway per process.
#[derive(Clone)]
pub struct LedgerGateway {
    connector: Arc<dyn RpcConnector>,
    options: GatewayOptions,
    locks: AccountLocks,
}

impl LedgerGateway {
    pub fn new(connector: Arc<dyn RpcConnector>, options: GatewayOptions) -> Self {
        Self {
            connector,
            options,
            locks: AccountLocks::default(),
        }
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    /// Open a session and check that the node answers within `connect_timeout`.
    pub async fn connect(&self) -> Result<LedgerSession, LedgerError> {
        let timeout = self.options.connect_timeout;
        let attempt = async {
            let rpc = self.connector.open().await?;
            let info = rpc.server_info().await?;
            Ok::<_, RpcError>((rpc, info))
        };

        let (rpc, info) = match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => return Err(LedgerError::Connection(e.to_string())),
            Err(_) => {
                return Err(LedgerError::Connection(format!(
                    "no response within {:?}",
                    timeout
                )))
            }
        };

        tracing::info!(
            build_version = info.build_version.as_deref().unwrap_or("unknown"),
            validated_ledger = info.validated_ledger,
            "Connected to ledger node"
        );

        Ok(LedgerSession {
            rpc,
            options: self.options.clone(),
            locks: self.locks.clone(),
            held: HashMap::new(),
            outstanding: HashMap::new(),
            next_sequence: HashMap::new(),
            submitted: HashSet::new(),
            closed: false,
        })
    }
}

/// An open connection owned by exactly one flow.
///
/// Not `Clone`: submission requires `&mut self`, which serializes submits.
pub struct LedgerSession {
    rpc: Box<dyn LedgerRpc>,
    options: GatewayOptions,
    locks: AccountLocks,
    /// Account locks this session holds.
    held: HashMap<ClassicAddress, OwnedMutexGuard<()>>,
    /// Sequences prepared but not yet through submission, per account.
    outstanding: HashMap<ClassicAddress, HashSet<u32>>,
    /// Lowest sequence not yet handed out, per account.
    next_sequence: HashMap<ClassicAddress, u32>,
    submitted: HashSet<(ClassicAddress, u32)>,
    closed: bool,
}

impl LedgerSession {
    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Trust lines of `account` towards `issuer`.
    pub async fn trust_lines(
        &self,
        account: &ClassicAddress,
        issuer: &ClassicAddress,
    ) -> Result<Vec<TrustLine>, LedgerError> {
        self.rpc
            .account_lines(account, Some(issuer))
            .await
            .map_err(|e| match e {
                RpcError::Transport(msg) => LedgerError::Connection(msg),
                other => LedgerError::Prepare(format!("account_lines for {}: {}", account, other)),
            })
    }

    /// The signer list currently active on `account`.
    pub async fn signer_list(
        &self,
        account: &ClassicAddress,
    ) -> Result<Option<SignerList>, LedgerError> {
        self.rpc
            .account_signer_list(account)
            .await
            .map_err(|e| match e {
                RpcError::Transport(msg) => LedgerError::Connection(msg),
                other => LedgerError::Prepare(format!("signer list of {}: {}", account, other)),
            })
    }

    // ------------------------------------------------------------------------
    // Autofill
    // ------------------------------------------------------------------------

    /// Fill in `Sequence`, `Fee` and `LastLedgerSequence`.
    ///
    /// `signer_slots` is zero for single-signed transactions and the number of
    /// expected signers for multisigned ones; the fee scales with it.
    ///
    /// Waits up to `finality_timeout` for another session to finish with the
    /// account before reading its sequence.
    pub async fn prepare(
        &mut self,
        template: TxTemplate,
        signer_slots: u32,
    ) -> Result<PreparedTransaction, LedgerError> {
        let account = template.account().clone();
        self.acquire(&account).await?;

        match self.autofill(template, signer_slots).await {
            Ok(prepared) => {
                self.outstanding
                    .entry(account)
                    .or_default()
                    .insert(prepared.sequence());
                Ok(prepared)
            }
            Err(e) => {
                self.release_if_idle(&account);
                Err(e)
            }
        }
    }

    async fn autofill(
        &mut self,
        template: TxTemplate,
        signer_slots: u32,
    ) -> Result<PreparedTransaction, LedgerError> {
        let account = template.account().clone();

        let info = self.rpc.account_info(&account).await.map_err(|e| match e {
            RpcError::Transport(msg) => LedgerError::Connection(msg),
            e if e.is_not_found() => {
                LedgerError::Prepare(format!("account {} is not funded", account))
            }
            other => LedgerError::Prepare(format!("account_info for {}: {}", account, other)),
        })?;

        let fee_info = self.rpc.fee().await.map_err(|e| match e {
            RpcError::Transport(msg) => LedgerError::Connection(msg),
            other => LedgerError::Prepare(format!("fee: {}", other)),
        })?;

        let sequence = match self.next_sequence.get(&account) {
            Some(&next) => next.max(info.sequence),
            None => info.sequence,
        };

        let fee = self.fee_for(&fee_info, signer_slots)?;
        let last_ledger_sequence = fee_info
            .ledger_current_index
            .saturating_add(self.options.ledger_offset);

        let prepared =
            PreparedTransaction::new(template, sequence, fee, last_ledger_sequence, signer_slots)?;
        self.next_sequence.insert(account.clone(), sequence.saturating_add(1));

        tracing::debug!(
            account = %account,
            tx_type = prepared.template().transaction_type(),
            sequence,
            fee = %fee,
            last_ledger_sequence,
            "Prepared transaction"
        );
        Ok(prepared)
    }

    fn fee_for(&self, fee_info: &FeeInfo, signer_slots: u32) -> Result<Drops, LedgerError> {
        let per_signature = fee_info.open_ledger_fee.max(fee_info.base_fee);
        let minimum = fee_info.base_fee.get().saturating_mul(1 + signer_slots as u64);
        let wanted = per_signature.get().saturating_mul(1 + signer_slots as u64);

        let cap = self.options.max_fee.get();
        if minimum > cap {
            return Err(LedgerError::Prepare(format!(
                "required fee {} drops exceeds the cap of {} drops",
                minimum, cap
            )));
        }
        Drops::new(wanted.min(cap))
    }

    // ------------------------------------------------------------------------
    // Account locks
    // ------------------------------------------------------------------------

    async fn acquire(&mut self, account: &ClassicAddress) -> Result<(), LedgerError> {
        if self.held.contains_key(account) {
            return Ok(());
        }

        let lock = self.locks.lock_for(account).await;
        let wait = self.options.finality_timeout;
        let guard = match lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!(account = %account, "Waiting for another flow on this account");
                tokio::time::timeout(wait, lock.lock_owned())
                    .await
                    .map_err(|_| {
                        LedgerError::Prepare(format!(
                            "{} stayed busy with another flow for {:?}",
                            account, wait
                        ))
                    })?
            }
        };
        self.held.insert(account.clone(), guard);
        Ok(())
    }

    /// Give the account back once nothing prepared for it is pending.
    fn release_if_idle(&mut self, account: &ClassicAddress) {
        let idle = self
            .outstanding
            .get(account)
            .map_or(true, |pending| pending.is_empty());
        if idle && self.held.remove(account).is_some() {
            tracing::trace!(account = %account, "Released account lock");
        }
    }

    fn finish(&mut self, account: &ClassicAddress, sequence: u32) {
        if let Some(pending) = self.outstanding.get_mut(account) {
            pending.remove(&sequence);
        }
        self.release_if_idle(account);
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    /// Submit a single-signed transaction and wait for validation.
    pub async fn submit(
        &mut self,
        signed: StandaloneSignature,
    ) -> Result<SubmissionResult, LedgerError> {
        self.claim(&signed.account, signed.sequence)?;

        tracing::info!(
            account = %signed.account,
            sequence = signed.sequence,
            hash = %signed.hash,
            "Submitting transaction"
        );

        let result = self
            .send(&signed.tx_blob, &signed.hash, signed.last_ledger_sequence)
            .await;
        self.finish(&signed.account, signed.sequence);
        result
    }

    /// Submit a multisigned transaction and wait for validation.
    pub async fn submit_multisigned(
        &mut self,
        combined: CombinedTransaction,
    ) -> Result<SubmissionResult, LedgerError> {
        self.claim(combined.account(), combined.sequence())?;

        tracing::info!(
            account = %combined.account(),
            sequence = combined.sequence(),
            signers = combined.signers().len(),
            hash = %combined.hash(),
            "Submitting multisigned transaction"
        );

        let result = self
            .send(
                combined.tx_blob(),
                combined.hash(),
                combined.last_ledger_sequence(),
            )
            .await;
        self.finish(combined.account(), combined.sequence());
        result
    }

    /// Hand `tx_blob` to the node and follow `hash` to an outcome.
    async fn send(
        &self,
        tx_blob: &str,
        hash: &str,
        last_ledger_sequence: u32,
    ) -> Result<SubmissionResult, LedgerError> {
        let response = self.rpc.submit(tx_blob).await.map_err(|e| match e {
            // The blob may have reached the node; only a status query can tell.
            RpcError::Transport(msg) => {
                tracing::warn!(hash = %hash, error = %msg, "Submit outcome unknown");
                LedgerError::SubmitTimeout {
                    hash: hash.to_string(),
                }
            }
            other => submit_error(other),
        })?;

        if !response.hash.eq_ignore_ascii_case(hash) {
            tracing::warn!(
                expected = %hash,
                reported = %response.hash,
                "Node reported a different transaction hash"
            );
        }
        self.await_finality(hash, response, last_ledger_sequence)
            .await
    }

    /// Record `(account, sequence)` as submitted, refusing repeats.
    fn claim(&mut self, account: &ClassicAddress, sequence: u32) -> Result<(), LedgerError> {
        if !self.submitted.insert((account.clone(), sequence)) {
            tracing::warn!(account = %account, sequence, "Refusing duplicate submission");
            return Err(LedgerError::DuplicateSubmission {
                account: account.to_string(),
                sequence,
            });
        }
        Ok(())
    }

    async fn await_finality(
        &self,
        hash: &str,
        response: SubmitResponse,
        last_ledger_sequence: u32,
    ) -> Result<SubmissionResult, LedgerError> {
        let hash = hash.to_string();
        let preliminary = response.engine_result;

        if is_final_preliminary(&preliminary) {
            tracing::warn!(
                hash = %hash,
                code = %preliminary,
                message = response.engine_result_message.as_deref().unwrap_or(""),
                "Transaction rejected before consensus"
            );
            return Err(LedgerError::SubmitRejected {
                code: preliminary,
                hash: Some(hash),
                ledger_index: None,
            });
        }
        tracing::debug!(hash = %hash, preliminary = %preliminary, "Awaiting validation");

        let deadline = Instant::now() + self.options.finality_timeout;
        loop {
            if let Some(result) = self.validated_outcome(&hash).await? {
                return result;
            }

            // Past its last ledger the transaction can no longer be included.
            if let Ok(info) = self.rpc.server_info().await {
                if info.validated_ledger.unwrap_or(0) > last_ledger_sequence {
                    if let Some(result) = self.validated_outcome(&hash).await? {
                        return result;
                    }
                    tracing::warn!(hash = %hash, last_ledger_sequence, "Transaction expired");
                    return Err(LedgerError::SubmitRejected {
                        code: TEF_MAX_LEDGER.to_string(),
                        hash: Some(hash),
                        ledger_index: None,
                    });
                }
            }

            if Instant::now() >= deadline {
                tracing::warn!(hash = %hash, "Timed out waiting for validation");
                return Err(LedgerError::SubmitTimeout { hash });
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// `Some` once the transaction is in a validated ledger.
    async fn validated_outcome(
        &self,
        hash: &str,
    ) -> Result<Option<Result<SubmissionResult, LedgerError>>, LedgerError> {
        let status = match self.rpc.tx(hash).await {
            Ok(status) => status,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                tracing::debug!(hash = %hash, error = %e, "Status query failed");
                return Ok(None);
            }
        };
        if !status.validated {
            return Ok(None);
        }

        let code = status
            .result_code
            .ok_or_else(|| LedgerError::Serialization("validated tx without result".to_string()))?;
        let ledger_index = status.ledger_index.unwrap_or_default();

        if code == TES_SUCCESS {
            tracing::info!(hash = %hash, ledger_index, "Transaction validated");
            Ok(Some(Ok(SubmissionResult {
                hash: hash.to_string(),
                ledger_index,
                result_code: code,
            })))
        } else {
            tracing::warn!(hash = %hash, code = %code, ledger_index, "Transaction failed in consensus");
            Ok(Some(Err(LedgerError::SubmitRejected {
                code,
                hash: Some(hash.to_string()),
                ledger_index: Some(ledger_index),
            })))
        }
    }

    // ------------------------------------------------------------------------
    // Release
    // ------------------------------------------------------------------------

    /// Release the connection and any account locks. Consumes the session.
    pub async fn disconnect(mut self) -> Result<(), LedgerError> {
        self.closed = true;
        self.held.clear();
        self.rpc
            .close()
            .await
            .map_err(|e| LedgerError::Connection(format!("disconnect failed: {}", e)))?;
        tracing::debug!("Disconnected from ledger node");
        Ok(())
    }
}

impl Drop for LedgerSession {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("Ledger session dropped without disconnect");
        }
    }
}

/// `tem`, `tef` and `tel` results never reach a validated ledger.
fn is_final_preliminary(code: &str) -> bool {
    code.starts_with("tem") || code.starts_with("tef") || code.starts_with("tel")
}

fn submit_error(error: RpcError) -> LedgerError {
    match error {
        RpcError::Transport(msg) => LedgerError::Connection(msg),
        RpcError::Node { error, .. } => LedgerError::rejected(error),
        RpcError::Malformed(msg) => LedgerError::Serialization(msg),
    }
}

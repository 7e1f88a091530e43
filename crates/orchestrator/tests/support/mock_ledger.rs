//! In-memory ledger for flow tests.
//!
//! Applies transactions the way the ledger would for the subset the flows
//! use: sequences, fees, trust lines, issued balances, signer lists with
//! quorum checks, and immediate-or-cancel offers. Submissions arrive as
//! signed binary blobs; they are decoded and every signature is checked
//! before anything is applied. Every accepted submission validates in the
//! next ledger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use chains::xrpl::{
    account_id, codec, verify_signature, AccountInfo, FeeInfo, LedgerRpc, RpcConnector,
    RpcError, ServerInfo, SubmitResponse, TrustLine, TxStatus,
};
use common::{ClassicAddress, Drops, IssuedValue, SignerEntry, SignerList};

pub const BASE_FEE: u64 = 10;

#[derive(Debug, Clone)]
pub struct AccountState {
    pub sequence: u32,
    pub balance: u64,
}

#[derive(Debug, Clone)]
pub struct LineState {
    pub limit: String,
    /// Exact decimal string of the holder's balance.
    pub balance: String,
}

/// Key of a trust line: holder, issuer, 40-hex currency.
type LineKey = (String, String, String);

#[derive(Debug, Default)]
pub struct LedgerState {
    pub accounts: HashMap<String, AccountState>,
    pub lines: HashMap<LineKey, LineState>,
    pub signer_lists: HashMap<String, SignerList>,
    pub validated_ledger: u32,
    /// Whether an immediate-or-cancel offer finds a counterparty.
    pub order_book_liquidity: bool,
    pub unreachable: bool,
    /// Accepted submissions never validate.
    pub stall_validation: bool,
    /// Submissions are applied but the reply is lost.
    pub drop_submit_reply: bool,

    pub opens: u32,
    pub closes: u32,
    /// Every transaction that reached submission, in order.
    pub submitted: Vec<Value>,
    results: HashMap<String, TxStatus>,
}

#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        let state = LedgerState {
            validated_ledger: 1000,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn fund(&self, account: &ClassicAddress, drops: u64) {
        self.state.lock().unwrap().accounts.insert(
            account.to_string(),
            AccountState {
                sequence: 1,
                balance: drops,
            },
        );
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut LedgerState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn account(&self, account: &ClassicAddress) -> Option<AccountState> {
        self.with_state(|s| s.accounts.get(account.as_str()).cloned())
    }

    pub fn line(
        &self,
        holder: &ClassicAddress,
        issuer: &ClassicAddress,
        currency: &str,
    ) -> Option<LineState> {
        let key = (holder.to_string(), issuer.to_string(), currency.to_string());
        self.with_state(|s| s.lines.get(&key).cloned())
    }

    pub fn submitted_types(&self) -> Vec<String> {
        self.with_state(|s| {
            s.submitted
                .iter()
                .map(|tx| tx["TransactionType"].as_str().unwrap_or("").to_string())
                .collect()
        })
    }

    pub fn opens_and_closes(&self) -> (u32, u32) {
        self.with_state(|s| (s.opens, s.closes))
    }

    /// The validated outcome recorded under `hash`, if any.
    pub fn result(&self, hash: &str) -> Option<TxStatus> {
        self.with_state(|s| s.results.get(hash).cloned())
    }

    /// `(Account, Sequence)` of every submitted transaction.
    pub fn submitted_sequences(&self) -> Vec<(String, u64)> {
        self.with_state(|s| {
            s.submitted
                .iter()
                .map(|tx| {
                    (
                        tx["Account"].as_str().unwrap_or("").to_string(),
                        tx["Sequence"].as_u64().unwrap_or(0),
                    )
                })
                .collect()
        })
    }
}

fn hex_field(value: &Value) -> Option<Vec<u8>> {
    hex::decode(value.as_str()?).ok()
}

/// Whether `public_key` belongs to `account` and signed `data`.
fn signed_by(account: &Value, public_key: &Value, signature: &Value, data: &[u8]) -> bool {
    let (Some(public_key), Some(signature)) = (hex_field(public_key), hex_field(signature))
    else {
        return false;
    };
    let Some(account) = account.as_str().and_then(|a| ClassicAddress::parse(a).ok()) else {
        return false;
    };
    account_id(&public_key) == account.account_id()
        && verify_signature(&public_key, data, &signature)
}

/// Signature checks the ledger runs on a decoded transaction.
fn check_signatures(tx: &Value) -> Result<(), &'static str> {
    match tx.get("Signers") {
        None => {
            let data = codec::signing_data(tx).map_err(|_| "temMALFORMED")?;
            if signed_by(&tx["Account"], &tx["SigningPubKey"], &tx["TxnSignature"], &data) {
                Ok(())
            } else {
                Err("tefBAD_AUTH")
            }
        }
        Some(signers) => {
            let signers = signers.as_array().ok_or("temMALFORMED")?;
            let mut previous = None;
            for signer in signers {
                let signer = &signer["Signer"];
                let account = signer["Account"]
                    .as_str()
                    .and_then(|a| ClassicAddress::parse(a).ok())
                    .ok_or("temMALFORMED")?;
                let id = account.account_id();
                // Signers must be sorted by account ID with no repeats.
                if previous.is_some_and(|p| p >= id.0) {
                    return Err("temBAD_SIGNER");
                }
                previous = Some(id.0);
                let data = codec::multisigning_data(tx, &id).map_err(|_| "temMALFORMED")?;
                if !signed_by(
                    &signer["Account"],
                    &signer["SigningPubKey"],
                    &signer["TxnSignature"],
                    &data,
                ) {
                    return Err("tefBAD_SIGNATURE");
                }
            }
            Ok(())
        }
    }
}

/// Decimal arithmetic on issued values, exact up to 16 significant digits.
fn decimal_parts(value: &str) -> (i128, u32) {
    let (int_part, frac_part) = value.split_once('.').unwrap_or((value, ""));
    let digits = format!("{}{}", int_part, frac_part);
    (digits.parse().unwrap_or(0), frac_part.len() as u32)
}

fn plain(value: &str) -> String {
    // Expand exponents so the simple parser above can read them.
    match value.split_once(['e', 'E']) {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let (digits, scale) = decimal_parts(mantissa);
            let shift = exp - scale as i32;
            if shift >= 0 {
                (digits * 10i128.pow(shift as u32)).to_string()
            } else {
                format_scaled(digits, (-shift) as u32)
            }
        }
        None => value.to_string(),
    }
}

fn format_scaled(digits: i128, scale: u32) -> String {
    if scale == 0 {
        return digits.to_string();
    }
    let unit = 10i128.pow(scale);
    let frac = format!("{:0width$}", digits % unit, width = scale as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        (digits / unit).to_string()
    } else {
        format!("{}.{}", digits / unit, frac)
    }
}

fn add_decimal(a: &str, b: &str) -> String {
    let (a_digits, a_scale) = decimal_parts(&plain(a));
    let (b_digits, b_scale) = decimal_parts(&plain(b));
    let scale = a_scale.max(b_scale);
    let sum = a_digits * 10i128.pow(scale - a_scale) + b_digits * 10i128.pow(scale - b_scale);
    format_scaled(sum, scale)
}

fn exceeds(value: &str, limit: &str) -> bool {
    match (IssuedValue::parse(value), IssuedValue::parse(limit)) {
        (Ok(v), Ok(l)) => v.compare(&l) == std::cmp::Ordering::Greater,
        _ => true,
    }
}

impl LedgerState {
    /// Checks the ledger runs before a transaction can claim a sequence.
    fn preflight(&self, tx: &Value, multisigned: bool) -> Result<(), &'static str> {
        let account = tx["Account"].as_str().ok_or("temMALFORMED")?;
        let state = self.accounts.get(account).ok_or("terNO_ACCOUNT")?;

        let sequence = tx["Sequence"].as_u64().ok_or("temMALFORMED")? as u32;
        if sequence < state.sequence {
            return Err("tefPAST_SEQ");
        }
        if sequence > state.sequence {
            return Err("terPRE_SEQ");
        }
        let last_ledger = tx["LastLedgerSequence"].as_u64().unwrap_or(u64::MAX);
        if last_ledger <= self.validated_ledger as u64 {
            return Err("tefMAX_LEDGER");
        }

        let fee: u64 = tx["Fee"]
            .as_str()
            .and_then(|f| f.parse().ok())
            .ok_or("temBAD_FEE")?;

        if multisigned {
            if tx["SigningPubKey"] != "" {
                return Err("temINVALID");
            }
            let signers = tx["Signers"].as_array().ok_or("temMALFORMED")?;
            if fee < BASE_FEE * (1 + signers.len() as u64) {
                return Err("telINSUF_FEE_P");
            }
            let list = self
                .signer_lists
                .get(account)
                .ok_or("tefNOT_MULTI_SIGNING")?;
            let mut weight = 0u32;
            for signer in signers {
                let signer = &signer["Signer"];
                let signer_account = signer["Account"].as_str().ok_or("temMALFORMED")?;
                let entry = list
                    .entries
                    .iter()
                    .find(|e| e.account.as_str() == signer_account)
                    .ok_or("tefBAD_SIGNATURE")?;
                if signer["TxnSignature"] != signature_over(signer_account, tx).as_str() {
                    return Err("tefBAD_SIGNATURE");
                }
                weight += entry.signer_weight as u32;
            }
            if weight < list.quorum {
                return Err("tefBAD_QUORUM");
            }
        } else if fee < BASE_FEE {
            return Err("telINSUF_FEE_P");
        }

        if tx["TransactionType"] == "SignerListSet" {
            let entries = tx["SignerEntries"].as_array().ok_or("temMALFORMED")?;
            let mut total = 0u64;
            for wrapper in entries {
                let entry = &wrapper["SignerEntry"];
                if entry["Account"] == tx["Account"] {
                    return Err("temBAD_SIGNER");
                }
                total += entry["SignerWeight"].as_u64().unwrap_or(0);
            }
            let quorum = tx["SignerQuorum"].as_u64().unwrap_or(0);
            if quorum == 0 || quorum > total {
                return Err("temBAD_QUORUM");
            }
        }
        Ok(())
    }

    /// Apply a transaction that passed preflight; returns its result code.
    fn apply(&mut self, tx: &Value) -> String {
        let account = tx["Account"].as_str().unwrap_or_default().to_string();
        let fee: u64 = tx["Fee"].as_str().and_then(|f| f.parse().ok()).unwrap_or(0);
        if let Some(state) = self.accounts.get_mut(&account) {
            state.sequence += 1;
            state.balance = state.balance.saturating_sub(fee);
        }

        let code = match tx["TransactionType"].as_str().unwrap_or_default() {
            "Payment" => self.apply_payment(&account, tx),
            "TrustSet" => {
                let limit = &tx["LimitAmount"];
                let key = (
                    account.clone(),
                    limit["issuer"].as_str().unwrap_or_default().to_string(),
                    limit["currency"].as_str().unwrap_or_default().to_string(),
                );
                let new_limit = limit["value"].as_str().unwrap_or("0").to_string();
                self.lines
                    .entry(key)
                    .and_modify(|line| line.limit = new_limit.clone())
                    .or_insert(LineState {
                        limit: new_limit,
                        balance: "0".to_string(),
                    });
                "tesSUCCESS"
            }
            "SignerListSet" => {
                let entries = tx["SignerEntries"]
                    .as_array()
                    .map(|entries| {
                        entries
                            .iter()
                            .filter_map(|w| {
                                serde_json::from_value::<SignerEntry>(w["SignerEntry"].clone()).ok()
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let quorum = tx["SignerQuorum"].as_u64().unwrap_or(0) as u32;
                self.signer_lists
                    .insert(account.clone(), SignerList::new(quorum, entries));
                "tesSUCCESS"
            }
            "OfferCreate" => {
                if self.order_book_liquidity {
                    "tesSUCCESS"
                } else {
                    "tecKILLED"
                }
            }
            _ => "temUNKNOWN",
        };
        code.to_string()
    }

    fn apply_payment(&mut self, account: &str, tx: &Value) -> &'static str {
        let destination = tx["Destination"].as_str().unwrap_or_default().to_string();
        match &tx["Amount"] {
            Value::String(drops) => {
                let drops: u64 = drops.parse().unwrap_or(0);
                let sender = match self.accounts.get_mut(account) {
                    Some(sender) => sender,
                    None => return "terNO_ACCOUNT",
                };
                if sender.balance < drops {
                    return "tecUNFUNDED_PAYMENT";
                }
                sender.balance -= drops;
                self.accounts
                    .entry(destination)
                    .or_insert(AccountState {
                        sequence: 1,
                        balance: 0,
                    })
                    .balance += drops;
                "tesSUCCESS"
            }
            amount => {
                let issuer = amount["issuer"].as_str().unwrap_or_default();
                let value = amount["value"].as_str().unwrap_or("0");
                if issuer != account {
                    // Only direct issuance is modelled.
                    return "tecPATH_DRY";
                }
                let key = (
                    destination,
                    issuer.to_string(),
                    amount["currency"].as_str().unwrap_or_default().to_string(),
                );
                let line = match self.lines.get_mut(&key) {
                    Some(line) => line,
                    None => return "tecPATH_DRY",
                };
                let balance = add_decimal(&line.balance, value);
                if exceeds(&balance, &line.limit) {
                    return "tecPATH_PARTIAL";
                }
                line.balance = balance;
                "tesSUCCESS"
            }
        }
    }

    fn submit_blob(&mut self, tx_blob: &str) -> Result<SubmitResponse, RpcError> {
        let blob = hex::decode(tx_blob)
            .map_err(|_| RpcError::node("invalidTransaction", "Blob is not hex."))?;
        let tx = codec::decode(&blob)
            .map_err(|e| RpcError::node("invalidTransaction", e.to_string()))?;
        let hash = codec::transaction_hash(&blob);
        let multisigned = tx.get("Signers").is_some();
        self.submitted.push(tx.clone());

        let checked = check_signatures(&tx).and_then(|()| self.preflight(&tx, multisigned));
        let engine_result = match checked {
            Err(code) => code.to_string(),
            Ok(()) => {
                let code = self.apply(&tx);
                if !self.stall_validation {
                    self.validated_ledger += 1;
                    self.results.insert(
                        hash.clone(),
                        TxStatus {
                            hash: hash.clone(),
                            validated: true,
                            ledger_index: Some(self.validated_ledger),
                            result_code: Some(code.clone()),
                        },
                    );
                }
                code
            }
        };

        Ok(SubmitResponse {
            engine_result,
            engine_result_message: None,
            hash,
        })
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn server_info(&self) -> Result<ServerInfo, RpcError> {
        let state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(RpcError::Transport("connection refused".to_string()));
        }
        Ok(ServerInfo {
            build_version: Some("mock".to_string()),
            validated_ledger: Some(state.validated_ledger),
        })
    }

    async fn fee(&self) -> Result<FeeInfo, RpcError> {
        let state = self.state.lock().unwrap();
        Ok(FeeInfo {
            base_fee: Drops::new(BASE_FEE).unwrap(),
            open_ledger_fee: Drops::new(BASE_FEE).unwrap(),
            ledger_current_index: state.validated_ledger + 1,
        })
    }

    async fn account_info(&self, account: &ClassicAddress) -> Result<AccountInfo, RpcError> {
        // Give concurrent flows a chance to interleave.
        tokio::task::yield_now().await;
        let state = self.state.lock().unwrap();
        let info = state
            .accounts
            .get(account.as_str())
            .ok_or_else(|| RpcError::node("actNotFound", "Account not found."))?;
        Ok(AccountInfo {
            account: account.clone(),
            sequence: info.sequence,
            balance: Drops::new(info.balance).unwrap(),
        })
    }

    async fn account_lines(
        &self,
        account: &ClassicAddress,
        peer: Option<&ClassicAddress>,
    ) -> Result<Vec<TrustLine>, RpcError> {
        let state = self.state.lock().unwrap();
        if !state.accounts.contains_key(account.as_str()) {
            return Err(RpcError::node("actNotFound", "Account not found."));
        }
        Ok(state
            .lines
            .iter()
            .filter(|((holder, issuer, _), _)| {
                holder == account.as_str() && peer.map_or(true, |p| issuer == p.as_str())
            })
            .map(|((_, issuer, currency), line)| TrustLine {
                account: issuer.clone(),
                currency: currency.clone(),
                balance: line.balance.clone(),
                limit: line.limit.clone(),
            })
            .collect())
    }

    async fn account_signer_list(
        &self,
        account: &ClassicAddress,
    ) -> Result<Option<SignerList>, RpcError> {
        let state = self.state.lock().unwrap();
        Ok(state.signer_lists.get(account.as_str()).cloned())
    }

    async fn submit(&self, tx_blob: &str) -> Result<SubmitResponse, RpcError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let response = state.submit_blob(tx_blob)?;
        if state.drop_submit_reply {
            return Err(RpcError::Transport("connection reset".to_string()));
        }
        Ok(response)
    }

    async fn tx(&self, hash: &str) -> Result<TxStatus, RpcError> {
        let state = self.state.lock().unwrap();
        state
            .results
            .get(hash)
            .cloned()
            .ok_or_else(|| RpcError::node("txnNotFound", "Transaction not found."))
    }

    async fn close(&self) -> Result<(), RpcError> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[async_trait]
impl RpcConnector for MockLedger {
    async fn open(&self) -> Result<Box<dyn LedgerRpc>, RpcError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(RpcError::Transport("connection refused".to_string()));
        }
        state.opens += 1;
        Ok(Box::new(self.clone()))
    }
}

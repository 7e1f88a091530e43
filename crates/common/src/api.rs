//! Request and response bodies shared by the coordinator and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transaction::SubmissionResult;

/// `POST /escrow/fund` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundEscrowRequest {
    /// Decimal string, passed to the ledger verbatim.
    pub amount: String,
    pub currency: String,
}

/// Whether a setup step had to touch the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The ledger already had the requested state; nothing was submitted.
    Unchanged,
    Submitted { result: SubmissionResult },
}

impl StepOutcome {
    pub fn was_submitted(&self) -> bool {
        matches!(self, StepOutcome::Submitted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundEscrowResponse {
    pub success: bool,
    pub result: SubmissionResult,
    pub trust_line: StepOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapOutcome {
    /// The offer crossed and the remainder (if any) was cancelled.
    Filled,
    /// Nothing in the order book matched; the offer was killed.
    NoLiquidity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReport {
    pub outcome: SwapOutcome,
    pub result: SubmissionResult,
}

/// `POST /multisig/sign` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigPaymentResponse {
    pub signer_list: StepOutcome,
    pub payment: SubmissionResult,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub swap: Option<SwapReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

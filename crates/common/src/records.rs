//! Business records kept alongside ledger payments.
//!
//! The orchestration core never reads these; the coordinator persists them on
//! behalf of the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `POST /transaction/create` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub transaction_id: String,
    #[serde(default)]
    pub business_partner: Option<String>,
    pub product_name: String,
    pub quantity: String,
    pub price: String,
}

impl CreateTransactionRequest {
    /// Returns a message naming the first missing field.
    pub fn validate(&self) -> Result<(), String> {
        if self.transaction_id.trim().is_empty() {
            return Err("transaction_id must not be empty".to_string());
        }
        if self.product_name.trim().is_empty() {
            return Err("product_name must not be empty".to_string());
        }
        Ok(())
    }

    pub fn into_record(self) -> TransactionRecord {
        TransactionRecord {
            transaction_id: self.transaction_id,
            business_partner: self.business_partner,
            product_name: self.product_name,
            quantity: self.quantity,
            price: self.price,
            created_at: None,
        }
    }
}

/// A row of the `transactions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_partner: Option<String>,
    pub product_name: String,
    pub quantity: String,
    pub price: String,
    /// Assigned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

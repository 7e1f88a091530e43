//! Transaction record storage.
//!
//! Records go to a Supabase `transactions` table through its PostgREST API
//! when configured, and to process memory otherwise.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Serialize;
use tokio::sync::RwLock;

use common::TransactionRecord;
use orchestrator::config::SecretString;

const TABLE: &str = "transactions";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record store request failed: {0}")]
    Request(String),

    #[error("Record store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed record store response: {0}")]
    Decode(String),

    #[error("Transaction {0} already exists")]
    Duplicate(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store `record` and return it as stored.
    async fn insert(&self, record: TransactionRecord) -> Result<TransactionRecord, StoreError>;

    async fn list(&self) -> Result<Vec<TransactionRecord>, StoreError>;
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<TransactionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, mut record: TransactionRecord) -> Result<TransactionRecord, StoreError> {
        let mut records = self.records.write().await;
        if records
            .iter()
            .any(|r| r.transaction_id == record.transaction_id)
        {
            return Err(StoreError::Duplicate(record.transaction_id));
        }
        record.created_at = Some(Utc::now());
        records.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }
}

// ============================================================================
// Supabase
// ============================================================================

/// Columns written on insert. `business_partner` has no column in the table.
#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    transaction_id: &'a str,
    product_name: &'a str,
    quantity: &'a str,
    price: &'a str,
}

impl<'a> From<&'a TransactionRecord> for InsertRow<'a> {
    fn from(record: &'a TransactionRecord) -> Self {
        Self {
            transaction_id: &record.transaction_id,
            product_name: &record.product_name,
            quantity: &record.quantity,
            price: &record.price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: SecretString,
}

pub struct SupabaseRecordStore {
    client: reqwest::Client,
    endpoint: String,
    anon_key: SecretString,
}

impl SupabaseRecordStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| StoreError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", config.url.trim_end_matches('/'), TABLE),
            anon_key: config.anon_key.clone(),
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.anon_key.expose();
        builder
            .header("apikey", key)
            .bearer_auth(key)
    }

    async fn rows(response: reqwest::Response) -> Result<Vec<TransactionRecord>, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for SupabaseRecordStore {
    async fn insert(&self, record: TransactionRecord) -> Result<TransactionRecord, StoreError> {
        tracing::debug!(transaction_id = %record.transaction_id, "Inserting record");

        let response = self
            .request(self.client.post(&self.endpoint))
            .header("Prefer", "return=representation")
            .json(&[InsertRow::from(&record)])
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(StoreError::Duplicate(record.transaction_id));
        }

        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))
    }

    async fn list(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let response = self
            .request(self.client.get(&self.endpoint))
            .query(&[("select", "*")])
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Self::rows(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> TransactionRecord {
        TransactionRecord {
            transaction_id: id.to_string(),
            business_partner: None,
            product_name: "Copper".to_string(),
            quantity: "10".to_string(),
            price: "99.50".to_string(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_memory_store_insert_and_list() {
        let store = MemoryRecordStore::new();

        let stored = store.insert(record("TX-1")).await.unwrap();
        assert!(stored.created_at.is_some());
        store.insert(record("TX-2")).await.unwrap();

        let ids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.transaction_id)
            .collect();
        assert_eq!(ids, vec!["TX-1", "TX-2"]);
    }

    #[tokio::test]
    async fn test_memory_store_rejects_duplicate_id() {
        let store = MemoryRecordStore::new();
        store.insert(record("TX-1")).await.unwrap();
        assert!(matches!(
            store.insert(record("TX-1")).await,
            Err(StoreError::Duplicate(id)) if id == "TX-1"
        ));
    }

    #[test]
    fn test_insert_row_has_table_columns_only() {
        let mut partnered = record("TX-1");
        partnered.business_partner = Some("Acme".to_string());

        let row = serde_json::to_value(InsertRow::from(&partnered)).unwrap();
        assert_eq!(
            row,
            serde_json::json!({
                "transaction_id": "TX-1",
                "product_name": "Copper",
                "quantity": "10",
                "price": "99.50",
            })
        );
    }

    #[test]
    fn test_supabase_endpoint() {
        let store = SupabaseRecordStore::new(&SupabaseConfig {
            url: "https://project.supabase.co/".to_string(),
            anon_key: SecretString::new("anon".to_string()),
        })
        .unwrap();
        assert_eq!(
            store.endpoint,
            "https://project.supabase.co/rest/v1/transactions"
        );
    }
}

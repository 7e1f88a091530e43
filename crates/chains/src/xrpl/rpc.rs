//! JSON-RPC access to a rippled node.
//!
//! `LedgerRpc` is the seam between sessions and the network. `JsonRpcClient`
//! speaks rippled's `{"method", "params": [{...}]}` protocol over HTTP; tests
//! substitute an in-memory ledger. Transactions cross the seam only as signed
//! blobs; no key material is ever sent to the node.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use common::{ClassicAddress, Drops, LedgerError, SignerEntry, SignerList};

/// Failure of one RPC call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The request never produced a node reply.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node replied with `status: "error"`.
    #[error("node error {error}: {message}")]
    Node { error: String, message: String },

    /// The reply did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RpcError {
    pub fn node(error: impl Into<String>, message: impl Into<String>) -> Self {
        RpcError::Node {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Node error token such as `actNotFound`.
    pub fn node_code(&self) -> Option<&str> {
        match self {
            RpcError::Node { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.node_code(), Some("actNotFound") | Some("txnNotFound"))
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub build_version: Option<String>,
    /// Sequence of the latest validated ledger.
    pub validated_ledger: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeInfo {
    pub base_fee: Drops,
    pub open_ledger_fee: Drops,
    pub ledger_current_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account: ClassicAddress,
    pub sequence: u32,
    pub balance: Drops,
}

/// One trust line as seen from the queried account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustLine {
    /// The counterparty (issuer) of the line.
    pub account: String,
    pub currency: String,
    pub balance: String,
    pub limit: String,
}

/// Preliminary result of handing a transaction to the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub engine_result: String,
    pub engine_result_message: Option<String>,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    pub hash: String,
    pub validated: bool,
    pub ledger_index: Option<u32>,
    pub result_code: Option<String>,
}

// ============================================================================
// Seam
// ============================================================================

/// The node calls a ledger session needs.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn server_info(&self) -> Result<ServerInfo, RpcError>;

    async fn fee(&self) -> Result<FeeInfo, RpcError>;

    async fn account_info(&self, account: &ClassicAddress) -> Result<AccountInfo, RpcError>;

    /// Trust lines of `account`, restricted to `peer` when given.
    async fn account_lines(
        &self,
        account: &ClassicAddress,
        peer: Option<&ClassicAddress>,
    ) -> Result<Vec<TrustLine>, RpcError>;

    /// The active signer list of `account`, if one is installed.
    async fn account_signer_list(
        &self,
        account: &ClassicAddress,
    ) -> Result<Option<SignerList>, RpcError>;

    /// Hand a signed blob (upper-case hex) to the node. Single-signed and
    /// multisigned transactions both go through here.
    async fn submit(&self, tx_blob: &str) -> Result<SubmitResponse, RpcError>;

    async fn tx(&self, hash: &str) -> Result<TxStatus, RpcError>;

    /// Release the underlying connection.
    async fn close(&self) -> Result<(), RpcError>;
}

/// Opens one `LedgerRpc` per session.
#[async_trait]
pub trait RpcConnector: Send + Sync {
    async fn open(&self) -> Result<Box<dyn LedgerRpc>, RpcError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Validate a JSON-RPC endpoint. Only `http` and `https` are spoken here;
/// a WebSocket URL (`ws://`, `wss://`) is refused up front.
pub fn parse_node_url(url: &str) -> Result<reqwest::Url, LedgerError> {
    let parsed = reqwest::Url::parse(url.trim())
        .map_err(|e| LedgerError::Configuration(format!("node URL '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(LedgerError::Configuration(format!(
            "node URL '{}' uses {}; a JSON-RPC http(s) endpoint is required",
            url, other
        ))),
    }
}

/// Connector building a fresh HTTP client (and connection pool) per session.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    url: String,
    request_timeout: Duration,
}

impl HttpConnector {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            request_timeout,
        }
    }
}

#[async_trait]
impl RpcConnector for HttpConnector {
    async fn open(&self) -> Result<Box<dyn LedgerRpc>, RpcError> {
        let client = JsonRpcClient::new(&self.url, self.request_timeout)?;
        Ok(Box::new(client))
    }
}

/// rippled JSON-RPC client.
pub struct JsonRpcClient {
    url: String,
    client: reqwest::Client,
}

impl JsonRpcClient {
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Make an RPC call and return the `result` object.
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "method": method,
            "params": [params],
        });

        tracing::trace!("rpc call {}", method);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Transport(format!(
                "{} returned HTTP {}: {}",
                method, status, body
            )));
        }

        let mut reply: Value = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(format!("{}: {}", method, e)))?;

        let result = reply
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| RpcError::Malformed(format!("{}: missing result", method)))?;

        if result["status"] == "error" {
            return Err(RpcError::Node {
                error: result["error"].as_str().unwrap_or("unknown").to_string(),
                message: result["error_message"]
                    .as_str()
                    .or_else(|| result["error"].as_str())
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        Ok(result)
    }

    async fn call_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result).map_err(|e| RpcError::Malformed(format!("{}: {}", method, e)))
    }
}

#[async_trait]
impl LedgerRpc for JsonRpcClient {
    async fn server_info(&self) -> Result<ServerInfo, RpcError> {
        let result = self.call("server_info", json!({})).await?;
        Ok(parse_server_info(&result))
    }

    async fn fee(&self) -> Result<FeeInfo, RpcError> {
        let result = self.call("fee", json!({})).await?;
        parse_fee(&result)
    }

    async fn account_info(&self, account: &ClassicAddress) -> Result<AccountInfo, RpcError> {
        let result = self
            .call(
                "account_info",
                json!({"account": account, "ledger_index": "current"}),
            )
            .await?;
        parse_account_info(&result)
    }

    async fn account_lines(
        &self,
        account: &ClassicAddress,
        peer: Option<&ClassicAddress>,
    ) -> Result<Vec<TrustLine>, RpcError> {
        let mut params = json!({"account": account, "ledger_index": "validated"});
        if let Some(peer) = peer {
            params["peer"] = json!(peer);
        }

        #[derive(Deserialize)]
        struct Lines {
            lines: Vec<TrustLine>,
        }
        let lines: Lines = self.call_as("account_lines", params).await?;
        Ok(lines.lines)
    }

    async fn account_signer_list(
        &self,
        account: &ClassicAddress,
    ) -> Result<Option<SignerList>, RpcError> {
        let result = self
            .call(
                "account_objects",
                json!({
                    "account": account,
                    "type": "signer_list",
                    "ledger_index": "validated",
                }),
            )
            .await?;
        parse_signer_list(&result)
    }

    async fn submit(&self, tx_blob: &str) -> Result<SubmitResponse, RpcError> {
        let result = self.call("submit", json!({"tx_blob": tx_blob})).await?;
        parse_submit(&result)
    }

    async fn tx(&self, hash: &str) -> Result<TxStatus, RpcError> {
        let result = self.call("tx", json!({"transaction": hash})).await?;
        Ok(parse_tx(hash, &result))
    }

    async fn close(&self) -> Result<(), RpcError> {
        // HTTP has no session to tear down; the pool closes with the client.
        Ok(())
    }
}

// ============================================================================
// Response parsing
// ============================================================================

fn parse_server_info(result: &Value) -> ServerInfo {
    let info = &result["info"];
    ServerInfo {
        build_version: info["build_version"].as_str().map(str::to_string),
        validated_ledger: info["validated_ledger"]["seq"]
            .as_u64()
            .map(|seq| seq as u32),
    }
}

fn drops_field(value: &Value, field: &str) -> Result<Drops, RpcError> {
    let text = value[field]
        .as_str()
        .ok_or_else(|| RpcError::Malformed(format!("missing {}", field)))?;
    Drops::parse(text).map_err(|e| RpcError::Malformed(format!("{}: {}", field, e)))
}

fn u32_field(value: &Value, field: &str) -> Result<u32, RpcError> {
    value[field]
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| RpcError::Malformed(format!("missing {}", field)))
}

fn parse_fee(result: &Value) -> Result<FeeInfo, RpcError> {
    let drops = &result["drops"];
    Ok(FeeInfo {
        base_fee: drops_field(drops, "base_fee")?,
        open_ledger_fee: drops_field(drops, "open_ledger_fee")?,
        ledger_current_index: u32_field(result, "ledger_current_index")?,
    })
}

fn parse_account_info(result: &Value) -> Result<AccountInfo, RpcError> {
    let data = &result["account_data"];
    let account = data["Account"]
        .as_str()
        .ok_or_else(|| RpcError::Malformed("missing Account".to_string()))?;
    Ok(AccountInfo {
        account: ClassicAddress::parse(account)
            .map_err(|e| RpcError::Malformed(e.to_string()))?,
        sequence: u32_field(data, "Sequence")?,
        balance: drops_field(data, "Balance")?,
    })
}

fn parse_signer_list(result: &Value) -> Result<Option<SignerList>, RpcError> {
    let objects = match result["account_objects"].as_array() {
        Some(objects) => objects,
        None => return Ok(None),
    };
    let object = match objects
        .iter()
        .find(|o| o["LedgerEntryType"] == "SignerList")
    {
        Some(object) => object,
        None => return Ok(None),
    };

    let quorum = u32_field(object, "SignerQuorum")?;
    let entries = object["SignerEntries"]
        .as_array()
        .ok_or_else(|| RpcError::Malformed("missing SignerEntries".to_string()))?
        .iter()
        .map(|wrapper| {
            serde_json::from_value::<SignerEntry>(wrapper["SignerEntry"].clone())
                .map_err(|e| RpcError::Malformed(format!("SignerEntry: {}", e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(SignerList::new(quorum, entries)))
}

fn parse_submit(result: &Value) -> Result<SubmitResponse, RpcError> {
    let engine_result = result["engine_result"]
        .as_str()
        .ok_or_else(|| RpcError::Malformed("missing engine_result".to_string()))?;
    let hash = result["tx_json"]["hash"]
        .as_str()
        .ok_or_else(|| RpcError::Malformed("missing tx_json.hash".to_string()))?;
    Ok(SubmitResponse {
        engine_result: engine_result.to_string(),
        engine_result_message: result["engine_result_message"]
            .as_str()
            .map(str::to_string),
        hash: hash.to_string(),
    })
}

fn parse_tx(hash: &str, result: &Value) -> TxStatus {
    TxStatus {
        hash: result["hash"].as_str().unwrap_or(hash).to_string(),
        validated: result["validated"].as_bool().unwrap_or(false),
        ledger_index: result["ledger_index"].as_u64().map(|n| n as u32),
        result_code: result["meta"]["TransactionResult"]
            .as_str()
            .map(str::to_string),
    }
}

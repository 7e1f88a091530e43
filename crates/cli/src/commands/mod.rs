//! CLI command implementations.
//!
//! - `payments`: escrow funding and multisig payment via the coordinator
//! - `records`: business transaction records
//! - `keys`: offline seed generation and inspection

pub mod keys;
pub mod payments;
pub mod records;

pub use keys::*;
pub use payments::*;
pub use records::*;

/// Turn a non-success coordinator response into an error naming its type,
/// message and ledger result code.
pub(crate) async fn error_from(response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(body) if body["error"].is_object() => {
            let error = &body["error"];
            let mut message = format!(
                "{} ({}): {}",
                status,
                error["type"].as_str().unwrap_or("error"),
                error["message"].as_str().unwrap_or("")
            );
            if let Some(code) = error["code"].as_str() {
                message.push_str(&format!(" [ledger code {}]", code));
            }
            anyhow::anyhow!(message)
        }
        _ => anyhow::anyhow!("{}: {}", status, text),
    }
}

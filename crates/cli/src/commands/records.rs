//! Business transaction record commands.

use anyhow::Result;
use common::{CreateTransactionRequest, TransactionRecord};

use super::error_from;

/// Create a record.
pub async fn create_record(coordinator_url: &str, request: CreateTransactionRequest) -> Result<()> {
    if let Err(message) = request.validate() {
        anyhow::bail!(message);
    }

    let client = reqwest::Client::new();
    let url = format!("{}/transaction/create", coordinator_url);

    let response = client.post(&url).json(&request).send().await?;
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }

    let record: TransactionRecord = response.json().await?;
    println!("Created record {}", record.transaction_id);
    Ok(())
}

/// List records.
pub async fn list_records(coordinator_url: &str) -> Result<()> {
    let url = format!("{}/transaction", coordinator_url);
    let response = reqwest::get(&url).await?;

    if !response.status().is_success() {
        return Err(error_from(response).await);
    }

    let records: Vec<TransactionRecord> = response.json().await?;
    if records.is_empty() {
        println!("No transaction records.");
        return Ok(());
    }

    println!(
        "{:<20} {:<20} {:<20} {:>10} {:>12}",
        "ID", "PARTNER", "PRODUCT", "QUANTITY", "PRICE"
    );
    for record in &records {
        println!(
            "{:<20} {:<20} {:<20} {:>10} {:>12}",
            record.transaction_id,
            record.business_partner.as_deref().unwrap_or("-"),
            record.product_name,
            record.quantity,
            record.price
        );
    }
    println!();
    println!("{} record(s)", records.len());
    Ok(())
}

//! Escrow funding and multisig payment commands.

use anyhow::Result;
use common::{
    FundEscrowRequest, FundEscrowResponse, HealthResponse, MultisigPaymentResponse, StepOutcome,
    SwapOutcome,
};

use super::error_from;

/// Check coordinator health.
pub async fn health(coordinator_url: &str) -> Result<()> {
    let url = format!("{}/health", coordinator_url);
    let response = reqwest::get(&url).await?;

    if !response.status().is_success() {
        return Err(error_from(response).await);
    }

    let health: HealthResponse = response.json().await?;
    println!("Coordinator {} (version {}) at {}", health.status, health.version, health.timestamp);
    Ok(())
}

fn describe_step(step: &StepOutcome) -> String {
    match step {
        StepOutcome::Unchanged => "already in place".to_string(),
        StepOutcome::Submitted { result } => {
            format!("submitted {} (ledger {})", result.hash, result.ledger_index)
        }
    }
}

/// Fund the vault with `amount` of `currency`.
pub async fn fund_escrow(coordinator_url: &str, amount: &str, currency: &str) -> Result<()> {
    println!("Funding escrow with {} {}...", amount, currency);

    let client = reqwest::Client::new();
    let url = format!("{}/escrow/fund", coordinator_url);
    let request = FundEscrowRequest {
        amount: amount.to_string(),
        currency: currency.to_string(),
    };

    let response = client.post(&url).json(&request).send().await?;
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }

    let funded: FundEscrowResponse = response.json().await?;

    println!();
    println!("Escrow Funded");
    println!("=============");
    println!("  Trust line:   {}", describe_step(&funded.trust_line));
    println!("  Payment:      {}", funded.result.hash);
    println!("  Ledger:       {}", funded.result.ledger_index);
    println!("  Result:       {}", funded.result.result_code);

    Ok(())
}

/// Run the multisig payment flow.
pub async fn multisig_pay(coordinator_url: &str) -> Result<()> {
    println!("Requesting multisigned payment...");

    let client = reqwest::Client::new();
    let url = format!("{}/multisig/sign", coordinator_url);

    let response = client.post(&url).send().await?;
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }

    let paid: MultisigPaymentResponse = response.json().await?;

    println!();
    println!("Multisig Payment");
    println!("================");
    println!("  Signer list:  {}", describe_step(&paid.signer_list));
    println!("  Payment:      {}", paid.payment.hash);
    println!("  Ledger:       {}", paid.payment.ledger_index);
    println!("  Result:       {}", paid.payment.result_code);

    if let Some(swap) = paid.swap {
        let outcome = match swap.outcome {
            SwapOutcome::Filled => "filled",
            SwapOutcome::NoLiquidity => "no liquidity (offer killed)",
        };
        println!("  Swap:         {} ({})", outcome, swap.result.hash);
    }

    Ok(())
}

//! Escrow CLI
//!
//! Command-line client for the escrow coordinator, plus offline seed tools.

mod commands;

use anyhow::Result;
use chains::xrpl::KeyType;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

/// Escrow CLI - drive escrow funding and multisig payments.
#[derive(Parser, Debug)]
#[command(name = "escrow-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Coordinator server URL.
    #[arg(long, env = "COORDINATOR_URL", default_value = "http://localhost:3000", global = true)]
    coordinator: String,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeyTypeArg {
    Secp256k1,
    Ed25519,
}

impl From<KeyTypeArg> for KeyType {
    fn from(arg: KeyTypeArg) -> Self {
        match arg {
            KeyTypeArg::Secp256k1 => KeyType::Secp256k1,
            KeyTypeArg::Ed25519 => KeyType::Ed25519,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the coordinator is up.
    Health,

    /// Fund the vault with the issued asset.
    FundEscrow {
        /// Decimal amount, e.g. "150.25".
        #[arg(short, long)]
        amount: String,

        /// Currency code (3-character, 40-hex, or a longer name such as RLUSD).
        #[arg(short, long, default_value = "RLUSD")]
        currency: String,
    },

    /// Send the configured multisigned payment from the vault.
    MultisigPay,

    /// Business transaction records.
    #[command(subcommand)]
    Record(RecordCommands),

    /// Generate a new seed and print its address.
    Keygen {
        #[arg(short = 't', long, value_enum, default_value = "ed25519")]
        key_type: KeyTypeArg,
    },

    /// Print the address and public key of a seed.
    Address {
        /// Encoded seed; read from XRPL_SECRET when omitted.
        #[arg(long, env = "XRPL_SECRET", hide_env_values = true)]
        secret: String,
    },
}

#[derive(Subcommand, Debug)]
enum RecordCommands {
    /// Create a transaction record.
    Create {
        #[arg(long)]
        transaction_id: String,

        #[arg(long)]
        business_partner: Option<String>,

        #[arg(long)]
        product_name: String,

        #[arg(long)]
        quantity: String,

        #[arg(long)]
        price: String,
    },

    /// List transaction records.
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::TRACE
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Health => {
            commands::health(&cli.coordinator).await?;
        }
        Commands::FundEscrow { amount, currency } => {
            commands::fund_escrow(&cli.coordinator, &amount, &currency).await?;
        }
        Commands::MultisigPay => {
            commands::multisig_pay(&cli.coordinator).await?;
        }
        Commands::Record(RecordCommands::Create {
            transaction_id,
            business_partner,
            product_name,
            quantity,
            price,
        }) => {
            let request = common::CreateTransactionRequest {
                transaction_id,
                business_partner,
                product_name,
                quantity,
                price,
            };
            commands::create_record(&cli.coordinator, request).await?;
        }
        Commands::Record(RecordCommands::List) => {
            commands::list_records(&cli.coordinator).await?;
        }
        Commands::Keygen { key_type } => {
            commands::keygen(key_type.into())?;
        }
        Commands::Address { secret } => {
            commands::show_address(&secret)?;
        }
    }

    Ok(())
}

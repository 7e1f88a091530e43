//! Offline seed tools. Nothing here talks to the network.

use anyhow::Result;
use chains::xrpl::{KeyType, Seed, Wallet};

/// Generate a seed and print it with its address.
pub fn keygen(key_type: KeyType) -> Result<()> {
    let seed = Seed::random(key_type);
    let secret = seed.encode();
    let wallet = Wallet::from_seed(seed)?;

    println!("New {} wallet", key_type);
    println!("=================");
    println!("  Address:      {}", wallet.address());
    println!("  Public key:   {}", wallet.public_key_hex());
    println!("  Seed:         {}", secret.as_str());
    println!();
    println!("Store the seed securely; it cannot be recovered.");
    Ok(())
}

/// Print the address and public key of an existing seed.
pub fn show_address(secret: &str) -> Result<()> {
    let wallet = Wallet::from_secret(secret)?;
    println!("  Address:      {}", wallet.address());
    println!("  Key type:     {}", wallet.key_type());
    println!("  Public key:   {}", wallet.public_key_hex());
    Ok(())
}

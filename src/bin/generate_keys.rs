use anyhow::Result;
use solana_sdk::signer::Signer;

use priority_transfer::{config::keypair_output_path, keygen::generate_keypair_file};

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let path = keypair_output_path(std::env::args().nth(1));
    let keypair = generate_keypair_file(&path)?;

    println!("Generated keypair:");
    println!("Pubkey: {} (saved to {})", keypair.pubkey(), path.display());
    Ok(())
}

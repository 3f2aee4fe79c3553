use anyhow::Result;
use solana_sdk::{
    native_token::lamports_to_sol,
    signature::{Keypair, Signer},
};

use priority_transfer::{
    config::TransferConfig,
    keygen::load_keypair_file,
    rpc::{SolanaRpc, TransferRpc},
    transfer::{fund_sender, run_transfer, TransferOutcome, TransferRequest},
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = TransferConfig::load_from_env()?;
    log::info!("using rpc endpoint {}", redact(&config.rpc_url));

    // The source must sign; the destination only needs an address.
    let sender = match &config.sender_keypair_path {
        Some(path) => load_keypair_file(path)?,
        None => Keypair::new(),
    };
    let receiver = Keypair::new();
    println!("Sender:   {}", sender.pubkey());
    println!("Receiver: {}", receiver.pubkey());

    let rpc = SolanaRpc::new(&config);

    if let Some(lamports) = config.airdrop_lamports {
        fund_sender(&rpc, &sender.pubkey(), lamports).await?;
    }
    let sender_balance = rpc.balance(&sender.pubkey()).await?;
    println!("Sender balance: {} SOL", lamports_to_sol(sender_balance));

    let request = TransferRequest {
        sender: &sender,
        receiver: receiver.pubkey(),
        lamports: config.transfer_lamports,
        fallback_unit_price: config.priority_fee_fallback,
    };

    match run_transfer(&rpc, request).await? {
        TransferOutcome::Confirmed { signature, budget } => {
            println!(
                "Transfer confirmed: {signature} (price {} micro-lamports, limit {} units)",
                budget.unit_price, budget.unit_limit
            );
            Ok(())
        }
        TransferOutcome::PreflightRejected(failure) => {
            anyhow::bail!("transfer rejected in preflight: {failure}")
        }
    }
}

/// Drops the query string, where providers put API keys.
fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

use std::{fs, path::Path};

use solana_sdk::{signature::Keypair, signer::Signer};

use crate::errors::{TransferError, TransferResult};

/// Generates a new keypair and writes it to `path` as a JSON array of its 64
/// bytes, replacing whatever was there.
pub fn generate_keypair_file(path: &Path) -> TransferResult<Keypair> {
    let keypair = Keypair::new();
    write_keypair_json(&keypair, path)?;
    log::info!("wrote keypair {} to {}", keypair.pubkey(), path.display());
    Ok(keypair)
}

pub fn write_keypair_json(keypair: &Keypair, path: &Path) -> TransferResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(&keypair.to_bytes().to_vec())?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_keypair_file(path: &Path) -> TransferResult<Keypair> {
    let bytes: Vec<u8> = serde_json::from_str(&fs::read_to_string(path)?)?;
    Keypair::from_bytes(&bytes).map_err(|e| TransferError::Keypair(e.to_string()))
}

use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::errors::{TransferError, TransferResult};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_KEYPAIR_PATH: &str = "./keypair.json";

/// Runtime settings for the transfer binary. Endpoint URLs may carry an API
/// key, so they are only ever read from the environment (or a `.env` file).
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub rpc_url: String,
    pub ws_url: String,
    pub priority_fee_url: String,
    pub transfer_lamports: u64,
    pub airdrop_lamports: Option<u64>,
    pub priority_fee_fallback: u64,
    pub confirm_timeout_secs: u64,
    pub sender_keypair_path: Option<PathBuf>,
}

impl TransferConfig {
    pub fn load_from_env() -> TransferResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> TransferResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rpc_url = lookup("SOLANA_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let ws_url = lookup("SOLANA_WS_URL").unwrap_or_else(|| websocket_url_for(&rpc_url));
        let priority_fee_url = lookup("PRIORITY_FEE_URL").unwrap_or_else(|| rpc_url.clone());

        Ok(Self {
            transfer_lamports: parse_var(&lookup, "TRANSFER_LAMPORTS")?.unwrap_or(1),
            airdrop_lamports: parse_var(&lookup, "AIRDROP_LAMPORTS")?,
            priority_fee_fallback: parse_var(&lookup, "PRIORITY_FEE_FALLBACK")?.unwrap_or(0),
            confirm_timeout_secs: parse_var(&lookup, "CONFIRM_TIMEOUT_SECS")?.unwrap_or(60),
            sender_keypair_path: lookup("SENDER_KEYPAIR_PATH").map(PathBuf::from),
            rpc_url,
            ws_url,
            priority_fee_url,
        })
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

/// Output path for the keypair generator: first CLI argument, then
/// `KEYPAIR_PATH`, then the default.
pub fn keypair_output_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var("KEYPAIR_PATH").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYPAIR_PATH))
}

/// Maps an HTTP(S) JSON-RPC URL onto the matching pubsub URL, keeping the
/// host, path and query (API keys are usually passed in the query).
pub fn websocket_url_for(rpc_url: &str) -> String {
    if let Some(rest) = rpc_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = rpc_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        rpc_url.to_string()
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> TransferResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| TransferError::Config(format!("{key} has an invalid value: {raw:?}"))),
    }
}

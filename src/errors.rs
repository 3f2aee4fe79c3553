use solana_client::{client_error::ClientError, nonblocking::pubsub_client::PubsubClientError};
use solana_sdk::{
    message::CompileError, signature::Signature, signer::SignerError,
    transaction::TransactionError,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("rpc error: {0}")]
    Rpc(#[from] ClientError),

    #[error("pubsub error: {0}")]
    Pubsub(#[from] PubsubClientError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("wire encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid keypair: {0}")]
    Keypair(String),

    #[error("failed to compile message: {0}")]
    Compile(#[from] CompileError),

    #[error("failed to sign transaction: {0}")]
    Signing(#[from] SignerError),

    #[error("simulation failed: {0}")]
    Simulation(String),

    #[error("transaction {signature} not confirmed after {seconds}s")]
    ConfirmationTimeout { signature: Signature, seconds: u64 },

    #[error("signature subscription for {signature} closed before confirmation")]
    SubscriptionClosed { signature: Signature },

    #[error("transaction {signature} failed: {err}")]
    TransactionFailed {
        signature: Signature,
        err: TransactionError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type TransferResult<T> = Result<T, TransferError>;

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use futures::StreamExt;
use solana_client::{
    nonblocking::{pubsub_client::PubsubClient, rpc_client::RpcClient},
    rpc_config::{RpcSendTransactionConfig, RpcSignatureSubscribeConfig, RpcSimulateTransactionConfig},
    rpc_response::RpcSignatureResult,
};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::UiTransactionEncoding;

use crate::{
    budget::MAX_COMPUTE_UNIT_LIMIT,
    config::TransferConfig,
    errors::{TransferError, TransferResult},
    priority_fee::PriorityFeeClient,
};

/// Network calls the transfer workflow depends on.
#[async_trait]
pub trait TransferRpc: Send + Sync {
    async fn latest_blockhash(&self) -> TransferResult<Hash>;

    async fn balance(&self, pubkey: &Pubkey) -> TransferResult<u64>;

    /// Requests a faucet credit and returns once it is confirmed.
    async fn airdrop(&self, to: &Pubkey, lamports: u64) -> TransferResult<Signature>;

    async fn priority_fee_estimate(&self, tx: &VersionedTransaction) -> TransferResult<Option<u64>>;

    /// Compute units `instructions` consume when simulated with `payer` as
    /// fee payer.
    async fn compute_unit_estimate(
        &self,
        payer: &Pubkey,
        instructions: &[Instruction],
    ) -> TransferResult<u64>;

    /// Broadcasts without preflight or node-side retries and waits for the
    /// `confirmed` commitment.
    async fn send_and_confirm(&self, tx: &VersionedTransaction) -> TransferResult<Signature>;
}

pub struct SolanaRpc {
    rpc_client: RpcClient,
    ws_url: String,
    fee_client: PriorityFeeClient,
    confirm_timeout: Duration,
}

impl SolanaRpc {
    pub fn new(config: &TransferConfig) -> Self {
        Self {
            rpc_client: RpcClient::new_with_commitment(
                config.rpc_url.clone(),
                CommitmentConfig::confirmed(),
            ),
            ws_url: config.ws_url.clone(),
            fee_client: PriorityFeeClient::new(config.priority_fee_url.clone()),
            confirm_timeout: config.confirm_timeout(),
        }
    }
}

#[async_trait]
impl TransferRpc for SolanaRpc {
    async fn latest_blockhash(&self) -> TransferResult<Hash> {
        Ok(self.rpc_client.get_latest_blockhash().await?)
    }

    async fn balance(&self, pubkey: &Pubkey) -> TransferResult<u64> {
        Ok(self.rpc_client.get_balance(pubkey).await?)
    }

    async fn airdrop(&self, to: &Pubkey, lamports: u64) -> TransferResult<Signature> {
        let signature = self.rpc_client.request_airdrop(to, lamports).await?;
        log::info!("airdrop requested: {signature}");
        within_confirm_timeout(self.confirm_timeout, signature, async {
            Ok(self
                .rpc_client
                .poll_for_signature_with_commitment(&signature, CommitmentConfig::confirmed())
                .await?)
        })
        .await?;
        Ok(signature)
    }

    async fn priority_fee_estimate(&self, tx: &VersionedTransaction) -> TransferResult<Option<u64>> {
        self.fee_client.estimate(tx).await
    }

    async fn compute_unit_estimate(
        &self,
        payer: &Pubkey,
        instructions: &[Instruction],
    ) -> TransferResult<u64> {
        // Simulate under the maximum limit so the default per-instruction
        // budget does not cap the measurement.
        let mut simulated = Vec::with_capacity(instructions.len() + 1);
        simulated.push(ComputeBudgetInstruction::set_compute_unit_limit(MAX_COMPUTE_UNIT_LIMIT));
        simulated.extend_from_slice(instructions);

        let message = v0::Message::try_compile(payer, &simulated, &[], Hash::default())?;
        let tx = VersionedTransaction {
            signatures: vec![Signature::default(); message.header.num_required_signatures as usize],
            message: VersionedMessage::V0(message),
        };

        let response = self
            .rpc_client
            .simulate_transaction_with_config(
                &tx,
                RpcSimulateTransactionConfig {
                    sig_verify: false,
                    replace_recent_blockhash: true,
                    commitment: Some(CommitmentConfig::confirmed()),
                    ..RpcSimulateTransactionConfig::default()
                },
            )
            .await?;

        let result = response.value;
        if let Some(err) = result.err {
            let logs = result.logs.unwrap_or_default().join("\n");
            return Err(TransferError::Simulation(format!("{err}\n{logs}")));
        }
        result
            .units_consumed
            .ok_or_else(|| TransferError::Simulation("node did not report units consumed".into()))
    }

    async fn send_and_confirm(&self, tx: &VersionedTransaction) -> TransferResult<Signature> {
        let signature = tx.signatures[0];

        // Subscribe before sending so the notification cannot be missed.
        let pubsub = PubsubClient::new(&self.ws_url).await?;
        let (mut notifications, unsubscribe) = pubsub
            .signature_subscribe(
                &signature,
                Some(RpcSignatureSubscribeConfig {
                    commitment: Some(CommitmentConfig::confirmed()),
                    enable_received_notification: Some(false),
                }),
            )
            .await?;

        self.rpc_client
            .send_transaction_with_config(
                tx,
                RpcSendTransactionConfig {
                    skip_preflight: true,
                    max_retries: Some(0),
                    preflight_commitment: Some(CommitmentLevel::Confirmed),
                    encoding: Some(UiTransactionEncoding::Base64),
                    ..RpcSendTransactionConfig::default()
                },
            )
            .await?;
        log::info!("transaction sent: {signature}");

        let notification = within_confirm_timeout(self.confirm_timeout, signature, async {
            Ok(notifications.next().await)
        })
        .await;
        unsubscribe().await;

        signature_status(signature, notification?.map(|response| response.value))
    }
}

/// Runs a confirmation wait under `timeout`, reporting expiry as
/// `ConfirmationTimeout` for `signature`.
pub async fn within_confirm_timeout<T, F>(
    timeout: Duration,
    signature: Signature,
    wait: F,
) -> TransferResult<T>
where
    F: Future<Output = TransferResult<T>>,
{
    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(TransferError::ConfirmationTimeout {
            signature,
            seconds: timeout.as_secs(),
        }),
    }
}

/// Maps a signature notification onto the workflow result. `None` means the
/// subscription stream ended before any notification arrived.
pub fn signature_status(
    signature: Signature,
    notification: Option<RpcSignatureResult>,
) -> TransferResult<Signature> {
    match notification {
        Some(RpcSignatureResult::ProcessedSignature(processed)) => match processed.err {
            None => Ok(signature),
            Some(err) => Err(TransferError::TransactionFailed { signature, err }),
        },
        Some(RpcSignatureResult::ReceivedSignature(_)) => Ok(signature),
        None => Err(TransferError::SubscriptionClosed { signature }),
    }
}

use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};

use crate::{
    budget::ComputeBudgetPlan,
    errors::TransferResult,
    report::{classify_submission_error, log_preflight_failure, PreflightFailure},
    rpc::TransferRpc,
};

#[derive(Debug, Clone, Copy)]
pub struct TransferRequest<'a> {
    pub sender: &'a Keypair,
    pub receiver: Pubkey,
    pub lamports: u64,
    /// Unit price used when the fee endpoint has no estimate.
    pub fallback_unit_price: u64,
}

#[derive(Debug)]
pub enum TransferOutcome {
    Confirmed {
        signature: Signature,
        budget: ComputeBudgetPlan,
    },
    PreflightRejected(PreflightFailure),
}

/// Compiles `instructions` into a v0 message paid by `payer` and signs it.
pub fn build_signed_transaction(
    payer: &Keypair,
    instructions: &[Instruction],
    recent_blockhash: Hash,
) -> TransferResult<VersionedTransaction> {
    let message = v0::Message::try_compile(&payer.pubkey(), instructions, &[], recent_blockhash)?;
    Ok(VersionedTransaction::try_new(VersionedMessage::V0(message), &[payer])?)
}

/// Credits `lamports` to `to` from the faucet, waiting for confirmation.
pub async fn fund_sender<R>(rpc: &R, to: &Pubkey, lamports: u64) -> TransferResult<Signature>
where
    R: TransferRpc + ?Sized,
{
    log::info!("requesting airdrop of {lamports} lamports to {to}");
    let signature = rpc.airdrop(to, lamports).await?;
    log::info!("airdrop confirmed: {signature}");
    Ok(signature)
}

/// Builds, budgets, signs and submits one transfer.
///
/// The message is built twice: the first build is signed only so the fee
/// endpoint can price it, the final build appends the compute budget
/// instructions and takes a blockhash fetched after budgeting, since the
/// estimate round trips can outlive the first one.
pub async fn run_transfer<R>(rpc: &R, request: TransferRequest<'_>) -> TransferResult<TransferOutcome>
where
    R: TransferRpc + ?Sized,
{
    let sender = request.sender;
    let transfer_ix =
        system_instruction::transfer(&sender.pubkey(), &request.receiver, request.lamports);

    let blockhash = rpc.latest_blockhash().await?;
    let provisional =
        build_signed_transaction(sender, std::slice::from_ref(&transfer_ix), blockhash)?;
    log::info!("provisional transaction signed with blockhash {blockhash}");

    let unit_price = match rpc.priority_fee_estimate(&provisional).await? {
        Some(fee) => fee,
        None => {
            log::warn!(
                "no priority fee estimate, falling back to {} micro-lamports",
                request.fallback_unit_price
            );
            request.fallback_unit_price
        }
    };
    log::info!("setting priority fee to {unit_price} micro-lamports per unit");

    let units_consumed = rpc
        .compute_unit_estimate(&sender.pubkey(), std::slice::from_ref(&transfer_ix))
        .await?;
    let budget = ComputeBudgetPlan::new(unit_price, units_consumed);
    log::info!(
        "simulation used {units_consumed} compute units, setting limit to {}",
        budget.unit_limit
    );

    let final_blockhash = rpc.latest_blockhash().await?;
    let [price_ix, limit_ix] = budget.instructions();
    let final_tx =
        build_signed_transaction(sender, &[transfer_ix, price_ix, limit_ix], final_blockhash)?;
    log::info!("rebuilt and signed transaction with blockhash {final_blockhash}");

    log::info!("sending and confirming transaction");
    match rpc.send_and_confirm(&final_tx).await {
        Ok(signature) => {
            log::info!("transfer confirmed: {signature}");
            Ok(TransferOutcome::Confirmed { signature, budget })
        }
        Err(err) => {
            let failure = classify_submission_error(err, &final_tx.message)?;
            log_preflight_failure(&failure);
            Ok(TransferOutcome::PreflightRejected(failure))
        }
    }
}

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use serde_json::json;
use solana_client::{
    client_error::ClientError,
    rpc_request::{RpcError, RpcResponseErrorData},
    rpc_response::RpcSimulateTransactionResult,
};
use solana_sdk::{
    compute_budget::{self, ComputeBudgetInstruction},
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction, system_program,
    transaction::VersionedTransaction,
};

use priority_transfer::{
    errors::{TransferError, TransferResult},
    rpc::TransferRpc,
    transfer::{fund_sender, run_transfer, TransferOutcome, TransferRequest},
};

enum SendBehaviour {
    Confirm,
    PreflightFailure,
    Timeout,
}

struct MockRpc {
    blockhashes: Mutex<VecDeque<Hash>>,
    fee_estimate: Option<u64>,
    units_consumed: u64,
    send_behaviour: SendBehaviour,
    fee_requests: Mutex<Vec<VersionedTransaction>>,
    simulated: Mutex<Vec<(Pubkey, Vec<Instruction>)>>,
    sent: Mutex<Vec<VersionedTransaction>>,
    airdrops: Mutex<Vec<(Pubkey, u64)>>,
}

impl MockRpc {
    fn new(blockhashes: &[Hash]) -> Self {
        Self {
            blockhashes: Mutex::new(blockhashes.iter().copied().collect()),
            fee_estimate: Some(12_345),
            units_consumed: 150,
            send_behaviour: SendBehaviour::Confirm,
            fee_requests: Mutex::new(Vec::new()),
            simulated: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            airdrops: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TransferRpc for MockRpc {
    async fn latest_blockhash(&self) -> TransferResult<Hash> {
        Ok(self
            .blockhashes
            .lock()
            .unwrap()
            .pop_front()
            .expect("workflow asked for more blockhashes than expected"))
    }

    async fn balance(&self, _pubkey: &Pubkey) -> TransferResult<u64> {
        Ok(1_000_000_000)
    }

    async fn airdrop(&self, to: &Pubkey, lamports: u64) -> TransferResult<Signature> {
        self.airdrops.lock().unwrap().push((*to, lamports));
        Ok(Signature::new_unique())
    }

    async fn priority_fee_estimate(&self, tx: &VersionedTransaction) -> TransferResult<Option<u64>> {
        self.fee_requests.lock().unwrap().push(tx.clone());
        Ok(self.fee_estimate)
    }

    async fn compute_unit_estimate(
        &self,
        payer: &Pubkey,
        instructions: &[Instruction],
    ) -> TransferResult<u64> {
        self.simulated
            .lock()
            .unwrap()
            .push((*payer, instructions.to_vec()));
        Ok(self.units_consumed)
    }

    async fn send_and_confirm(&self, tx: &VersionedTransaction) -> TransferResult<Signature> {
        self.sent.lock().unwrap().push(tx.clone());
        let signature = tx.signatures[0];
        match self.send_behaviour {
            SendBehaviour::Confirm => Ok(signature),
            SendBehaviour::PreflightFailure => {
                let simulation: RpcSimulateTransactionResult = serde_json::from_value(json!({
                    "err": {"InstructionError": [0, {"Custom": 1}]},
                    "logs": ["Transfer: insufficient lamports 0, need 1"],
                    "accounts": null
                }))
                .unwrap();
                Err(TransferError::Rpc(ClientError::from(RpcError::RpcResponseError {
                    code: -32002,
                    message: "Transaction simulation failed".to_string(),
                    data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
                })))
            }
            SendBehaviour::Timeout => Err(TransferError::ConfirmationTimeout {
                signature,
                seconds: 60,
            }),
        }
    }
}

fn request(sender: &Keypair, receiver: Pubkey) -> TransferRequest<'_> {
    TransferRequest {
        sender,
        receiver,
        lamports: 1,
        fallback_unit_price: 0,
    }
}

#[tokio::test]
async fn submits_once_with_transfer_and_budget_instructions() {
    let first = Hash::new_unique();
    let second = Hash::new_unique();
    let rpc = MockRpc::new(&[first, second]);
    let sender = Keypair::new();
    let receiver = Pubkey::new_unique();

    let outcome = run_transfer(&rpc, request(&sender, receiver)).await.unwrap();

    let sent = rpc.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let tx = &sent[0];

    let keys = tx.message.static_account_keys();
    let program_ids: Vec<Pubkey> = tx
        .message
        .instructions()
        .iter()
        .map(|ix| keys[ix.program_id_index as usize])
        .collect();
    assert_eq!(
        program_ids,
        vec![system_program::id(), compute_budget::id(), compute_budget::id()]
    );

    let expected_price = ComputeBudgetInstruction::set_compute_unit_price(12_345);
    let expected_limit = ComputeBudgetInstruction::set_compute_unit_limit(1000);
    assert_eq!(tx.message.instructions()[1].data, expected_price.data);
    assert_eq!(tx.message.instructions()[2].data, expected_limit.data);

    assert_eq!(keys[0], sender.pubkey());
    assert!(tx.verify_with_results().iter().all(|ok| *ok));

    match outcome {
        TransferOutcome::Confirmed { signature, budget } => {
            assert_eq!(signature, tx.signatures[0]);
            assert_eq!(budget.unit_price, 12_345);
            assert_eq!(budget.unit_limit, 1000);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn final_transaction_uses_the_second_blockhash() {
    let first = Hash::new_unique();
    let second = Hash::new_unique();
    let rpc = MockRpc::new(&[first, second]);
    let sender = Keypair::new();

    run_transfer(&rpc, request(&sender, Pubkey::new_unique()))
        .await
        .unwrap();

    let fee_requests = rpc.fee_requests.lock().unwrap();
    assert_eq!(fee_requests.len(), 1);
    assert_eq!(*fee_requests[0].message.recent_blockhash(), first);
    assert_eq!(fee_requests[0].message.instructions().len(), 1);

    let sent = rpc.sent.lock().unwrap();
    assert_eq!(*sent[0].message.recent_blockhash(), second);
    assert!(rpc.blockhashes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn compute_estimate_sees_only_the_transfer() {
    let rpc = MockRpc::new(&[Hash::new_unique(), Hash::new_unique()]);
    let sender = Keypair::new();
    let receiver = Pubkey::new_unique();

    run_transfer(&rpc, request(&sender, receiver)).await.unwrap();

    let simulated = rpc.simulated.lock().unwrap();
    assert_eq!(simulated.len(), 1);
    let (payer, instructions) = &simulated[0];
    assert_eq!(*payer, sender.pubkey());
    assert_eq!(
        instructions,
        &vec![system_instruction::transfer(&sender.pubkey(), &receiver, 1)]
    );
}

#[tokio::test]
async fn margin_is_applied_to_larger_estimates() {
    let mut rpc = MockRpc::new(&[Hash::new_unique(), Hash::new_unique()]);
    rpc.units_consumed = 2000;
    let sender = Keypair::new();

    let outcome = run_transfer(&rpc, request(&sender, Pubkey::new_unique()))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        TransferOutcome::Confirmed { budget, .. } if budget.unit_limit == 2200
    ));
}

#[tokio::test]
async fn missing_fee_estimate_uses_fallback_price() {
    let mut rpc = MockRpc::new(&[Hash::new_unique(), Hash::new_unique()]);
    rpc.fee_estimate = None;
    let sender = Keypair::new();
    let mut req = request(&sender, Pubkey::new_unique());
    req.fallback_unit_price = 777;

    run_transfer(&rpc, req).await.unwrap();

    let sent = rpc.sent.lock().unwrap();
    assert_eq!(sent[0].message.instructions().len(), 3);
    assert_eq!(
        sent[0].message.instructions()[1].data,
        ComputeBudgetInstruction::set_compute_unit_price(777).data
    );
}

#[tokio::test]
async fn preflight_failure_is_reported_not_raised() {
    let mut rpc = MockRpc::new(&[Hash::new_unique(), Hash::new_unique()]);
    rpc.send_behaviour = SendBehaviour::PreflightFailure;
    let sender = Keypair::new();

    let outcome = run_transfer(&rpc, request(&sender, Pubkey::new_unique()))
        .await
        .unwrap();

    match outcome {
        TransferOutcome::PreflightRejected(failure) => {
            assert_eq!(failure.code, -32002);
            assert_eq!(failure.message, "Transaction simulation failed");
            assert!(failure.cause.is_some());
            assert_eq!(failure.logs.len(), 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(rpc.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn other_submission_errors_propagate() {
    let mut rpc = MockRpc::new(&[Hash::new_unique(), Hash::new_unique()]);
    rpc.send_behaviour = SendBehaviour::Timeout;
    let sender = Keypair::new();

    let err = run_transfer(&rpc, request(&sender, Pubkey::new_unique()))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::ConfirmationTimeout { seconds: 60, .. }));
    assert_eq!(rpc.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn funding_requests_exactly_one_airdrop() {
    let rpc = MockRpc::new(&[]);
    let sender = Keypair::new();

    fund_sender(&rpc, &sender.pubkey(), 1_000_000_000)
        .await
        .unwrap();

    assert_eq!(
        *rpc.airdrops.lock().unwrap(),
        vec![(sender.pubkey(), 1_000_000_000)]
    );
}

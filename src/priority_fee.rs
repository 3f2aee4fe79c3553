use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::transaction::VersionedTransaction;

use crate::errors::TransferResult;

pub const PRIORITY_FEE_METHOD: &str = "getPriorityFeeEstimate";

#[derive(Debug, Deserialize)]
struct PriorityFeeResponse {
    result: Option<PriorityFeeResult>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriorityFeeResult {
    priority_fee_estimate: Option<f64>,
}

/// Client for the `getPriorityFeeEstimate` extension served by some RPC
/// providers. The method is not part of the standard RPC surface, so it is
/// called over plain JSON-RPC.
pub struct PriorityFeeClient {
    client: Client,
    url: String,
}

impl PriorityFeeClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Recommended price in micro-lamports per compute unit, or `None` when
    /// the endpoint answers without an estimate.
    pub async fn estimate(&self, tx: &VersionedTransaction) -> TransferResult<Option<u64>> {
        let encoded_tx = encode_transaction(tx)?;
        let request_body = priority_fee_request(&encoded_tx);

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let response_json: Value = response.json().await?;
        Ok(parse_priority_fee_response(&response_json))
    }
}

pub fn encode_transaction(tx: &VersionedTransaction) -> TransferResult<String> {
    let serialized_tx = bincode::serialize(tx)?;
    Ok(BASE64_STANDARD.encode(serialized_tx))
}

pub fn priority_fee_request(encoded_tx: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": "priority-transfer",
        "method": PRIORITY_FEE_METHOD,
        "params": [{
            "transaction": encoded_tx,
            "options": {
                "transactionEncoding": "base64",
                "recommended": true
            }
        }]
    })
}

pub fn parse_priority_fee_response(response: &Value) -> Option<u64> {
    let parsed: PriorityFeeResponse = match serde_json::from_value(response.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("unexpected priority fee response {response}: {e}");
            return None;
        }
    };

    if let Some(error) = parsed.error {
        log::warn!("priority fee estimate failed: {error}");
        return None;
    }

    match parsed.result.and_then(|r| r.priority_fee_estimate) {
        Some(fee) if fee.is_finite() && fee >= 0.0 => Some(fee.ceil() as u64),
        Some(fee) => {
            log::warn!("ignoring priority fee estimate {fee}");
            None
        }
        None => {
            log::warn!("priority fee response carried no estimate");
            None
        }
    }
}

use std::fmt;

use solana_client::{
    client_error::ClientErrorKind,
    rpc_request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    decode_error::DecodeError,
    instruction::InstructionError,
    message::VersionedMessage,
    system_instruction::SystemError,
    system_program,
    transaction::TransactionError,
};

use crate::errors::TransferError;

/// Diagnostics pulled out of a rejected `sendTransaction` preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightFailure {
    pub code: i64,
    pub message: String,
    pub cause: Option<String>,
    pub logs: Vec<String>,
}

impl fmt::Display for PreflightFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// Splits submission errors into preflight rejections, which are decoded,
/// and everything else, which is handed back untouched.
pub fn classify_submission_error(
    err: TransferError,
    message: &VersionedMessage,
) -> Result<PreflightFailure, TransferError> {
    let failure = match &err {
        TransferError::Rpc(client_err) => match client_err.kind() {
            ClientErrorKind::RpcError(RpcError::RpcResponseError {
                code,
                message: rpc_message,
                data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
            }) => Some(PreflightFailure {
                code: *code,
                message: rpc_message.clone(),
                cause: simulation
                    .err
                    .as_ref()
                    .map(|cause| describe_cause(cause, message)),
                logs: simulation.logs.clone().unwrap_or_default(),
            }),
            _ => None,
        },
        _ => None,
    };
    failure.ok_or(err)
}

pub fn log_preflight_failure(failure: &PreflightFailure) {
    log::error!("preflight failed {failure}");
    for line in &failure.logs {
        log::error!("  {line}");
    }
}

/// Custom errors raised by a system program instruction are mapped to the
/// system program's own message, anything else uses the runtime's text.
fn describe_cause(cause: &TransactionError, message: &VersionedMessage) -> String {
    if let TransactionError::InstructionError(index, InstructionError::Custom(code)) = cause {
        let program_id = message
            .instructions()
            .get(*index as usize)
            .and_then(|ix| message.static_account_keys().get(ix.program_id_index as usize));
        if program_id == Some(&system_program::id()) {
            if let Some(system_err) =
                <SystemError as DecodeError<SystemError>>::decode_custom_error_to_enum(*code)
            {
                return system_err.to_string();
            }
        }
    }
    cause.to_string()
}

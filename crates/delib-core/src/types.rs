use serde::{Deserialize, Serialize};
use std::fmt;

/// Re-export alloy types for convenience
pub use alloy::primitives::{Address, Bytes, B256, U256};

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: B256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub from: Address,
    pub gas_used: u64,
    pub status: TransactionStatus,
}

/// Execution status reported by a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Reverted,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Success => "success",
            TransactionStatus::Reverted => "reverted",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<bool> for TransactionStatus {
    fn from(success: bool) -> Self {
        if success {
            TransactionStatus::Success
        } else {
            TransactionStatus::Reverted
        }
    }
}

/// Which dispatch path a contract method invocation takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    /// Read-only `eth_call`
    Call,
    /// Gas estimate only
    Estimate,
    /// State-changing transaction
    Send,
}

impl fmt::Display for CallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallMode::Call => write!(f, "call"),
            CallMode::Estimate => write!(f, "estimate"),
            CallMode::Send => write!(f, "send"),
        }
    }
}

/// Result of [`crate::ContractHandle::invoke`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Value(serde_json::Value),
    Gas(u64),
    Receipt(Receipt),
}

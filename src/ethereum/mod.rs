pub mod abi;
pub mod codec;
pub mod contract;
pub mod error;
pub mod network;
pub mod poller;
pub mod provider;
pub mod revert;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

use alloy::primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// A mined transaction's receipt, extended with the decoded revert reason.
///
/// `revert_reason` is only ever set when `status` is `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub status: bool,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub gas_used: u64,
    pub logs: Vec<LogEntry>,
    pub revert_reason: Option<String>,
}

impl TransactionReceipt {
    pub fn with_revert_reason(self, reason: String) -> Self {
        Self {
            revert_reason: Some(reason),
            ..self
        }
    }
}

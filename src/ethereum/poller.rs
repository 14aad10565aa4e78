use alloy::primitives::B256;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::contract::ChainClient;
use super::error::ClientError;
use super::TransactionReceipt;

/// Fixed-interval receipt polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollStrategy {
    pub interval: Duration,
    /// Maximum number of receipt queries. 0 means poll until cancelled.
    pub max_attempts: u32,
}

impl Default for PollStrategy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 0,
        }
    }
}

impl PollStrategy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts != 0 && attempts >= self.max_attempts
    }
}

impl ChainClient {
    /// Wait until `tx_hash` is mined and return its receipt.
    ///
    /// Failed transactions are replayed to attach their revert reason. The
    /// hash leaves the pending set as soon as a receipt is retrieved.
    pub async fn await_receipt(
        &self,
        tx_hash: B256,
        cancel: &CancellationToken,
    ) -> Result<TransactionReceipt, ClientError> {
        let mut attempts = 0u32;
        let receipt = loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            attempts += 1;
            if let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? {
                break receipt;
            }

            if self.poll.exhausted(attempts) {
                return Err(ClientError::ReceiptTimeout {
                    tx_hash: tx_hash.to_string(),
                    attempts,
                });
            }

            debug!(tx_hash = %tx_hash, attempts, "receipt not available yet");
            tokio::select! {
                _ = tokio::time::sleep(self.poll.interval) => {}
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            }
        };

        self.pending.lock().await.remove(&tx_hash);

        if receipt.status {
            info!(tx_hash = %tx_hash, block = ?receipt.block_number, "transaction succeeded");
            return Ok(receipt);
        }

        warn!(tx_hash = %tx_hash, block = ?receipt.block_number, "transaction failed, resolving revert reason");
        let reason = self
            .resolver
            .revert_reason(
                &tx_hash.to_string(),
                self.history_network.as_str(),
                None,
                Some(self.provider.clone()),
            )
            .await?;
        info!(tx_hash = %tx_hash, reason = %reason, "revert reason resolved");

        Ok(receipt.with_revert_reason(reason))
    }
}

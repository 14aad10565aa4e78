//! In-memory chain used by the unit tests.

use alloy::{
    eips::BlockId,
    json_abi::JsonAbi,
    primitives::{address, Address, Bytes, B256, U256},
    rpc::types::TransactionRequest,
    sol_types::{Revert, SolError},
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::contract::ChainClient;
use super::error::{ClientError, ProviderError};
use super::network::SupportedNetwork;
use super::poller::PollStrategy;
use super::provider::{ChainStateProvider, ProviderSource};
use super::revert::RevertResolver;
use super::{LogEntry, TransactionReceipt};

pub const TOKEN_ADDRESS: Address = address!("742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e");
pub const SENDER: Address = address!("00000000000000000000000000000000000000aa");

const TOKEN_ABI: &str = r#"[
  {"type":"function","name":"totalSupply","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"balanceOf","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
  {"type":"function","name":"getReserves","inputs":[],"outputs":[{"name":"reserve","type":"uint112"},{"name":"locked","type":"bool"}],"stateMutability":"view"},
  {"type":"function","name":"burn","inputs":[{"name":"amount","type":"uint256"}],"outputs":[],"stateMutability":"nonpayable"}
]"#;

pub fn token_abi() -> JsonAbi {
    serde_json::from_str(TOKEN_ABI).unwrap()
}

pub fn tx_hash(n: u8) -> B256 {
    B256::repeat_byte(n)
}

/// ABI encoding of `Error(string)`, selector included.
pub fn revert_payload(reason: &str) -> Vec<u8> {
    Revert {
        reason: reason.to_string(),
    }
    .abi_encode()
}

/// The error a Parity node returns for a reverted `eth_call`.
pub fn parity_error(reason: &str) -> ProviderError {
    ProviderError::rpc(
        -32015,
        "VM execution error.",
        Some(format!("Reverted 0x{}", hex::encode(revert_payload(reason)))),
    )
}

/// The error a geth-style node returns for a reverted `eth_call`.
pub fn execution_reverted(reason: &str) -> ProviderError {
    ProviderError::rpc(
        3,
        "execution reverted",
        Some(format!("0x{}", hex::encode(revert_payload(reason)))),
    )
}

pub fn sample_transaction() -> TransactionRequest {
    TransactionRequest::default()
        .from(SENDER)
        .to(TOKEN_ADDRESS)
        .input(Bytes::from(vec![0x42, 0x96, 0x6c, 0x68]).into())
}

pub fn receipt(hash: B256, status: bool) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        status,
        block_number: Some(480),
        block_hash: Some(B256::repeat_byte(0xbb)),
        gas_used: 21_000,
        logs: vec![LogEntry {
            address: TOKEN_ADDRESS,
            topics: vec![B256::repeat_byte(0x01)],
            data: Bytes::new(),
        }],
        revert_reason: None,
    }
}

/// A client over `mock` that polls every millisecond, at most five times.
pub fn client(mock: Arc<MockChain>) -> ChainClient {
    ChainClient::new(
        mock.clone(),
        Arc::new(RevertResolver::new(Arc::new(StaticSource(mock)))),
        SupportedNetwork::Mainnet,
        PollStrategy::new(Duration::from_millis(1), 5),
    )
}

#[derive(Debug, Default)]
pub struct MockState {
    pub block_number: u64,
    pub call_result: Option<Result<Bytes, ProviderError>>,
    pub transactions: HashMap<B256, TransactionRequest>,
    pub receipts: VecDeque<Option<TransactionReceipt>>,
    pub receipt_error: Option<ProviderError>,
    pub balance_error: Option<ProviderError>,
    pub gas_estimate: u64,
    pub send_result: Option<Result<B256, ProviderError>>,

    pub calls: Vec<(TransactionRequest, BlockId)>,
    pub balance_queries: Vec<BlockId>,
    pub receipt_queries: usize,
    pub sent: Vec<TransactionRequest>,
}

#[derive(Debug, Default)]
pub struct MockChain {
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new(state: MockState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ChainStateProvider for MockChain {
    async fn call(&self, tx: &TransactionRequest, block: BlockId) -> Result<Bytes, ProviderError> {
        let mut state = self.state();
        state.calls.push((tx.clone(), block));
        state.call_result.clone().unwrap_or_else(|| Ok(Bytes::new()))
    }

    async fn get_transaction(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionRequest>, ProviderError> {
        Ok(self.state().transactions.get(&hash).cloned())
    }

    async fn get_transaction_receipt(
        &self,
        _hash: B256,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        let mut state = self.state();
        state.receipt_queries += 1;
        if let Some(err) = state.receipt_error.clone() {
            return Err(err);
        }
        Ok(state.receipts.pop_front().flatten())
    }

    async fn get_block_number(&self) -> Result<u64, ProviderError> {
        Ok(self.state().block_number)
    }

    async fn get_balance(&self, _address: Address, block: BlockId) -> Result<U256, ProviderError> {
        let mut state = self.state();
        state.balance_queries.push(block);
        match state.balance_error.clone() {
            Some(err) => Err(err),
            None => Ok(U256::ZERO),
        }
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64, ProviderError> {
        Ok(self.state().gas_estimate)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, ProviderError> {
        let mut state = self.state();
        state.sent.push(tx);
        state
            .send_result
            .clone()
            .unwrap_or_else(|| Ok(B256::repeat_byte(0xee)))
    }
}

/// Always hands out the same mock.
pub struct StaticSource(pub Arc<MockChain>);

impl ProviderSource for StaticSource {
    fn provider_for(
        &self,
        _network: SupportedNetwork,
    ) -> Result<Arc<dyn ChainStateProvider>, ClientError> {
        let provider: Arc<dyn ChainStateProvider> = self.0.clone();
        Ok(provider)
    }
}

/// Has no provider for any network.
pub struct NoSource;

impl ProviderSource for NoSource {
    fn provider_for(
        &self,
        network: SupportedNetwork,
    ) -> Result<Arc<dyn ChainStateProvider>, ClientError> {
        Err(ClientError::ProviderUnavailable {
            network: network.to_string(),
        })
    }
}

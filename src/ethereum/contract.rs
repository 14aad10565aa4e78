use alloy::{
    eips::BlockId,
    network::TransactionBuilder,
    primitives::{Address, B256},
    rpc::types::TransactionRequest,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::abi::ContractMethod;
use super::codec;
use super::error::ClientError;
use super::network::SupportedNetwork;
use super::poller::PollStrategy;
use super::provider::ChainStateProvider;
use super::revert::RevertResolver;

/// Invokes contract methods and tracks the transactions it submitted.
///
/// One instance is built at start-up and shared by reference; its provider
/// binding never changes afterwards.
pub struct ChainClient {
    pub(super) provider: Arc<dyn ChainStateProvider>,
    pub(super) resolver: Arc<RevertResolver>,
    pub(super) history_network: SupportedNetwork,
    pub(super) poll: PollStrategy,
    pub(super) pending: Mutex<HashSet<B256>>,
}

impl ChainClient {
    pub fn new(
        provider: Arc<dyn ChainStateProvider>,
        resolver: Arc<RevertResolver>,
        history_network: SupportedNetwork,
        poll: PollStrategy,
    ) -> Self {
        Self {
            provider,
            resolver,
            history_network,
            poll,
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// Read-only invocation of `method`.
    ///
    /// Returns `None` when the call produced no data at all.
    pub async fn call(
        &self,
        method: &ContractMethod,
        args: &[Value],
    ) -> Result<Option<Value>, ClientError> {
        let calldata = codec::encode_call(method, args)?;
        let request = TransactionRequest::default()
            .to(method.contract_address)
            .input(calldata.into());

        debug!("Calling {} on {}", method.name, method.contract_address);
        let output = self.provider.call(&request, BlockId::latest()).await?;

        if output.is_empty() {
            debug!("{} returned no data", method.name);
            return Ok(None);
        }

        let function = method.entry()?;
        codec::decode_output(function, &output).map(Some)
    }

    /// Estimate gas, submit the transaction and return its hash.
    ///
    /// The hash is recorded as pending until its receipt is retrieved.
    pub async fn send_transaction(
        &self,
        from: Address,
        method: &ContractMethod,
        args: &[Value],
    ) -> Result<B256, ClientError> {
        let calldata = codec::encode_call(method, args)?;
        let request = TransactionRequest::default()
            .from(from)
            .to(method.contract_address)
            .input(calldata.into());

        let gas = self.provider.estimate_gas(&request).await?;
        let request = request.with_gas_limit(gas);

        info!(
            method = %method.name,
            from = %from,
            to = %method.contract_address,
            gas,
            "submitting transaction"
        );
        let tx_hash = self.provider.send_transaction(request).await?;

        self.pending.lock().await.insert(tx_hash);
        info!(tx_hash = %tx_hash, "transaction submitted");
        Ok(tx_hash)
    }

    /// Hashes submitted by this client whose receipt has not been retrieved.
    pub async fn pending_transactions(&self) -> Vec<B256> {
        let mut pending: Vec<B256> = self.pending.lock().await.iter().copied().collect();
        pending.sort();
        pending
    }

    pub fn history_network(&self) -> SupportedNetwork {
        self.history_network
    }
}

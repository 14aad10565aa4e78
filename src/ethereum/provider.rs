use crate::config::{Config, NetworkConfig};
use alloy::{
    eips::BlockId,
    network::ReceiptResponse,
    primitives::{Address, Bytes, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    transports::http::{Client, Http},
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{ClientError, ProviderError};
use super::network::SupportedNetwork;
use super::{LogEntry, TransactionReceipt};

/// Read and write access to chain state, as consumed by the client.
#[async_trait]
pub trait ChainStateProvider: Send + Sync {
    /// `eth_call` at `block`, returning the raw return bytes.
    async fn call(&self, tx: &TransactionRequest, block: BlockId) -> Result<Bytes, ProviderError>;

    /// The mined transaction as a replayable request.
    async fn get_transaction(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionRequest>, ProviderError>;

    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, ProviderError>;

    async fn get_block_number(&self) -> Result<u64, ProviderError>;

    async fn get_balance(&self, address: Address, block: BlockId) -> Result<U256, ProviderError>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, ProviderError>;

    /// Submit a transaction, resolving once the node has returned its hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, ProviderError>;
}

/// Hands out a provider for a network when the caller did not inject one.
pub trait ProviderSource: Send + Sync {
    fn provider_for(
        &self,
        network: SupportedNetwork,
    ) -> Result<Arc<dyn ChainStateProvider>, ClientError>;
}

/// [`ChainStateProvider`] backed by an alloy HTTP provider.
#[derive(Debug, Clone)]
pub struct AlloyChainProvider {
    inner: RootProvider<Http<Client>>,
}

impl AlloyChainProvider {
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", rpc_url, e))?;
        Ok(Self {
            inner: ProviderBuilder::new().on_http(url),
        })
    }
}

#[async_trait]
impl ChainStateProvider for AlloyChainProvider {
    async fn call(&self, tx: &TransactionRequest, block: BlockId) -> Result<Bytes, ProviderError> {
        Ok(self.inner.call(tx).block(block).await?)
    }

    async fn get_transaction(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionRequest>, ProviderError> {
        let tx = self.inner.get_transaction_by_hash(hash).await?;
        Ok(tx.map(|tx| tx.into_request()))
    }

    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        let receipt = self.inner.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|receipt| TransactionReceipt {
            transaction_hash: receipt.transaction_hash,
            status: receipt.status(),
            block_number: receipt.block_number,
            block_hash: receipt.block_hash,
            gas_used: receipt.gas_used as u64,
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| LogEntry {
                    address: log.address(),
                    topics: log.topics().to_vec(),
                    data: log.data().data.clone(),
                })
                .collect(),
            revert_reason: None,
        }))
    }

    async fn get_block_number(&self) -> Result<u64, ProviderError> {
        Ok(self.inner.get_block_number().await?)
    }

    async fn get_balance(&self, address: Address, block: BlockId) -> Result<U256, ProviderError> {
        Ok(self.inner.get_balance(address).block_id(block).await?)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, ProviderError> {
        Ok(self.inner.estimate_gas(tx).await?)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, ProviderError> {
        let pending = self.inner.send_transaction(tx).await?;
        Ok(*pending.tx_hash())
    }
}

/// One provider per supported network, built from configuration.
pub struct ProviderManager {
    providers: HashMap<SupportedNetwork, Arc<AlloyChainProvider>>,
    default_network: SupportedNetwork,
}

impl ProviderManager {
    pub fn new(config: &Config) -> Result<Self> {
        let default_network: SupportedNetwork = config
            .default_network
            .parse()
            .map_err(|e| anyhow!("Invalid default network: {}", e))?;

        let mut providers = HashMap::new();
        for network in SupportedNetwork::ALL {
            let rpc_url = match Self::rpc_url(config, network) {
                Some(url) => url,
                None => {
                    debug!("No RPC endpoint for {}, skipping", network);
                    continue;
                }
            };
            let provider = AlloyChainProvider::connect(&rpc_url)?;
            providers.insert(network, Arc::new(provider));
        }

        if !providers.contains_key(&default_network) {
            warn!(
                "Default network {} has no RPC endpoint configured",
                default_network
            );
        }

        Ok(Self {
            providers,
            default_network,
        })
    }

    /// Configured URL, else the canonical Infura endpoint when a project id is known.
    fn rpc_url(config: &Config, network: SupportedNetwork) -> Option<String> {
        config
            .networks
            .get(network.as_str())
            .map(|network_config: &NetworkConfig| network_config.rpc_url.clone())
            .or_else(|| {
                config
                    .infura_project_id
                    .as_deref()
                    .map(|id| network.canonical_rpc_url(id))
            })
    }

    pub fn get_provider(
        &self,
        network: Option<SupportedNetwork>,
    ) -> Result<Arc<dyn ChainStateProvider>, ClientError> {
        let network = network.unwrap_or(self.default_network);
        self.providers
            .get(&network)
            .map(|provider| provider.clone() as Arc<dyn ChainStateProvider>)
            .ok_or_else(|| ClientError::ProviderUnavailable {
                network: network.to_string(),
            })
    }

    pub fn get_available_networks(&self) -> Vec<SupportedNetwork> {
        let mut networks: Vec<_> = self.providers.keys().copied().collect();
        networks.sort_by_key(|n| n.chain_id());
        networks
    }
}

impl ProviderSource for ProviderManager {
    fn provider_for(
        &self,
        network: SupportedNetwork,
    ) -> Result<Arc<dyn ChainStateProvider>, ClientError> {
        self.get_provider(Some(network))
    }
}

use anyhow::{anyhow, Result};
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    config::Config,
    ethereum::{
        abi::MethodRegistry,
        contract::ChainClient,
        provider::ProviderManager,
        revert::RevertResolver,
        utils::{self, describe_error},
    },
};

#[derive(Clone)]
pub struct RevertClientServer {
    client: Arc<ChainClient>,
    registry: Arc<MethodRegistry>,
    resolver: Arc<RevertResolver>,
    config: Arc<Config>,
    shutdown: CancellationToken,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct CallMethodRequest {
    method: String,
    args: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SendTransactionRequest {
    from: String,
    method: String,
    args: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct AwaitReceiptRequest {
    tx_hash: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct RevertReasonRequest {
    tx_hash: String,
    network: Option<String>,
    block_number: Option<u64>,
}

impl RevertClientServer {
    pub fn new(config: Config, registry: MethodRegistry) -> Result<Self> {
        let provider_manager = ProviderManager::new(&config)?;
        let provider = provider_manager
            .get_provider(None)
            .map_err(|e| anyhow!("Cannot build client: {}", e))?;
        let resolver = Arc::new(RevertResolver::new(Arc::new(provider_manager)));

        let client = Arc::new(ChainClient::new(
            provider,
            resolver.clone(),
            config.history_network()?,
            config.poll_strategy(),
        ));

        Ok(Self {
            client,
            registry: Arc::new(registry),
            resolver,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        })
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting revert-client MCP server");

        let service = self.clone().serve(stdio()).await?;

        info!("revert-client MCP server started successfully");
        let _ = service.waiting().await;
        self.shutdown.cancel();
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "Failed to serialize result".to_string())
}

#[tool(tool_box)]
impl RevertClientServer {
    #[tool(description = "List the configured contract methods")]
    async fn list_methods(&self) -> String {
        let methods: Vec<Value> = self
            .registry
            .methods()
            .map(|method| {
                serde_json::json!({
                    "name": method.name,
                    "call_signature": method.call_signature,
                    "contract_address": format!("{:?}", method.contract_address),
                })
            })
            .collect();
        to_json(&methods)
    }

    #[tool(description = "Call a configured read-only contract method")]
    async fn call_method(&self, #[tool(aggr)] request: CallMethodRequest) -> String {
        let method = match self.registry.get(&request.method) {
            Ok(method) => method,
            Err(e) => return format!("Error: {}", e),
        };
        let args = request.args.unwrap_or_default();

        match self.client.call(&method, &args).await {
            Ok(Some(result)) => to_json(&result),
            Ok(None) => "null".to_string(),
            Err(e) => {
                error!("Failed to call {}: {}", request.method, e);
                format!("Error: {}", describe_error(&e))
            }
        }
    }

    #[tool(description = "Send a transaction invoking a configured contract method from a node-managed account")]
    async fn send_transaction(&self, #[tool(aggr)] request: SendTransactionRequest) -> String {
        if !self.config.security.allow_write_operations {
            return "Error: Write operations are disabled. Use --allow-writes flag to enable transaction sending.".to_string();
        }

        let from = match utils::validate_address(&request.from) {
            Ok(from) => from,
            Err(e) => return format!("Error: {}", e),
        };
        let method = match self.registry.get(&request.method) {
            Ok(method) => method,
            Err(e) => return format!("Error: {}", e),
        };
        let args = request.args.unwrap_or_default();

        match self.client.send_transaction(from, &method, &args).await {
            Ok(tx_hash) => to_json(&serde_json::json!({ "transaction_hash": tx_hash })),
            Err(e) => {
                error!("Failed to send transaction: {}", e);
                format!("Error: {}", describe_error(&e))
            }
        }
    }

    #[tool(description = "Wait for a transaction to be mined; failed transactions include their revert reason")]
    async fn await_receipt(&self, #[tool(aggr)] request: AwaitReceiptRequest) -> String {
        let tx_hash = match utils::validate_tx_hash(&request.tx_hash) {
            Ok(tx_hash) => tx_hash,
            Err(e) => return format!("Error: {}", e),
        };

        match self.client.await_receipt(tx_hash, &self.shutdown).await {
            Ok(receipt) => to_json(&receipt),
            Err(e) => {
                error!("Failed to get receipt for {}: {}", request.tx_hash, e);
                format!("Error: {}", describe_error(&e))
            }
        }
    }

    #[tool(description = "Replay a failed transaction and decode its revert reason (mainnet, kovan, goerli, ropsten, rinkeby)")]
    async fn get_revert_reason(&self, #[tool(aggr)] request: RevertReasonRequest) -> String {
        let network = request
            .network
            .unwrap_or_else(|| self.config.default_network.clone());

        match self
            .resolver
            .revert_reason(&request.tx_hash, &network, request.block_number, None)
            .await
        {
            Ok(reason) => to_json(&serde_json::json!({ "revert_reason": reason })),
            Err(e) => {
                error!("Failed to resolve revert reason for {}: {}", request.tx_hash, e);
                format!("Error: {}", describe_error(&e))
            }
        }
    }

    #[tool(description = "List transactions submitted by this server that have not been confirmed")]
    async fn pending_transactions(&self) -> String {
        to_json(&self.client.pending_transactions().await)
    }
}

#[tool(tool_box)]
impl ServerHandler for RevertClientServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("MCP server for calling Ethereum contract methods, submitting transactions, awaiting receipts and recovering revert reasons of failed transactions.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

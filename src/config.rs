use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::ethereum::network::SupportedNetwork;
use crate::ethereum::poller::PollStrategy;

const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub networks: HashMap<String, NetworkConfig>,
    pub default_network: String,
    /// Infura project id. Fills `YOUR_API_KEY_HERE` placeholders in RPC URLs
    /// and gives networks without an entry their canonical endpoint.
    #[serde(default)]
    pub infura_project_id: Option<String>,
    pub revert: RevertConfig,
    pub polling: PollingConfig,
    pub security: SecurityConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub methods: Vec<MethodConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevertConfig {
    /// Network whose decoding rules apply to receipts that fail while polling.
    pub history_network: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// 0 polls until the request is cancelled.
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allow_write_operations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub transport: String,
}

/// A contract method exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodConfig {
    pub name: String,
    pub call_signature: String,
    pub contract_address: String,
    /// Inline ABI JSON.
    #[serde(default)]
    pub abi: Option<String>,
    #[serde(default)]
    pub abi_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let networks = SupportedNetwork::ALL
            .into_iter()
            .map(|network| {
                let explorer_url = match network {
                    SupportedNetwork::Mainnet => "https://etherscan.io".to_string(),
                    other => format!("https://{}.etherscan.io", other),
                };
                (
                    network.to_string(),
                    NetworkConfig {
                        rpc_url: network.canonical_rpc_url(API_KEY_PLACEHOLDER),
                        chain_id: network.chain_id(),
                        explorer_url: Some(explorer_url),
                    },
                )
            })
            .collect();

        Self {
            networks,
            default_network: SupportedNetwork::Mainnet.to_string(),
            infura_project_id: None,
            revert: RevertConfig {
                history_network: SupportedNetwork::Mainnet.to_string(),
            },
            polling: PollingConfig {
                interval_ms: 1000,
                max_attempts: 600,
            },
            security: SecurityConfig {
                allow_write_operations: false,
            },
            server: ServerConfig {
                transport: "stdio".to_string(),
            },
            methods: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_api_key(std::env::var("INFURA_API_KEY").ok());
        config
    }

    /// Substitute the Infura project id into placeholder RPC URLs.
    ///
    /// `INFURA_API_KEY` takes precedence over `infura_project_id`.
    fn apply_api_key(&mut self, api_key: Option<String>) {
        if api_key.is_some() {
            tracing::info!("Using INFURA_API_KEY environment variable for RPC URLs");
        }
        match api_key.or_else(|| self.infura_project_id.clone()) {
            Some(api_key) => {
                for (network_name, network_config) in &mut self.networks {
                    if network_config.rpc_url.contains(API_KEY_PLACEHOLDER) {
                        network_config.rpc_url =
                            network_config.rpc_url.replace(API_KEY_PLACEHOLDER, &api_key);
                        tracing::debug!("Updated {} RPC URL with API key", network_name);
                    }
                }
                self.infura_project_id.get_or_insert(api_key);
            }
            None => {
                for (network_name, network_config) in &self.networks {
                    if network_config.rpc_url.contains(API_KEY_PLACEHOLDER) {
                        tracing::warn!(
                            "RPC endpoint for {} still contains a placeholder, set INFURA_API_KEY or infura_project_id",
                            network_name
                        );
                    }
                }
            }
        }
    }

    pub fn history_network(&self) -> Result<SupportedNetwork> {
        self.revert
            .history_network
            .parse()
            .map_err(|e| anyhow!("Invalid revert.history_network: {}", e))
    }

    pub fn poll_strategy(&self) -> PollStrategy {
        PollStrategy::new(
            Duration::from_millis(self.polling.interval_ms),
            self.polling.max_attempts,
        )
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("revert-client").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# revert-client configuration file

# Network used when no network is specified
default_network = "mainnet"

# Networks without an entry below use https://<network>.infura.io/v3/<id>
# infura_project_id = "YOUR_API_KEY_HERE"

[networks.mainnet]
rpc_url = "https://mainnet.infura.io/v3/YOUR_API_KEY_HERE"
chain_id = 1
explorer_url = "https://etherscan.io"

[networks.kovan]
# Kovan revert reasons need a node exposing the Parity trace methods
rpc_url = "https://kovan.infura.io/v3/YOUR_API_KEY_HERE"
chain_id = 42
explorer_url = "https://kovan.etherscan.io"

[networks.goerli]
rpc_url = "https://goerli.infura.io/v3/YOUR_API_KEY_HERE"
chain_id = 5
explorer_url = "https://goerli.etherscan.io"

[revert]
# Decoding rules applied to transactions that fail while awaiting a receipt
history_network = "mainnet"

[polling]
interval_ms = 1000
max_attempts = 600  # 0 = poll until cancelled

[security]
allow_write_operations = false

[server]
transport = "stdio"

# Contract methods exposed to callers
[[methods]]
name = "balanceOf"
call_signature = "balanceOf(address)"
contract_address = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
abi = '[{"type":"function","name":"balanceOf","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}]'
# An ABI file can be used instead of inline JSON:
# abi_path = "abis/dai.json"

[[methods]]
name = "totalSupply"
call_signature = "totalSupply()"
contract_address = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
abi = '[{"type":"function","name":"totalSupply","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}]'

# Environment variables that can be used:
# INFURA_API_KEY - Your Infura project id (replaces YOUR_API_KEY_HERE above)
"#;
        sample_config.to_string()
    }
}

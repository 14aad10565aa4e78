use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ClientError;

/// Networks the revert resolution engine knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedNetwork {
    Mainnet,
    Kovan,
    Goerli,
    Ropsten,
    Rinkeby,
}

impl SupportedNetwork {
    pub const ALL: [SupportedNetwork; 5] = [
        Self::Mainnet,
        Self::Kovan,
        Self::Goerli,
        Self::Ropsten,
        Self::Rinkeby,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Kovan => "kovan",
            Self::Goerli => "goerli",
            Self::Ropsten => "ropsten",
            Self::Rinkeby => "rinkeby",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Mainnet => 1,
            Self::Ropsten => 3,
            Self::Rinkeby => 4,
            Self::Goerli => 5,
            Self::Kovan => 42,
        }
    }

    /// Canonical Infura endpoint for this network.
    pub fn canonical_rpc_url(&self, project_id: &str) -> String {
        format!("https://{}.infura.io/v3/{}", self.as_str(), project_id)
    }

    /// Kovan is served by Parity/OpenEthereum nodes, which report revert data
    /// inside the JSON-RPC error object instead of the call result.
    pub fn reports_revert_in_error(&self) -> bool {
        matches!(self, Self::Kovan)
    }
}

impl fmt::Display for SupportedNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportedNetwork {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|network| network.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|n| n.as_str()).collect();
                ClientError::InvalidInput(format!(
                    "unsupported network '{}'. Supported networks: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

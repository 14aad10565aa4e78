use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tokio::fs;
use tracing::{debug, info, warn};

use super::error::ClientError;
use super::utils;
use crate::config::MethodConfig;

/// Finds the ABI entry named `name`.
///
/// A linear scan over a small, fixed ABI.
pub fn resolve<'a>(name: &str, abi: &'a JsonAbi) -> Result<&'a Function, ClientError> {
    abi.functions()
        .find(|f| f.name == name)
        .ok_or_else(|| ClientError::NotFound {
            name: name.to_string(),
            available: abi.functions().map(|f| f.name.clone()).collect(),
        })
}

/// A contract method as configured by the embedding application.
#[derive(Debug)]
pub struct ContractMethod {
    pub name: String,
    pub call_signature: String,
    pub contract_address: Address,
    pub abi: JsonAbi,
    resolved: OnceLock<Function>,
}

impl ContractMethod {
    pub fn new(
        name: impl Into<String>,
        call_signature: impl Into<String>,
        contract_address: Address,
        abi: JsonAbi,
    ) -> Self {
        Self {
            name: name.into(),
            call_signature: call_signature.into(),
            contract_address,
            abi,
            resolved: OnceLock::new(),
        }
    }

    /// The ABI entry matching `name`, resolved on first use.
    pub fn entry(&self) -> Result<&Function, ClientError> {
        if let Some(function) = self.resolved.get() {
            return Ok(function);
        }
        let function = resolve(&self.name, &self.abi)?.clone();
        Ok(self.resolved.get_or_init(|| function))
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

/// Configured methods keyed by name.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: BTreeMap<String, Arc<ContractMethod>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configuration entries, reading ABI files as needed.
    pub async fn load(entries: &[MethodConfig]) -> Result<Self> {
        let mut registry = Self::new();
        for entry in entries {
            let method = Self::load_method(entry).await?;
            registry.insert(method);
        }
        info!("Loaded {} contract methods", registry.methods.len());
        Ok(registry)
    }

    async fn load_method(entry: &MethodConfig) -> Result<ContractMethod> {
        let contract_address = utils::validate_address(&entry.contract_address)
            .map_err(|e| anyhow!("Method '{}': {}", entry.name, e))?;

        let abi = match (&entry.abi, &entry.abi_path) {
            (Some(inline), _) => parse_abi(inline)
                .map_err(|e| anyhow!("Method '{}': {}", entry.name, e))?,
            (None, Some(path)) => load_abi_file(path)
                .await
                .map_err(|e| anyhow!("Method '{}': {}", entry.name, e))?,
            (None, None) => {
                return Err(anyhow!(
                    "Method '{}' needs either an inline 'abi' or an 'abi_path'",
                    entry.name
                ))
            }
        };

        let method = ContractMethod::new(
            entry.name.clone(),
            entry.call_signature.clone(),
            contract_address,
            abi,
        );

        // The entry itself is resolved on first use.
        if method.abi.functions().all(|f| f.name != method.name) {
            warn!(
                "Method '{}' is not in its ABI; only zero-argument calls without output decoding will work",
                method.name
            );
        }

        Ok(method)
    }

    pub fn insert(&mut self, method: ContractMethod) {
        debug!("Registered method {} at {}", method.name, method.contract_address);
        self.methods.insert(method.name.clone(), Arc::new(method));
    }

    pub fn get(&self, name: &str) -> Result<Arc<ContractMethod>, ClientError> {
        self.methods
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                name: name.to_string(),
                available: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Arc<ContractMethod>> {
        self.methods.values()
    }
}

fn parse_abi(content: &str) -> Result<JsonAbi> {
    serde_json::from_str(content).map_err(|e| anyhow!("Failed to parse ABI JSON: {}", e))
}

async fn load_abi_file(path: &Path) -> Result<JsonAbi> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("Failed to read ABI file {:?}: {}", path, e))?;
    parse_abi(&content)
}

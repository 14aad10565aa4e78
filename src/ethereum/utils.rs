use alloy::primitives::{Address, B256};
use std::str::FromStr;

use super::error::ClientError;

/// Validates and normalizes an Ethereum address
pub fn validate_address(address: &str) -> Result<Address, ClientError> {
    let address = address.trim();

    if address.is_empty() {
        return Err(ClientError::InvalidInput(
            "address cannot be empty".to_string(),
        ));
    }

    let hex_part = strip_hex_prefix(address).ok_or_else(|| {
        ClientError::InvalidInput(format!(
            "invalid address format: '{}'. Ethereum addresses must start with '0x'",
            address
        ))
    })?;

    if hex_part.len() != 40 {
        return Err(ClientError::InvalidInput(format!(
            "invalid address length: '{}'. Ethereum addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        )));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ClientError::InvalidInput(format!(
            "invalid address format: '{}'. Contains non-hexadecimal characters",
            address
        )));
    }

    Address::from_str(address).map_err(|e| {
        ClientError::InvalidInput(format!("invalid Ethereum address '{}': {}", address, e))
    })
}

/// Validates a transaction hash: `0x` followed by exactly 64 hex characters.
pub fn validate_tx_hash(tx_hash: &str) -> Result<B256, ClientError> {
    let invalid = || {
        ClientError::InvalidInput(format!(
            "invalid transaction hash '{}'. Expected 0x followed by 64 hexadecimal characters",
            tx_hash
        ))
    };

    let hex_part = tx_hash.strip_prefix("0x").ok_or_else(invalid)?;
    if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    B256::from_str(tx_hash).map_err(|_| invalid())
}

fn strip_hex_prefix(value: &str) -> Option<&str> {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
}

/// Creates user-friendly error messages for common RPC errors
pub fn interpret_rpc_error(error: &str) -> String {
    if error.contains("execution reverted") {
        "The contract function reverted execution. This usually means the function's requirements were not met or an assertion failed.".to_string()
    } else if error.contains("insufficient funds") {
        "Insufficient funds to cover gas costs. Make sure the sending account has enough ETH for gas fees.".to_string()
    } else if error.contains("unknown account") || error.contains("authentication needed") {
        "The node does not manage the 'from' account. Unlock the account on the node or use a provider that can sign for it.".to_string()
    } else if error.contains("nonce too low") {
        "Nonce too low. Another transaction was already mined with this nonce.".to_string()
    } else if error.contains("connection refused") || error.contains("network unreachable") {
        "Cannot connect to RPC endpoint. Check your internet connection and RPC URL configuration.".to_string()
    } else if error.contains("timeout") {
        "Request timed out. The RPC endpoint may be overloaded or unreachable.".to_string()
    } else if error.contains("rate limit") {
        "Too many requests to the RPC endpoint. Try again in a few moments or use a different endpoint.".to_string()
    } else if error.contains("method not found") {
        "The requested method is not supported by this RPC endpoint. Try using a different endpoint.".to_string()
    } else {
        error.to_string()
    }
}

/// Renders a client error for display, expanding raw RPC failures into hints.
pub fn describe_error(error: &ClientError) -> String {
    match error {
        ClientError::Provider(inner) => {
            format!("RPC error: {}", interpret_rpc_error(&inner.to_string()))
        }
        other => other.to_string(),
    }
}

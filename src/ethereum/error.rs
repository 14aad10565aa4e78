//! Error types for the chain client.

use alloy::transports::TransportError;
use thiserror::Error;

/// Infura's "missing archive data" error code, returned by pruning nodes when
/// state older than their retention window is requested.
pub const MISSING_ARCHIVE_DATA_CODE: i64 = -32002;

/// A failure reported by a chain-state provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        /// The error's `data` member. JSON strings are unquoted, anything
        /// else is kept as raw JSON text.
        data: Option<String>,
    },

    /// The request never produced a JSON-RPC error object (connection,
    /// serialization, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    pub fn rpc(code: i64, message: impl Into<String>, data: Option<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            Self::Transport(_) => None,
        }
    }

    pub fn data(&self) -> Option<&str> {
        match self {
            Self::Rpc { data, .. } => data.as_deref(),
            Self::Transport(_) => None,
        }
    }

    /// Returns `true` if the node refused the request because it does not
    /// retain the historical state that was asked for.
    pub fn is_missing_archive_data(&self) -> bool {
        match self {
            Self::Rpc { code, message, .. } => {
                *code == MISSING_ARCHIVE_DATA_CODE
                    || message.to_lowercase().contains("missing trie node")
            }
            Self::Transport(_) => false,
        }
    }
}

impl From<TransportError> for ProviderError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => Self::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
                data: payload
                    .data
                    .as_ref()
                    .map(|raw| error_data_text(raw.get())),
            },
            None => Self::Transport(err.to_string()),
        }
    }
}

fn error_data_text(raw: &str) -> String {
    serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.to_string())
}

/// Errors surfaced by the client, the method registry and the revert
/// resolution engine.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The method name is not present in the ABI (or the registry).
    #[error("method '{name}' not found{}", available_suffix(.available))]
    NotFound {
        name: String,
        available: Vec<String>,
    },

    /// Malformed transaction hash, unsupported network or similar.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The kovan provider does not expose Parity's revert data.
    #[error(
        "provider for '{network}' does not expose Parity trace data; use a provider that supports the Parity trace methods"
    )]
    UnsupportedProvider { network: String },

    /// The requested block has not been produced yet.
    #[error("block {requested} has not happened yet (current block is {current})")]
    FutureBlock { requested: u64, current: u64 },

    /// The requested block is outside the pruning window of a non-archive node.
    #[error("block {block} is older than the pruning window of the provider; an archive node is required")]
    ArchiveRequired { block: u64 },

    /// Replay or decoding failed for a reason not classified above.
    #[error("unable to decode revert reason: {0}")]
    DecodeFailure(String),

    /// The ABI entry cannot be used to decode a result.
    #[error("schema error: {0}")]
    Schema(String),

    /// Arguments could not be encoded against the ABI entry.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// No provider could be built for the network.
    #[error("no provider available for network '{network}'")]
    ProviderUnavailable { network: String },

    /// The receipt did not appear within the polling budget.
    #[error("receipt for {tx_hash} not available after {attempts} attempts")]
    ReceiptTimeout { tx_hash: String, attempts: u32 },

    /// The wait was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Transport failure, propagated verbatim.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ClientError {
    pub fn decode_failure(reason: impl std::fmt::Display) -> Self {
        Self::DecodeFailure(reason.to_string())
    }

    /// Returns `true` for the failures a caller can explain to an end user
    /// and give up on gracefully.
    pub fn is_explainable(&self) -> bool {
        matches!(self, Self::DecodeFailure(_) | Self::ArchiveRequired { .. })
    }
}

fn available_suffix(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(". Available: {}", available.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::json_rpc::{ErrorPayload, RpcError};
    use serde_json::value::RawValue;

    fn error_response(code: i64, message: &'static str, data: Option<&str>) -> TransportError {
        RpcError::ErrorResp(ErrorPayload {
            code,
            message: message.into(),
            data: data.map(|raw| RawValue::from_string(raw.to_string()).unwrap()),
        })
    }

    #[test]
    fn string_error_data_is_unquoted() {
        let err = ProviderError::from(error_response(
            -32015,
            "VM execution error.",
            Some("\"Reverted 0x08c379a0\""),
        ));
        assert_eq!(err.code(), Some(-32015));
        assert_eq!(err.data(), Some("Reverted 0x08c379a0"));
        assert_eq!(err.data().and_then(|d| d.get(9..)), Some("0x08c379a0"));
        assert!(!err.is_missing_archive_data());

        let err = ProviderError::from(error_response(
            3,
            "execution reverted",
            Some("\"0x08c3\""),
        ));
        assert_eq!(err.code(), Some(3));
        assert_eq!(err.data(), Some("0x08c3"));
    }

    #[test]
    fn non_string_error_data_is_kept_as_json() {
        let err = ProviderError::from(error_response(
            -32002,
            "missing archive data",
            Some(r#"{"block":"0x10"}"#),
        ));
        assert_eq!(err.code(), Some(-32002));
        assert_eq!(err.data(), Some(r#"{"block":"0x10"}"#));
        assert!(err.is_missing_archive_data());

        let err = ProviderError::from(error_response(-32000, "missing trie node 0xab", None));
        assert_eq!(err.data(), None);
        assert!(err.is_missing_archive_data());
    }

    #[test]
    fn transport_failures_have_no_code() {
        let err: TransportError = RpcError::NullResp;
        let err = ProviderError::from(err);
        assert!(matches!(err, ProviderError::Transport(_)));
        assert_eq!(err.code(), None);
        assert_eq!(err.data(), None);
    }

    #[test]
    fn archive_error_detection() {
        assert!(ProviderError::rpc(-32002, "header not found", None).is_missing_archive_data());
        assert!(
            ProviderError::rpc(-32000, "Missing trie node abc (path )", None)
                .is_missing_archive_data()
        );
        assert!(!ProviderError::rpc(-32000, "execution reverted", None).is_missing_archive_data());
        assert!(!ProviderError::Transport("connection refused".into()).is_missing_archive_data());
    }

    #[test]
    fn explainable_kinds() {
        assert!(ClientError::decode_failure("bad hex").is_explainable());
        assert!(ClientError::ArchiveRequired { block: 1 }.is_explainable());
        assert!(!ClientError::InvalidInput("x".into()).is_explainable());
        assert!(!ClientError::FutureBlock {
            requested: 2,
            current: 1
        }
        .is_explainable());
    }

    #[test]
    fn not_found_lists_available_methods() {
        let err = ClientError::NotFound {
            name: "mint".into(),
            available: vec!["burn".into(), "transfer".into()],
        };
        assert_eq!(
            err.to_string(),
            "method 'mint' not found. Available: burn, transfer"
        );

        let err = ClientError::NotFound {
            name: "mint".into(),
            available: vec![],
        };
        assert_eq!(err.to_string(), "method 'mint' not found");
    }
}

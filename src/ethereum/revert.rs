//! Revert reason recovery.
//!
//! A failed transaction is replayed as an `eth_call` against the chain state
//! at (or near) its original block, and the returned `Error(string)` payload
//! is decoded:
//!
//! ```text
//! 0x08c379a0                      selector
//! 0000...0020                     offset of the string (32 bytes)
//! 0000...0014                     string length (32 bytes)
//! 496e73756666...000000           UTF-8 data, right-padded to 32 bytes
//! ```
//!
//! Current geth-style nodes make the call fail with "execution reverted" and
//! return the payload as hex in the JSON-RPC error's `data` member.
//! Parity/OpenEthereum nodes (kovan) put it there as `"Reverted 0x..."`.

use alloy::eips::BlockId;
use alloy::primitives::{Address, B256};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{ClientError, ProviderError};
use super::network::SupportedNetwork;
use super::provider::{ChainStateProvider, ProviderSource};
use super::utils;

/// Non-archive nodes typically keep this many recent blocks of state.
pub const ARCHIVE_WINDOW: u64 = 128;

/// Length of the `"Reverted "` marker in front of Parity's revert data.
const PARITY_REVERT_PREFIX_LEN: usize = 9;

const SELECTOR_HEX_LEN: usize = 8;
const WORD_HEX_LEN: usize = 64;
const LENGTH_WORD_HEX_START: usize = SELECTOR_HEX_LEN + WORD_HEX_LEN;
const HEADER_HEX_LEN: usize = SELECTOR_HEX_LEN + 2 * WORD_HEX_LEN;

/// Block to replay against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoricalBlock {
    #[default]
    Latest,
    Number(u64),
}

impl HistoricalBlock {
    pub fn block_id(&self) -> BlockId {
        match self {
            Self::Latest => BlockId::latest(),
            Self::Number(n) => BlockId::number(*n),
        }
    }
}

impl From<Option<u64>> for HistoricalBlock {
    fn from(block: Option<u64>) -> Self {
        block.map_or(Self::Latest, Self::Number)
    }
}

/// How a network family surfaces and encodes revert data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertDecoder {
    /// `eth_call` returns the revert payload as its result.
    Standard,
    /// `eth_call` fails; the payload sits in the error's `data` member.
    Parity,
}

impl RevertDecoder {
    pub fn for_network(network: SupportedNetwork) -> Self {
        if network.reports_revert_in_error() {
            Self::Parity
        } else {
            Self::Standard
        }
    }

    /// Whether the provider's support for this format can only be found
    /// out by replaying once.
    pub fn requires_capability_probe(&self) -> bool {
        matches!(self, Self::Parity)
    }

    /// Re-execute the transaction at `block` and return the revert payload
    /// as `0x`-prefixed hex.
    pub async fn replay(
        &self,
        provider: &dyn ChainStateProvider,
        tx_hash: B256,
        block: BlockId,
    ) -> Result<String, ClientError> {
        let tx = provider.get_transaction(tx_hash).await?.ok_or_else(|| {
            ClientError::decode_failure(format!("transaction {} not found", tx_hash))
        })?;

        match (self, provider.call(&tx, block).await) {
            (_, Ok(output)) => Ok(format!("0x{}", hex::encode(&output))),
            (Self::Parity, Err(err)) => parity_revert_data(&err)
                .map(str::to_string)
                .ok_or_else(|| {
                    ClientError::decode_failure(format!("no revert data in error: {}", err))
                }),
            (Self::Standard, Err(err)) => match standard_revert_data(&err) {
                Some(data) => Ok(data.to_string()),
                None => Err(err.into()),
            },
        }
    }

    /// Decode a hex `Error(string)` payload into its message.
    pub fn decode(&self, code: &str) -> Result<String, ClientError> {
        let hex = code.strip_prefix("0x").unwrap_or(code);
        match self {
            Self::Standard => {
                let data = hex.get(HEADER_HEX_LEN..).unwrap_or_default();
                hex_to_utf8(data.trim_end_matches('0'))
            }
            Self::Parity => {
                if hex.is_empty() {
                    return Ok(String::new());
                }
                let length = string_length(slice_clamped(
                    hex,
                    LENGTH_WORD_HEX_START,
                    HEADER_HEX_LEN,
                ))?;
                let end = HEADER_HEX_LEN.saturating_add(length.saturating_mul(2));
                hex_to_utf8(slice_clamped(hex, HEADER_HEX_LEN, end))
            }
        }
    }
}

fn parity_revert_data(err: &ProviderError) -> Option<&str> {
    err.data().and_then(|data| data.get(PARITY_REVERT_PREFIX_LEN..))
}

/// geth-style nodes fail the call ("execution reverted", code 3) and return
/// the payload as hex in the error's `data` member.
fn standard_revert_data(err: &ProviderError) -> Option<&str> {
    err.data().filter(|data| {
        data.strip_prefix("0x")
            .is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
    })
}

fn slice_clamped(s: &str, start: usize, end: usize) -> &str {
    let end = end.min(s.len());
    s.get(start.min(end)..end).unwrap_or_default()
}

fn string_length(word: &str) -> Result<usize, ClientError> {
    let digits = word.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    if digits.len() > 16 {
        return Err(ClientError::decode_failure("string length out of range"));
    }
    usize::from_str_radix(digits, 16)
        .map_err(|e| ClientError::decode_failure(format!("invalid string length: {}", e)))
}

/// Odd-length input gets one trailing zero nibble.
fn hex_to_utf8(hex: &str) -> Result<String, ClientError> {
    let mut hex = hex.to_string();
    if hex.len() % 2 == 1 {
        hex.push('0');
    }
    let bytes = hex::decode(&hex)
        .map_err(|e| ClientError::decode_failure(format!("invalid hex: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ClientError::decode_failure(format!("invalid UTF-8: {}", e)))
}

/// Failures while replaying or decoding are reported as `DecodeFailure`.
fn as_decode_failure(err: ClientError) -> ClientError {
    match err {
        ClientError::DecodeFailure(_) => err,
        other => ClientError::decode_failure(other),
    }
}

/// Recovers revert reasons for failed transactions.
pub struct RevertResolver {
    source: Arc<dyn ProviderSource>,
}

impl RevertResolver {
    pub fn new(source: Arc<dyn ProviderSource>) -> Self {
        Self { source }
    }

    /// Replay `tx_hash` on `network` and decode its revert reason.
    ///
    /// `block` defaults to the latest block. When `provider` is `None` the
    /// provider source supplies one for the network.
    pub async fn revert_reason(
        &self,
        tx_hash: &str,
        network: &str,
        block: Option<u64>,
        provider: Option<Arc<dyn ChainStateProvider>>,
    ) -> Result<String, ClientError> {
        let network = network.to_lowercase();
        let block = HistoricalBlock::from(block);

        let hash = utils::validate_tx_hash(tx_hash)?;
        let network: SupportedNetwork = network.parse()?;

        let provider = match provider {
            Some(provider) => provider,
            None => self.source.provider_for(network)?,
        };
        let decoder = RevertDecoder::for_network(network);
        debug!(tx_hash = %hash, %network, ?block, ?decoder, "resolving revert reason");

        if decoder.requires_capability_probe() {
            // The probe's output is discarded; the replay below runs again.
            if let Err(e) = decoder.replay(&*provider, hash, block.block_id()).await {
                warn!(%network, error = %e, "provider failed the Parity revert data probe");
                return Err(ClientError::UnsupportedProvider {
                    network: network.to_string(),
                });
            }
        }

        if let HistoricalBlock::Number(requested) = block {
            check_block_availability(&*provider, requested).await?;
        }

        let code = decoder
            .replay(&*provider, hash, block.block_id())
            .await
            .map_err(as_decode_failure)?;
        debug!(tx_hash = %hash, %code, "replay returned revert payload");

        decoder.decode(&code).map_err(as_decode_failure)
    }
}

async fn check_block_availability(
    provider: &dyn ChainStateProvider,
    requested: u64,
) -> Result<(), ClientError> {
    let current = provider.get_block_number().await?;
    if requested >= current {
        return Err(ClientError::FutureBlock { requested, current });
    }

    if current - requested > ARCHIVE_WINDOW {
        debug!(requested, current, "block outside pruning window, probing for archive state");
        match provider
            .get_balance(Address::ZERO, BlockId::number(requested))
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_missing_archive_data() => {
                return Err(ClientError::ArchiveRequired { block: requested })
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

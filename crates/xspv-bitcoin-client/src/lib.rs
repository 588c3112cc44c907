//! Bitcoin RPC client for fetching the blocks, headers and transactions a
//! deposit proof is assembled from, with retry logic.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bitcoin::block::Header as BlockHeader;
use bitcoin::consensus::Decodable;
use bitcoin::{Block, BlockHash, Transaction, Txid};
use bitcoincore_rpc_json::GetBlockHeaderResult;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HeaderMap, HeaderValue, HttpClient};
use jsonrpsee::rpc_params;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Error types for Bitcoin RPC client operations
#[derive(Error, Debug)]
pub enum BitcoinClientError {
    /// RPC client errors
    #[error("RPC client error: {0}")]
    RpcClient(#[from] jsonrpsee::core::client::Error),
    /// Invalid HTTP header value
    #[error("Invalid HTTP header value")]
    InvalidHeader,
    /// Failed to decode hex response
    #[error("Failed to decode hex response: {0}")]
    HexDecode(#[from] hex::FromHexError),
    /// Failed to deserialize Bitcoin consensus data
    #[error("Failed to deserialize Bitcoin data: {0}")]
    BitcoinDeserialization(#[from] bitcoin::consensus::encode::Error),
    /// Transaction is known to the node but not mined yet
    #[error("Transaction {0} is not in a block")]
    Unconfirmed(Txid),
}

/// Default HTTP request timeout
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Subset of the verbose `getrawtransaction` response
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransactionInfo {
    /// Serialized transaction, with witness data if it has any
    pub hex: String,
    /// Containing block, absent while the transaction sits in the mempool
    pub blockhash: Option<BlockHash>,
}

/// Chain data needed to build a deposit proof.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait ProofSource: Send + Sync {
    /// Transaction and the hash of the block it was mined in.
    ///
    /// Without a block hash hint the node needs `-txindex`.
    async fn transaction(
        &self,
        txid: Txid,
        block_hash: Option<BlockHash>,
    ) -> Result<(Transaction, BlockHash), BitcoinClientError>;

    /// Full block with all its transactions
    async fn block(&self, hash: BlockHash) -> Result<Block, BitcoinClientError>;

    async fn block_header(&self, hash: BlockHash) -> Result<BlockHeader, BitcoinClientError>;

    /// Hash of the block built on `hash` in the active chain, if any
    async fn next_block_hash(&self, hash: BlockHash)
        -> Result<Option<BlockHash>, BitcoinClientError>;
}

/// Bitcoin RPC client
pub struct BitcoinClient {
    client: HttpClient,
    backoff: backoff::ExponentialBackoff,
}

impl BitcoinClient {
    /// Create a new Bitcoin RPC client with default retry settings (exponential backoff)
    pub fn new(url: String, userpwd: Option<String>) -> Result<Self, BitcoinClientError> {
        let mut headers = HeaderMap::new();
        if let Some(userpwd) = userpwd {
            let creds = general_purpose::STANDARD.encode(userpwd);
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&format!("Basic {creds}"))
                    .map_err(|_| BitcoinClientError::InvalidHeader)?,
            );
        };

        let client = HttpClient::builder()
            .set_headers(headers)
            .request_timeout(HTTP_REQUEST_TIMEOUT)
            .build(url)?;

        Ok(Self {
            client,
            backoff: backoff::ExponentialBackoff::default(),
        })
    }

    async fn request_decode<T: Decodable>(
        &self,
        method: &str,
        params: ArrayParams,
    ) -> Result<T, BitcoinClientError> {
        request_with_retry(self.backoff.clone(), || async {
            let res_hex: String = self.client.request(method, params.clone()).await?;
            decode_hex(&res_hex)
        })
        .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: ArrayParams,
    ) -> Result<T, BitcoinClientError> {
        request_with_retry(self.backoff.clone(), || async {
            self.client
                .request(method, params.clone())
                .await
                .map_err(Into::into)
        })
        .await
    }

    /// Get block header by hash
    pub async fn get_block_header(
        &self,
        hash: &BlockHash,
    ) -> Result<BlockHeader, BitcoinClientError> {
        self.request_decode("getblockheader", rpc_params![hash.to_string(), false])
            .await
    }

    /// Get block header by hash with extended data
    pub async fn get_block_header_ex(
        &self,
        hash: &BlockHash,
    ) -> Result<GetBlockHeaderResult, BitcoinClientError> {
        self.request("getblockheader", rpc_params![hash.to_string(), true])
            .await
    }

    /// Get serialized block by hash
    pub async fn get_block(&self, hash: &BlockHash) -> Result<Block, BitcoinClientError> {
        self.request_decode("getblock", rpc_params![hash.to_string(), 0])
            .await
    }

    /// Get transaction by txid along with the hash of its block
    pub async fn get_raw_transaction_info(
        &self,
        txid: &Txid,
        block_hash: Option<&BlockHash>,
    ) -> Result<RawTransactionInfo, BitcoinClientError> {
        let params = match block_hash {
            Some(hash) => rpc_params![txid.to_string(), true, hash.to_string()],
            None => rpc_params![txid.to_string(), true],
        };
        self.request("getrawtransaction", params).await
    }
}

#[async_trait]
impl ProofSource for BitcoinClient {
    async fn transaction(
        &self,
        txid: Txid,
        block_hash: Option<BlockHash>,
    ) -> Result<(Transaction, BlockHash), BitcoinClientError> {
        let info = self
            .get_raw_transaction_info(&txid, block_hash.as_ref())
            .await?;
        let block_hash = info
            .blockhash
            .ok_or(BitcoinClientError::Unconfirmed(txid))?;
        debug!("Transaction {} found in block {}", txid, block_hash);
        Ok((decode_hex(&info.hex)?, block_hash))
    }

    async fn block(&self, hash: BlockHash) -> Result<Block, BitcoinClientError> {
        self.get_block(&hash).await
    }

    async fn block_header(&self, hash: BlockHash) -> Result<BlockHeader, BitcoinClientError> {
        self.get_block_header(&hash).await
    }

    async fn next_block_hash(
        &self,
        hash: BlockHash,
    ) -> Result<Option<BlockHash>, BitcoinClientError> {
        Ok(self.get_block_header_ex(&hash).await?.next_block_hash)
    }
}

fn decode_hex<T: Decodable>(res_hex: &str) -> Result<T, BitcoinClientError> {
    let res_bytes = hex::decode(res_hex)?;
    bitcoin::consensus::deserialize(&res_bytes).map_err(Into::into)
}

/// Execute a request with retry logic using exponential backoff
/// Only retries on unexpected HTTP errors (not 200 OK or 400 Bad Request)
async fn request_with_retry<F, Fut, T>(
    backoff: backoff::ExponentialBackoff,
    operation: F,
) -> Result<T, BitcoinClientError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, BitcoinClientError>>,
{
    use backoff::{future::retry_notify, Error};

    retry_notify(
        backoff,
        || async {
            operation().await.map_err(|err| {
                if is_retryable_error(&err) {
                    Error::transient(err)
                } else {
                    Error::permanent(err)
                }
            })
        },
        |err, duration| {
            info!("Request failed, retrying in {:?}: {}", duration, err);
        },
    )
    .await
}

/// Only transport-level failures are retried; JSON-RPC errors and decoding
/// failures are final
fn is_retryable_error(err: &BitcoinClientError) -> bool {
    use jsonrpsee::core::client::Error as RpcError;
    matches!(
        err,
        BitcoinClientError::RpcClient(
            RpcError::Transport(_)
                | RpcError::RequestTimeout
                | RpcError::RestartNeeded(_)
                | RpcError::ServiceDisconnect
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::blockdata::constants::genesis_block;
    use bitcoin::Network;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_raw_transaction_info_ignores_extra_fields() {
        let json = r#"{
            "txid": "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            "hex": "00",
            "blockhash": "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
            "confirmations": 900000
        }"#;
        let info: RawTransactionInfo = serde_json::from_str(json).unwrap();
        assert_eq!(
            info.blockhash,
            Some(genesis_block(Network::Bitcoin).block_hash())
        );

        let mempool: RawTransactionInfo = serde_json::from_str(r#"{"hex": "00"}"#).unwrap();
        assert!(mempool.blockhash.is_none());
    }

    #[test]
    fn test_decode_hex_block() {
        let genesis = genesis_block(Network::Bitcoin);
        let hex_block = hex::encode(bitcoin::consensus::serialize(&genesis));
        let decoded: Block = decode_hex(&hex_block).unwrap();
        assert_eq!(decoded, genesis);
        assert!(matches!(
            decode_hex::<Block>("zz"),
            Err(BitcoinClientError::HexDecode(_))
        ));
    }

    #[test]
    fn test_retryable_errors() {
        use jsonrpsee::core::client::Error as RpcError;
        assert!(is_retryable_error(&BitcoinClientError::RpcClient(
            RpcError::RequestTimeout
        )));
        assert!(!is_retryable_error(&BitcoinClientError::InvalidHeader));
        assert!(!is_retryable_error(&BitcoinClientError::HexDecode(
            hex::FromHexError::OddLength
        )));
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = request_with_retry(backoff::ExponentialBackoff::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BitcoinClientError::InvalidHeader) }
        })
        .await;
        assert!(matches!(result, Err(BitcoinClientError::InvalidHeader)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        use jsonrpsee::core::client::Error as RpcError;
        let calls = AtomicUsize::new(0);
        let backoff = backoff::ExponentialBackoff {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            ..Default::default()
        };
        let result = request_with_retry(backoff, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(BitcoinClientError::RpcClient(RpcError::RequestTimeout))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
    }
}

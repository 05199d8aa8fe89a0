use crate::api::CoreApiClient;
use crate::error::{Error, Result};
use crate::types::{Block, Transaction};
use crate::ChainApi;
use base64::Engine;
use bitcoin::{BlockHash, Txid};
use jsonrpsee::http_client::{HeaderMap, HeaderValue, HttpClient, HttpClientBuilder};
use std::time::Duration;

/// Default SCC Core RPC port.
pub const DEFAULT_RPC_PORT: u16 = 39999;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for the SCC Core RPC server.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Host the node listens on.
    pub host: String,
    /// RPC port.
    pub port: u16,
    /// `rpcuser` from the node configuration.
    pub user: String,
    /// `rpcpassword` from the node configuration.
    pub password: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_RPC_PORT,
            user: String::new(),
            password: String::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RpcConfig {
    fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.user, self.password);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }
}

/// [`ChainApi`] backed by a live SCC Core node over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct NodeRpcClient {
    client: HttpClient,
}

impl NodeRpcClient {
    /// Creates a new instance of [`NodeRpcClient`].
    ///
    /// No request is sent here; use [`ChainApi::uptime`] to check connectivity.
    pub fn new(config: &RpcConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let authorization = HeaderValue::from_str(&config.authorization())
            .map_err(|err| Error::InvalidConfig(err.to_string()))?;
        headers.insert("Authorization", authorization);

        let client = HttpClientBuilder::default()
            .request_timeout(config.timeout)
            .set_headers(headers)
            .build(config.url())
            .map_err(|err| Error::InvalidConfig(err.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ChainApi for NodeRpcClient {
    async fn best_block_hash(&self) -> Result<BlockHash> {
        self.client
            .get_best_block_hash()
            .await
            .map_err(|err| Error::from_client("getbestblockhash", err))
    }

    async fn block(&self, hash: BlockHash) -> Result<Block> {
        self.client
            .get_block(hash)
            .await
            .map_err(|err| Error::from_client("getblock", err))
    }

    async fn block_hash(&self, height: u32) -> Result<BlockHash> {
        self.client
            .get_block_hash(height)
            .await
            .map_err(|err| Error::from_client("getblockhash", err))
    }

    async fn block_count(&self) -> Result<u32> {
        self.client
            .get_block_count()
            .await
            .map_err(|err| Error::from_client("getblockcount", err))
    }

    async fn raw_transaction(&self, txid: Txid) -> Result<Option<Transaction>> {
        tracing::trace!(target: "rpc", %txid, "getrawtransaction");
        self.client
            .get_raw_transaction(txid, 1)
            .await
            .map_err(|err| Error::from_client("getrawtransaction", err))
    }

    async fn raw_mempool(&self) -> Result<Vec<Txid>> {
        self.client
            .get_raw_mempool()
            .await
            .map_err(|err| Error::from_client("getrawmempool", err))
    }

    async fn validate_address(&self, address: &str) -> Result<bool> {
        self.client
            .validate_address(address.to_string())
            .await
            .map(|response| response.isvalid)
            .map_err(|err| Error::from_client("validateaddress", err))
    }

    async fn uptime(&self) -> Result<u64> {
        self.client
            .uptime()
            .await
            .map_err(|err| Error::from_client("uptime", err))
    }
}

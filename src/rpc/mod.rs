//! Chain access
//!
//! [`ChainClient`] is the narrow set of JSON-RPC reads and writes a relay
//! cycle needs. [`ChainConnector`] turns a chain role into a connected
//! [`ChainHandle`]; the production connector talks HTTP through alloy, tests
//! plug in an in-memory chain.

use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::Log;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::{RelayError, RpcError};
use crate::types::{ChainRole, ScanWindow};

pub mod client;
pub mod connector;

pub use client::AlloyChainClient;
pub use connector::{parse_rpc_urls, ChainEndpoint, RpcConnector};

/// `eth_getLogs` filter for one contract and one event signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub topic0: B256,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogQuery {
    pub fn new(address: Address, topic0: B256, window: ScanWindow) -> Self {
        Self {
            address,
            topic0,
            from_block: window.from_block,
            to_block: window.to_block,
        }
    }
}

/// JSON-RPC surface used by the scanner and dispatcher.
///
/// Every call is bounded by a timeout in the production client.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64, RpcError>;

    /// `eth_blockNumber`
    async fn block_number(&self) -> Result<u64, RpcError>;

    /// `eth_getLogs` filtered by address and topic0
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>, RpcError>;

    /// Hashes of the transactions included in block `number`
    async fn block_transactions(&self, number: u64) -> Result<Vec<B256>, RpcError>;

    /// Logs emitted by a mined transaction
    async fn receipt_logs(&self, tx_hash: B256) -> Result<Vec<Log>, RpcError>;

    /// `eth_getTransactionCount` (pending)
    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError>;

    /// `eth_gasPrice`
    async fn gas_price(&self) -> Result<u128, RpcError>;

    /// `eth_sendRawTransaction`
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError>;
}

/// Connection to one chain, created per cycle and dropped with it
#[derive(Clone)]
pub struct ChainHandle {
    pub role: ChainRole,
    pub chain_id: u64,
    pub endpoint: String,
    pub poa_compat: bool,
    client: Arc<dyn ChainClient>,
}

impl ChainHandle {
    pub fn new(
        role: ChainRole,
        chain_id: u64,
        endpoint: impl Into<String>,
        poa_compat: bool,
        client: Arc<dyn ChainClient>,
    ) -> Self {
        Self {
            role,
            chain_id,
            endpoint: endpoint.into(),
            poa_compat,
            client,
        }
    }

    pub fn client(&self) -> &dyn ChainClient {
        self.client.as_ref()
    }
}

impl fmt::Debug for ChainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainHandle")
            .field("role", &self.role)
            .field("chain_id", &self.chain_id)
            .field("endpoint", &self.endpoint)
            .field("poa_compat", &self.poa_compat)
            .finish()
    }
}

/// Opens a [`ChainHandle`] for a role. Every call opens a fresh connection.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    async fn connect(&self, role: ChainRole) -> Result<ChainHandle, RelayError>;
}

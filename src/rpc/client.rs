//! alloy-backed [`ChainClient`]
//!
//! Wraps a plain HTTP `RootProvider`. Block and receipt reads go through raw
//! JSON-RPC so the required header fields can be relaxed for
//! proof-of-authority chains, which omit or reshape parts of the mainnet
//! header.

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Header, Log};
use alloy::transports::http::{Client, Http};
use alloy::transports::{
    RpcError as TransportRpcError, TransportError, TransportErrorKind, TransportResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::future::IntoFuture;
use std::time::Duration;
use tracing::trace;

use super::{ChainClient, LogQuery};
use crate::error::{FailureSource, RpcError, RpcErrorKind};

/// Block shape accepted with the PoA adaptation: only what the block walk
/// reads is required, every other header field may be missing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompatBlock {
    #[serde(default)]
    transactions: Vec<B256>,
    /// Clique/parlia chains pack validator data in here
    #[serde(default)]
    extra_data: Bytes,
}

/// Block shape without the adaptation: every field the alloy header requires must be present
#[derive(Debug, Deserialize)]
struct StrictBlock {
    #[serde(flatten)]
    header: Header,
    #[serde(default)]
    transactions: Vec<B256>,
}

#[derive(Debug, Deserialize)]
struct CompatReceipt {
    #[serde(default)]
    logs: Vec<Log>,
}

/// HTTP JSON-RPC client for one endpoint
pub struct AlloyChainClient {
    provider: RootProvider<Http<Client>>,
    timeout: Duration,
    poa_compat: bool,
}

impl AlloyChainClient {
    /// Create a client for `rpc_url`. No request is made until the first call.
    pub fn new(rpc_url: &str, timeout: Duration, poa_compat: bool) -> Result<Self, RpcError> {
        let url = rpc_url.parse().map_err(|e| {
            RpcError::new(
                "connect",
                RpcErrorKind::Connectivity,
                format!("invalid RPC URL {}: {}", rpc_url, e),
            )
        })?;

        Ok(Self {
            provider: ProviderBuilder::new().on_http(url),
            timeout,
            poa_compat,
        })
    }

    /// Run one request under the per-call timeout.
    ///
    /// A timeout is reported as `timeout_kind`, the class the caller would
    /// give the same call failing outright.
    async fn call<T, F>(
        &self,
        method: &'static str,
        timeout_kind: RpcErrorKind,
        request: F,
    ) -> Result<T, RpcError>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RpcError::classify(method, failure_source(&e), e.to_string())),
            Err(_) => Err(RpcError::timeout(method, timeout_kind, self.timeout)),
        }
    }
}

fn failure_source(error: &TransportError) -> FailureSource {
    match error {
        TransportRpcError::ErrorResp(payload) => FailureSource::ErrorResponse(payload.code),
        TransportRpcError::Transport(TransportErrorKind::HttpError(http)) => {
            FailureSource::HttpStatus(http.status)
        }
        TransportRpcError::Transport(_) => FailureSource::Transport,
        _ => FailureSource::Other,
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.call(
            "eth_chainId",
            RpcErrorKind::Connectivity,
            self.provider.get_chain_id(),
        )
        .await
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.call(
            "eth_blockNumber",
            RpcErrorKind::Connectivity,
            self.provider.get_block_number(),
        )
        .await
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>, RpcError> {
        let filter = Filter::new()
            .address(query.address)
            .event_signature(query.topic0)
            .from_block(query.from_block)
            .to_block(query.to_block);

        self.call(
            "eth_getLogs",
            RpcErrorKind::QueryLimit,
            self.provider.get_logs(&filter),
        )
        .await
    }

    async fn block_transactions(&self, number: u64) -> Result<Vec<B256>, RpcError> {
        const METHOD: &str = "eth_getBlockByNumber";
        let params = (BlockNumberOrTag::Number(number), false);

        let transactions = if self.poa_compat {
            let block: Option<CompatBlock> = self
                .call(
                    METHOD,
                    RpcErrorKind::QueryLimit,
                    self.provider.raw_request(METHOD.into(), params),
                )
                .await?;
            block.map(|b| {
                trace!(
                    block = number,
                    extra_data_len = b.extra_data.len(),
                    "Decoded block with PoA-compatible header"
                );
                b.transactions
            })
        } else {
            let block: Option<StrictBlock> = self
                .call(
                    METHOD,
                    RpcErrorKind::QueryLimit,
                    self.provider.raw_request(METHOD.into(), params),
                )
                .await?;
            block.map(|b| {
                trace!(block = number, hash = %b.header.hash, "Decoded block");
                b.transactions
            })
        };

        transactions.ok_or_else(|| {
            RpcError::new(
                METHOD,
                RpcErrorKind::Rejected,
                format!("block {} not found", number),
            )
        })
    }

    async fn receipt_logs(&self, tx_hash: B256) -> Result<Vec<Log>, RpcError> {
        const METHOD: &str = "eth_getTransactionReceipt";

        let receipt: Option<CompatReceipt> = self
            .call(
                METHOD,
                RpcErrorKind::QueryLimit,
                self.provider.raw_request(METHOD.into(), (tx_hash,)),
            )
            .await?;

        receipt.map(|r| r.logs).ok_or_else(|| {
            RpcError::new(
                METHOD,
                RpcErrorKind::Rejected,
                format!("receipt for {} not found", tx_hash),
            )
        })
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        self.call(
            "eth_getTransactionCount",
            RpcErrorKind::Connectivity,
            self.provider.get_transaction_count(address).pending(),
        )
        .await
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.call(
            "eth_gasPrice",
            RpcErrorKind::Connectivity,
            self.provider.get_gas_price(),
        )
        .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError> {
        let pending = self
            .call(
                "eth_sendRawTransaction",
                RpcErrorKind::Connectivity,
                self.provider.send_raw_transaction(&raw),
            )
            .await?;
        Ok(*pending.tx_hash())
    }
}

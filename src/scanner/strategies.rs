//! Scan strategies, tried in order by [`super::EventScanner`]

use alloy::primitives::Address;
use alloy::rpc::types::Log;
use async_trait::async_trait;
use tracing::{debug, trace};

use crate::decoder::EventDecoder;
use crate::error::RpcError;
use crate::rpc::{ChainClient, LogQuery};
use crate::types::{BridgeEvent, ScanWindow};

/// What a strategy reads from
pub struct ScanContext<'a> {
    pub client: &'a dyn ChainClient,
    pub contract: Address,
    pub decoder: &'a EventDecoder,
}

impl ScanContext<'_> {
    /// Decode logs that belong to the watched contract and event, skipping the rest
    fn collect(&self, logs: &[Log]) -> StrategyScan {
        let mut scan = StrategyScan::default();
        for log in logs {
            if log.address() != self.contract || !self.decoder.matches(log) {
                continue;
            }
            match self.decoder.decode(log) {
                Ok(event) => scan.events.push(event),
                Err(e) => {
                    debug!(
                        tx_hash = ?log.transaction_hash,
                        log_index = ?log.log_index,
                        error = %e,
                        "Skipping undecodable log"
                    );
                    scan.skipped += 1;
                }
            }
        }
        scan
    }
}

/// Result of one successful strategy run
#[derive(Debug, Default)]
pub struct StrategyScan {
    pub events: Vec<BridgeEvent>,
    /// Logs with the watched topic that failed to decode
    pub skipped: usize,
    /// Blocks actually covered, when narrower than the requested window
    pub covered: Option<ScanWindow>,
}

/// One way of finding the watched event in a window
#[async_trait]
pub trait ScanStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn scan(
        &self,
        ctx: &ScanContext<'_>,
        window: ScanWindow,
    ) -> Result<StrategyScan, RpcError>;
}

/// Single `eth_getLogs` over the whole window
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeQuery;

#[async_trait]
impl ScanStrategy for RangeQuery {
    fn name(&self) -> &'static str {
        "range_query"
    }

    async fn scan(
        &self,
        ctx: &ScanContext<'_>,
        window: ScanWindow,
    ) -> Result<StrategyScan, RpcError> {
        let query = LogQuery::new(ctx.contract, ctx.decoder.topic(), window);
        let logs = ctx.client.get_logs(&query).await?;
        trace!(logs = logs.len(), %window, "Range query returned");
        Ok(ctx.collect(&logs))
    }
}

/// `eth_getLogs` over only the last few blocks of the window.
///
/// Events earlier in the window are not seen by this strategy.
#[derive(Debug, Clone, Copy)]
pub struct TailQuery {
    pub blocks: u64,
}

#[async_trait]
impl ScanStrategy for TailQuery {
    fn name(&self) -> &'static str {
        "tail_query"
    }

    async fn scan(
        &self,
        ctx: &ScanContext<'_>,
        window: ScanWindow,
    ) -> Result<StrategyScan, RpcError> {
        let tail = window.tail(self.blocks);
        let query = LogQuery::new(ctx.contract, ctx.decoder.topic(), tail);
        let logs = ctx.client.get_logs(&query).await?;
        let mut scan = ctx.collect(&logs);
        scan.covered = Some(tail);
        Ok(scan)
    }
}

/// Block-by-block walk: every transaction receipt in every block of the window,
/// filtered by contract address and topic0.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockWalk;

#[async_trait]
impl ScanStrategy for BlockWalk {
    fn name(&self) -> &'static str {
        "block_walk"
    }

    async fn scan(
        &self,
        ctx: &ScanContext<'_>,
        window: ScanWindow,
    ) -> Result<StrategyScan, RpcError> {
        let mut scan = StrategyScan::default();
        for block in window.blocks() {
            let transactions = ctx.client.block_transactions(block).await?;
            for tx_hash in transactions {
                let logs = ctx.client.receipt_logs(tx_hash).await?;
                let found = ctx.collect(&logs);
                scan.events.extend(found.events);
                scan.skipped += found.skipped;
            }
        }
        Ok(scan)
    }
}

//! Event scanner
//!
//! Computes the recent block window for one event kind and finds the
//! matching events in it. Strategies are tried in priority order; only a
//! query-size or rate-limit failure moves on to the next one.
//!
//! | Failure class  | Effect                                  |
//! |----------------|-----------------------------------------|
//! | `QueryLimit`   | try the next strategy                   |
//! | `Connectivity` | abort the cycle with `RelayError::Scan` |
//! | `Rejected`     | stop; report an exhausted scan          |

use tracing::{debug, info, warn};

use crate::contracts::ContractBinding;
use crate::decoder::EventDecoder;
use crate::error::{RelayError, RpcError};
use crate::metrics;
use crate::rpc::ChainHandle;
use crate::types::{BridgeEvent, ChainRole, EventKind, ScanWindow};

pub mod strategies;

pub use strategies::{BlockWalk, RangeQuery, ScanContext, ScanStrategy, StrategyScan, TailQuery};

/// Default `windowSize`
pub const DEFAULT_WINDOW_BLOCKS: u64 = 20;
/// Default window of the narrow fallback
pub const DEFAULT_TAIL_BLOCKS: u64 = 5;

/// Window sizing for one role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    pub window_blocks: u64,
    pub tail_blocks: u64,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            window_blocks: DEFAULT_WINDOW_BLOCKS,
            tail_blocks: DEFAULT_TAIL_BLOCKS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// A strategy answered; zero events is still a completed scan
    Completed,
    /// No strategy answered: treated as "no events this cycle"
    Exhausted,
}

/// A strategy that failed and why
#[derive(Debug, Clone)]
pub struct StrategyAttempt {
    pub strategy: &'static str,
    pub error: RpcError,
}

/// Outcome of one scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub role: ChainRole,
    pub kind: EventKind,
    /// Blocks covered by the successful strategy, or the requested window
    pub window: ScanWindow,
    /// Strategy that produced `events`
    pub strategy: Option<&'static str>,
    /// Ascending by block, then log index
    pub events: Vec<BridgeEvent>,
    pub skipped_logs: usize,
    pub failed_attempts: Vec<StrategyAttempt>,
    pub status: ScanStatus,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn used_fallback(&self) -> bool {
        !self.failed_attempts.is_empty()
    }
}

/// Finds watched events on one chain using an ordered list of strategies
pub struct EventScanner {
    policy: ScanPolicy,
    strategies: Vec<Box<dyn ScanStrategy>>,
}

impl EventScanner {
    /// Range query, then block walk, then the narrow tail query
    pub fn new(policy: ScanPolicy) -> Self {
        let strategies: Vec<Box<dyn ScanStrategy>> = vec![
            Box::new(RangeQuery),
            Box::new(BlockWalk),
            Box::new(TailQuery {
                blocks: policy.tail_blocks,
            }),
        ];
        Self::with_strategies(policy, strategies)
    }

    pub fn with_strategies(policy: ScanPolicy, strategies: Vec<Box<dyn ScanStrategy>>) -> Self {
        Self { policy, strategies }
    }

    pub fn policy(&self) -> ScanPolicy {
        self.policy
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Scan the recent window of `chain` for `kind` events emitted by `binding`.
    ///
    /// Finding nothing is not an error. Only connectivity-class failures and
    /// a binding that does not declare `kind` are returned as `Err`.
    pub async fn scan(
        &self,
        chain: &ChainHandle,
        binding: &ContractBinding,
        kind: EventKind,
    ) -> Result<ScanReport, RelayError> {
        let role = chain.role;
        let decoder = EventDecoder::for_binding(binding, kind)?;

        let latest = match chain.client().block_number().await {
            Ok(latest) => latest,
            Err(e) if e.is_connectivity() => return Err(RelayError::Scan { role, source: e }),
            Err(e) => {
                // Without a head there is no window to scan
                warn!(role = %role, error = %e, "Cannot read latest block, skipping scan");
                return Ok(ScanReport {
                    role,
                    kind,
                    window: ScanWindow::recent(0, 0),
                    strategy: None,
                    events: Vec::new(),
                    skipped_logs: 0,
                    failed_attempts: vec![StrategyAttempt {
                        strategy: "block_number",
                        error: e,
                    }],
                    status: ScanStatus::Exhausted,
                });
            }
        };

        let window = ScanWindow::recent(latest, self.policy.window_blocks);
        debug!(
            role = %role,
            event = %kind,
            from_block = window.from_block,
            to_block = window.to_block,
            blocks = window.block_count(),
            "Scanning"
        );

        let ctx = ScanContext {
            client: chain.client(),
            contract: binding.address,
            decoder: &decoder,
        };

        let mut failed_attempts = Vec::new();
        for strategy in &self.strategies {
            match strategy.scan(&ctx, window).await {
                Ok(found) => {
                    let mut events = found.events;
                    events.sort_by_key(|e| e.position());

                    metrics::record_scan(role, strategy.name(), window.to_block);
                    if !events.is_empty() {
                        info!(
                            role = %role,
                            event = %kind,
                            strategy = strategy.name(),
                            count = events.len(),
                            %window,
                            "Found events"
                        );
                    }

                    return Ok(ScanReport {
                        role,
                        kind,
                        window: found.covered.unwrap_or(window),
                        strategy: Some(strategy.name()),
                        events,
                        skipped_logs: found.skipped,
                        failed_attempts,
                        status: ScanStatus::Completed,
                    });
                }
                Err(e) if e.is_connectivity() => {
                    return Err(RelayError::Scan { role, source: e });
                }
                Err(e) if e.is_query_limit() => {
                    warn!(
                        role = %role,
                        strategy = strategy.name(),
                        %window,
                        error = %e,
                        "Scan strategy hit provider limit, falling back"
                    );
                    metrics::record_scan_fallback(role, strategy.name());
                    failed_attempts.push(StrategyAttempt {
                        strategy: strategy.name(),
                        error: e,
                    });
                }
                Err(e) => {
                    warn!(
                        role = %role,
                        strategy = strategy.name(),
                        %window,
                        error = %e,
                        "Scan strategy rejected, no further fallback"
                    );
                    failed_attempts.push(StrategyAttempt {
                        strategy: strategy.name(),
                        error: e,
                    });
                    break;
                }
            }
        }

        warn!(
            role = %role,
            event = %kind,
            %window,
            attempts = failed_attempts.len(),
            "Scan exhausted, treating as no events"
        );
        metrics::record_scan(role, "exhausted", window.to_block);

        Ok(ScanReport {
            role,
            kind,
            window,
            strategy: None,
            events: Vec::new(),
            skipped_logs: 0,
            failed_attempts,
            status: ScanStatus::Exhausted,
        })
    }
}

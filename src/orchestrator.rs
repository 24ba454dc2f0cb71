//! Relay cycle orchestration
//!
//! One cycle watches one role: load contracts, scan the watched chain, and
//! if anything was found dispatch the counterpart calls.
//!
//! ```text
//! IDLE -> SCAN -> DISPATCH -> DONE
//!          |  \________________^
//!          v        |
//!        FAILED <---'
//! ```
//!
//! Cycles keep no state between invocations. Running two cycles for the
//! same role concurrently is unsafe: both would read the same base nonce.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::contracts::{ContractRegistry, ContractSource};
use crate::dispatcher::{DispatchReport, RelayDispatcher};
use crate::error::RelayError;
use crate::metrics;
use crate::rpc::{ChainConnector, ChainHandle, RpcConnector};
use crate::scanner::{EventScanner, ScanReport};
use crate::signer::{LocalWarden, WardenSigner};
use crate::types::ChainRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleState {
    Idle,
    Scan,
    Dispatch,
    Done,
    Failed,
}

impl CycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::Idle => "idle",
            CycleState::Scan => "scan",
            CycleState::Dispatch => "dispatch",
            CycleState::Done => "done",
            CycleState::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: CycleState) -> bool {
        matches!(
            (self, next),
            (CycleState::Idle, CycleState::Scan)
                | (CycleState::Scan, CycleState::Dispatch)
                | (CycleState::Scan, CycleState::Done)
                | (CycleState::Scan, CycleState::Failed)
                | (CycleState::Dispatch, CycleState::Done)
                | (CycleState::Dispatch, CycleState::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CycleState::Done | CycleState::Failed)
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one cycle
#[derive(Debug)]
pub enum CycleResult {
    /// Scan found nothing (or was exhausted); nothing sent
    NoOp { role: ChainRole, scan: ScanReport },
    /// Events found and a relay was attempted for each
    Relayed {
        role: ChainRole,
        scan: ScanReport,
        dispatch: DispatchReport,
    },
    /// Fatal error; `stage` is the state the cycle was in when it failed
    Failed {
        role: ChainRole,
        stage: CycleState,
        error: RelayError,
    },
}

impl CycleResult {
    pub fn role(&self) -> ChainRole {
        match self {
            CycleResult::NoOp { role, .. }
            | CycleResult::Relayed { role, .. }
            | CycleResult::Failed { role, .. } => *role,
        }
    }

    pub fn final_state(&self) -> CycleState {
        match self {
            CycleResult::Failed { .. } => CycleState::Failed,
            _ => CycleState::Done,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CycleResult::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CycleResult::NoOp { .. } => "noop",
            CycleResult::Relayed { .. } => "relayed",
            CycleResult::Failed { .. } => "failed",
        }
    }
}

/// State of a running cycle
struct Cycle {
    role: ChainRole,
    state: CycleState,
}

impl Cycle {
    fn start(role: ChainRole) -> Self {
        let mut cycle = Self {
            role,
            state: CycleState::Idle,
        };
        cycle.advance(CycleState::Scan);
        cycle
    }

    fn advance(&mut self, next: CycleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid cycle transition {} -> {}",
            self.state,
            next
        );
        debug!(role = %self.role, from = %self.state, to = %next, "Cycle transition");
        self.state = next;
    }

    fn fail(mut self, error: RelayError) -> CycleResult {
        let stage = self.state;
        self.advance(CycleState::Failed);
        error!(
            role = %self.role,
            stage = %stage,
            kind = error.label(),
            error = %error,
            "Relay cycle failed"
        );
        CycleResult::Failed {
            role: self.role,
            stage,
            error,
        }
    }
}

/// Drives scan-then-dispatch cycles for either role
pub struct BridgeOrchestrator {
    contracts: ContractSource,
    connector: Arc<dyn ChainConnector>,
    warden: Arc<dyn WardenSigner>,
    source_scanner: EventScanner,
    destination_scanner: EventScanner,
    dispatcher: RelayDispatcher,
}

impl BridgeOrchestrator {
    pub fn new(
        contracts: ContractSource,
        connector: Arc<dyn ChainConnector>,
        warden: Arc<dyn WardenSigner>,
        source_scanner: EventScanner,
        destination_scanner: EventScanner,
        dispatcher: RelayDispatcher,
    ) -> Self {
        Self {
            contracts,
            connector,
            warden,
            source_scanner,
            destination_scanner,
            dispatcher,
        }
    }

    /// Wire the production connector, key and contract file from `config`
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        let warden = LocalWarden::from_private_key(config.warden_private_key())
            .map_err(|e| RelayError::config(e.to_string()))?;

        let connector = RpcConnector::new(
            config.source.endpoint(),
            config.destination.endpoint(),
            Duration::from_millis(config.rpc_timeout_ms),
        );

        Ok(Self::new(
            ContractSource::File(config.contract_info_path.clone()),
            Arc::new(connector),
            Arc::new(warden),
            EventScanner::new(config.source.scan_policy(config.scan_tail_blocks)),
            EventScanner::new(config.destination.scan_policy(config.scan_tail_blocks)),
            RelayDispatcher::new(config.relay_gas_limit),
        ))
    }

    pub fn warden_address(&self) -> alloy::primitives::Address {
        self.warden.address()
    }

    fn scanner(&self, role: ChainRole) -> &EventScanner {
        match role {
            ChainRole::Source => &self.source_scanner,
            ChainRole::Destination => &self.destination_scanner,
        }
    }

    /// Run one cycle watching `role`
    pub async fn run_cycle(&self, role: ChainRole) -> CycleResult {
        let result = self.cycle(role).await;
        metrics::record_cycle(role, result.label());
        result
    }

    async fn cycle(&self, role: ChainRole) -> CycleResult {
        let route = role.route();
        let mut cycle = Cycle::start(role);

        let registry: ContractRegistry = match self.contracts.load() {
            Ok(registry) => registry,
            Err(e) => return cycle.fail(e),
        };

        let watched: ChainHandle = match self.connector.connect(route.watched).await {
            Ok(handle) => handle,
            Err(e) => return cycle.fail(e),
        };

        let scan = match self
            .scanner(role)
            .scan(&watched, registry.get(route.watched), route.event)
            .await
        {
            Ok(scan) => scan,
            Err(e) => return cycle.fail(e),
        };
        drop(watched);
        metrics::record_events(role, route.event, scan.events.len());

        if scan.is_empty() {
            cycle.advance(CycleState::Done);
            info!(
                role = %role,
                window = %scan.window,
                status = ?scan.status,
                "No {} events, nothing to relay",
                route.event
            );
            return CycleResult::NoOp { role, scan };
        }

        cycle.advance(CycleState::Dispatch);

        let target = match self.connector.connect(route.target).await {
            Ok(handle) => handle,
            Err(e) => return cycle.fail(e),
        };

        let dispatch = match self
            .dispatcher
            .dispatch(
                &target,
                registry.get(route.target),
                self.warden.as_ref(),
                &scan.events,
            )
            .await
        {
            Ok(report) => report,
            Err(e) => return cycle.fail(e.into()),
        };

        cycle.advance(CycleState::Done);
        info!(
            role = %role,
            call = %route.call,
            attempted = dispatch.attempted(),
            succeeded = dispatch.succeeded(),
            failed = dispatch.failed(),
            "Relay cycle complete"
        );

        CycleResult::Relayed {
            role,
            scan,
            dispatch,
        }
    }
}

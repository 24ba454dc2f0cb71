//! Relay dispatcher
//!
//! Submits one counterpart call per event, in input order. The warden's
//! transaction count is read once per batch and event `i` always gets nonce
//! `base + i`, so a failed send leaves its slot unused rather than shifting
//! later events onto it.

use alloy::primitives::{Bytes, B256};
use alloy::sol_types::SolCall;
use tracing::{debug, info, warn};

use crate::contracts::{ContractBinding, IDestinationBridge, ISourceBridge};
use crate::error::DispatchError;
use crate::metrics;
use crate::rpc::ChainHandle;
use crate::signer::WardenSigner;
use crate::types::{BridgeEvent, ChainRole, RelayCallKind, RelayTransaction};

pub mod classify;

pub use classify::{classify_error, ErrorClass};

/// Conservative fixed gas ceiling for `wrap`/`withdraw`
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

/// Counterpart call for an event and its ABI encoding
pub fn relay_call(event: &BridgeEvent) -> (RelayCallKind, Bytes) {
    match event {
        BridgeEvent::Deposit(deposit) => (
            RelayCallKind::Wrap,
            IDestinationBridge::wrapCall {
                token: deposit.token,
                recipient: deposit.recipient,
                amount: deposit.amount,
            }
            .abi_encode()
            .into(),
        ),
        BridgeEvent::Unwrap(unwrap) => (
            RelayCallKind::Withdraw,
            ISourceBridge::withdrawCall {
                underlying_token: unwrap.underlying_token,
                recipient: unwrap.to,
                amount: unwrap.amount,
            }
            .abi_encode()
            .into(),
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayStatus {
    Submitted { tx_hash: B256 },
    Failed { class: ErrorClass, error: String },
}

/// What happened to one event of the batch
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    pub event: BridgeEvent,
    pub call: RelayCallKind,
    pub nonce: u64,
    pub status: RelayStatus,
}

impl RelayOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self.status, RelayStatus::Submitted { .. })
    }
}

/// Per-event outcomes of one batch, in input order
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub target: ChainRole,
    /// `None` when there was nothing to send and the nonce was never read
    pub base_nonce: Option<u64>,
    pub outcomes: Vec<RelayOutcome>,
}

impl DispatchReport {
    fn empty(target: ChainRole) -> Self {
        Self {
            target,
            base_nonce: None,
            outcomes: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_submitted()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    /// Nonces used, in input order
    pub fn nonces(&self) -> Vec<u64> {
        self.outcomes.iter().map(|o| o.nonce).collect()
    }

    /// Failed nonces below the highest submitted one. Later transactions
    /// stay pending on chain until these slots are filled.
    pub fn nonce_gaps(&self) -> Vec<u64> {
        let Some(highest) = self
            .outcomes
            .iter()
            .filter(|o| o.is_submitted())
            .map(|o| o.nonce)
            .max()
        else {
            return Vec::new();
        };
        self.outcomes
            .iter()
            .filter(|o| !o.is_submitted() && o.nonce < highest)
            .map(|o| o.nonce)
            .collect()
    }
}

/// Builds, signs and submits relay transactions
#[derive(Debug, Clone, Copy)]
pub struct RelayDispatcher {
    gas_limit: u64,
}

impl Default for RelayDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_GAS_LIMIT)
    }
}

impl RelayDispatcher {
    pub fn new(gas_limit: u64) -> Self {
        Self { gas_limit }
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Submit one transaction per event to `chain`.
    ///
    /// Returns `Err` only when nothing could be sent (the base nonce could
    /// not be read). Individual send failures are recorded in the report.
    pub async fn dispatch(
        &self,
        chain: &ChainHandle,
        binding: &ContractBinding,
        warden: &dyn WardenSigner,
        events: &[BridgeEvent],
    ) -> Result<DispatchReport, DispatchError> {
        let target = chain.role;
        if events.is_empty() {
            return Ok(DispatchReport::empty(target));
        }

        let client = chain.client();
        let base_nonce = client
            .transaction_count(warden.address())
            .await
            .map_err(|source| DispatchError::NonceRead {
                role: target,
                source,
            })?;

        info!(
            chain = %target,
            chain_id = chain.chain_id,
            base_nonce,
            count = events.len(),
            "Dispatching relay batch"
        );

        let mut outcomes = Vec::with_capacity(events.len());
        for (i, event) in events.iter().enumerate() {
            let nonce = base_nonce + i as u64;
            let (call, input) = relay_call(event);
            let status = self
                .submit(chain, binding, warden, nonce, input)
                .await;

            match &status {
                RelayStatus::Submitted { tx_hash } => {
                    info!(
                        chain = %target,
                        call = %call,
                        nonce,
                        tx_hash = %tx_hash,
                        source_tx = %event.origin().tx_hash,
                        amount = %event.amount(),
                        "Relay transaction submitted"
                    );
                }
                RelayStatus::Failed { class, error } => {
                    warn!(
                        chain = %target,
                        call = %call,
                        nonce,
                        class = %class,
                        error = %error,
                        source_tx = %event.origin().tx_hash,
                        "Relay transaction failed, continuing with next event"
                    );
                }
            }
            metrics::record_relay(target, &status);

            outcomes.push(RelayOutcome {
                event: event.clone(),
                call,
                nonce,
                status,
            });
        }

        let report = DispatchReport {
            target,
            base_nonce: Some(base_nonce),
            outcomes,
        };
        let gaps = report.nonce_gaps();
        if !gaps.is_empty() {
            warn!(chain = %target, nonces = ?gaps, "Relay batch left nonce gaps");
        }
        Ok(report)
    }

    async fn submit(
        &self,
        chain: &ChainHandle,
        binding: &ContractBinding,
        warden: &dyn WardenSigner,
        nonce: u64,
        input: Bytes,
    ) -> RelayStatus {
        let client = chain.client();

        let gas_price = match client.gas_price().await {
            Ok(price) => price,
            Err(e) => return failed(e.to_string()),
        };

        let tx = RelayTransaction {
            nonce,
            gas_limit: self.gas_limit,
            gas_price,
            chain_id: chain.chain_id,
            to: binding.address,
            input,
        };
        debug!(nonce, gas_price, to = %tx.to, "Signing relay transaction");

        let raw = match warden.sign(&tx).await {
            Ok(raw) => raw,
            Err(e) => return failed(e.to_string()),
        };

        match client.send_raw_transaction(raw).await {
            Ok(tx_hash) => RelayStatus::Submitted { tx_hash },
            Err(e) => failed(e.to_string()),
        }
    }
}

fn failed(error: String) -> RelayStatus {
    RelayStatus::Failed {
        class: classify_error(&error),
        error,
    }
}

//! Common types for the warden relay
//!
//! Chain roles, the watched event kinds, the counterpart calls they map to,
//! and the decoded bridge events that flow from the scanner to the dispatcher.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of the bridge a cycle watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainRole {
    /// Holds the locked assets; emits `Deposit`, receives `withdraw`.
    Source,
    /// Holds the wrapped assets; emits `Unwrap`, receives `wrap`.
    Destination,
}

impl ChainRole {
    pub const ALL: [ChainRole; 2] = [ChainRole::Source, ChainRole::Destination];

    /// Get the role as a lowercase string (also the key in contract_info.json)
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainRole::Source => "source",
            ChainRole::Destination => "destination",
        }
    }

    /// The chain that receives the relayed call
    pub fn counterpart(&self) -> ChainRole {
        match self {
            ChainRole::Source => ChainRole::Destination,
            ChainRole::Destination => ChainRole::Source,
        }
    }

    /// Relay route for a cycle started on this role.
    ///
    /// This is the only place the role → event → call mapping is spelled out.
    pub fn route(&self) -> RelayRoute {
        match self {
            ChainRole::Source => RelayRoute {
                watched: ChainRole::Source,
                event: EventKind::Deposit,
                target: ChainRole::Destination,
                call: RelayCallKind::Wrap,
            },
            ChainRole::Destination => RelayRoute {
                watched: ChainRole::Destination,
                event: EventKind::Unwrap,
                target: ChainRole::Source,
                call: RelayCallKind::Withdraw,
            },
        }
    }
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChainRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" => Ok(ChainRole::Source),
            "destination" => Ok(ChainRole::Destination),
            other => Err(format!("invalid chain role: {other}")),
        }
    }
}

/// Watched chain, watched event, target chain and target call of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayRoute {
    pub watched: ChainRole,
    pub event: EventKind,
    pub target: ChainRole,
    pub call: RelayCallKind,
}

/// Bridge event kinds the warden listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Deposit,
    Unwrap,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Deposit => "Deposit",
            EventKind::Unwrap => "Unwrap",
        }
    }

    /// Canonical signature string hashed into topic0
    pub fn signature(&self) -> &'static str {
        match self {
            EventKind::Deposit => "Deposit(address,address,uint256)",
            EventKind::Unwrap => "Unwrap(address,address,address,address,uint256)",
        }
    }

    /// keccak256 of the canonical signature
    pub fn topic(&self) -> B256 {
        alloy::primitives::keccak256(self.signature().as_bytes())
    }

    /// Number of ABI parameters the event carries
    pub fn param_count(&self) -> usize {
        match self {
            EventKind::Deposit => 3,
            EventKind::Unwrap => 5,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counterpart contract functions the warden calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayCallKind {
    Wrap,
    Withdraw,
}

impl RelayCallKind {
    pub fn name(&self) -> &'static str {
        match self {
            RelayCallKind::Wrap => "wrap",
            RelayCallKind::Withdraw => "withdraw",
        }
    }

    pub fn signature(&self) -> &'static str {
        match self {
            RelayCallKind::Wrap => "wrap(address,address,uint256)",
            RelayCallKind::Withdraw => "withdraw(address,address,uint256)",
        }
    }
}

impl fmt::Display for RelayCallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where on chain an event was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventOrigin {
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

/// `Deposit(address token, address recipient, uint256 amount)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    pub token: Address,
    pub recipient: Address,
    pub amount: U256,
    pub origin: EventOrigin,
}

/// `Unwrap(address underlying_token, address wrapped_token, address from, address to,
/// uint256 amount)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwrapEvent {
    pub underlying_token: Address,
    pub wrapped_token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub origin: EventOrigin,
}

/// A decoded bridge event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeEvent {
    Deposit(DepositEvent),
    Unwrap(UnwrapEvent),
}

impl BridgeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BridgeEvent::Deposit(_) => EventKind::Deposit,
            BridgeEvent::Unwrap(_) => EventKind::Unwrap,
        }
    }

    pub fn origin(&self) -> &EventOrigin {
        match self {
            BridgeEvent::Deposit(e) => &e.origin,
            BridgeEvent::Unwrap(e) => &e.origin,
        }
    }

    pub fn amount(&self) -> U256 {
        match self {
            BridgeEvent::Deposit(e) => e.amount,
            BridgeEvent::Unwrap(e) => e.amount,
        }
    }

    /// Sort key: ascending block, then log index
    pub fn position(&self) -> (u64, u64) {
        let origin = self.origin();
        (origin.block_number, origin.log_index)
    }
}

/// A counterpart call ready to sign: built, signed, submitted, then dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTransaction {
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
    pub to: Address,
    /// ABI-encoded call
    pub input: Bytes,
}

/// Contiguous block range scanned in one cycle. `from_block <= to_block` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWindow {
    pub from_block: u64,
    pub to_block: u64,
}

impl ScanWindow {
    /// `[max(latest - size, 0), latest]`
    pub fn recent(latest_block: u64, window_size: u64) -> Self {
        Self {
            from_block: latest_block.saturating_sub(window_size),
            to_block: latest_block,
        }
    }

    /// The last `blocks` blocks of this window (at least the final block)
    pub fn tail(&self, blocks: u64) -> Self {
        let from = self
            .to_block
            .saturating_sub(blocks.saturating_sub(1))
            .max(self.from_block);
        Self {
            from_block: from,
            to_block: self.to_block,
        }
    }

    pub fn block_count(&self) -> u64 {
        self.to_block - self.from_block + 1
    }

    pub fn blocks(&self) -> std::ops::RangeInclusive<u64> {
        self.from_block..=self.to_block
    }
}

impl fmt::Display for ScanWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from_block == self.to_block {
            write!(f, "block {}", self.from_block)
        } else {
            write!(f, "blocks {}-{}", self.from_block, self.to_block)
        }
    }
}

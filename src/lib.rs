//! Bridge warden - library interface
//!
//! Relays `Deposit` events on the source chain to `wrap` calls on the
//! destination chain, and `Unwrap` events on the destination chain to
//! `withdraw` calls on the source chain. Each call to
//! [`BridgeOrchestrator::run_cycle`] is one stateless scan-then-dispatch pass.

pub mod config;
pub mod contracts;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod rpc;
pub mod scanner;
pub mod signer;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use error::RelayError;
pub use orchestrator::{BridgeOrchestrator, CycleResult, CycleState};
pub use types::{BridgeEvent, ChainRole, EventKind};

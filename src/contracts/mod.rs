//! Bridge contract bindings
//!
//! - `bridge` - sol! definitions of the watched events and relayed calls
//! - `binding` - per-role address + ABI loaded from the contract metadata store

pub mod binding;
pub mod bridge;

pub use binding::{ContractBinding, ContractRegistry, ContractSource};
pub use bridge::{IDestinationBridge, ISourceBridge};

//! Contract metadata loaded from the external store
//!
//! The store is a JSON document keyed by chain role:
//!
//! ```json
//! {
//!   "source":      { "address": "0x…", "abi": [ … ] },
//!   "destination": { "address": "0x…", "abi": [ … ] }
//! }
//! ```
//!
//! Each ABI must declare the event watched on that chain and the call relayed
//! onto it, with the expected canonical signatures.

use alloy::json_abi::{Event, JsonAbi};
use alloy::primitives::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::RelayError;
use crate::types::{ChainRole, EventKind, RelayCallKind};

/// {role, address, ABI} for one bridge contract. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    pub role: ChainRole,
    pub address: Address,
    pub abi: JsonAbi,
}

impl ContractBinding {
    /// Event kind emitted by this contract
    pub fn watched_event(&self) -> EventKind {
        self.role.route().event
    }

    /// Call the warden makes on this contract
    pub fn relay_call(&self) -> RelayCallKind {
        self.role.counterpart().route().call
    }

    /// ABI entry for `kind`, matched by canonical signature
    pub fn event(&self, kind: EventKind) -> Option<&Event> {
        self.abi
            .events
            .get(kind.name())?
            .iter()
            .find(|event| !event.anonymous && event.signature() == kind.signature())
    }

    pub fn has_function(&self, call: RelayCallKind) -> bool {
        self.abi
            .functions
            .get(call.name())
            .is_some_and(|overloads| overloads.iter().any(|f| f.signature() == call.signature()))
    }

    fn validate(&self) -> Result<(), RelayError> {
        let event = self.watched_event();
        if self.event(event).is_none() {
            return Err(RelayError::config(format!(
                "{} contract ABI does not declare event {}",
                self.role,
                event.signature()
            )));
        }
        let call = self.relay_call();
        if !self.has_function(call) {
            return Err(RelayError::config(format!(
                "{} contract ABI does not declare function {}",
                self.role,
                call.signature()
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawContractEntry {
    address: Option<String>,
    abi: Option<serde_json::Value>,
}

/// Bindings for both sides of the bridge
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    source: ContractBinding,
    destination: ContractBinding,
}

impl ContractRegistry {
    pub fn new(source: ContractBinding, destination: ContractBinding) -> Result<Self, RelayError> {
        if source.role != ChainRole::Source || destination.role != ChainRole::Destination {
            return Err(RelayError::config("contract bindings registered under the wrong role"));
        }
        source.validate()?;
        destination.validate()?;
        Ok(Self {
            source,
            destination,
        })
    }

    /// Load and validate the contract metadata file
    pub fn load(path: &Path) -> Result<Self, RelayError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!(
                "failed to read contract info {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RelayError> {
        let mut entries: HashMap<String, RawContractEntry> = serde_json::from_str(raw)
            .map_err(|e| RelayError::config(format!("malformed contract info: {}", e)))?;

        let source = Self::binding(&mut entries, ChainRole::Source)?;
        let destination = Self::binding(&mut entries, ChainRole::Destination)?;
        Self::new(source, destination)
    }

    fn binding(
        entries: &mut HashMap<String, RawContractEntry>,
        role: ChainRole,
    ) -> Result<ContractBinding, RelayError> {
        let entry = entries
            .remove(role.as_str())
            .ok_or_else(|| RelayError::config(format!("contract info has no '{}' entry", role)))?;

        let address = entry
            .address
            .ok_or_else(|| RelayError::config(format!("{} entry is missing 'address'", role)))?;
        let address = Address::from_str(address.trim()).map_err(|e| {
            RelayError::config(format!("{} address '{}' is invalid: {}", role, address, e))
        })?;

        let abi = entry
            .abi
            .ok_or_else(|| RelayError::config(format!("{} entry is missing 'abi'", role)))?;
        let abi: JsonAbi = serde_json::from_value(abi)
            .map_err(|e| RelayError::config(format!("{} ABI is malformed: {}", role, e)))?;

        Ok(ContractBinding { role, address, abi })
    }

    pub fn get(&self, role: ChainRole) -> &ContractBinding {
        match role {
            ChainRole::Source => &self.source,
            ChainRole::Destination => &self.destination,
        }
    }
}

/// Where a cycle obtains its contract bindings
#[derive(Debug, Clone)]
pub enum ContractSource {
    /// Re-read and re-validated at the start of every cycle
    File(PathBuf),
    /// Already loaded
    Static(ContractRegistry),
}

impl ContractSource {
    pub fn load(&self) -> Result<ContractRegistry, RelayError> {
        match self {
            ContractSource::File(path) => ContractRegistry::load(path),
            ContractSource::Static(registry) => Ok(registry.clone()),
        }
    }
}

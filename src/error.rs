//! Error taxonomy for relay cycles
//!
//! Fatal conditions abort a cycle and surface as [`RelayError`]. Soft
//! conditions (an exhausted scan, an undecodable log, a failed send) are
//! reported as values by the scanner and dispatcher instead.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::{ChainRole, EventKind};

/// How a failed RPC call should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorKind {
    /// Provider refused the query size or rate limited us; a narrower query may work
    QueryLimit,
    /// Endpoint unreachable or not answering
    Connectivity,
    /// Endpoint answered with an error (revert, bad params, missing data)
    Rejected,
}

impl RpcErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcErrorKind::QueryLimit => "query_limit",
            RpcErrorKind::Connectivity => "connectivity",
            RpcErrorKind::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RpcErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed JSON-RPC call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{method} failed ({kind}): {message}")]
pub struct RpcError {
    pub method: &'static str,
    pub kind: RpcErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(method: &'static str, kind: RpcErrorKind, message: impl Into<String>) -> Self {
        Self {
            method,
            kind,
            message: message.into(),
        }
    }

    /// Classify a provider failure.
    ///
    /// Status and JSON-RPC codes come from the transport, never from digits
    /// in `message`: hashes and hex block numbers routinely contain "429"
    /// or "503".
    pub fn classify(method: &'static str, source: FailureSource, message: String) -> Self {
        let kind = match source {
            FailureSource::HttpStatus(429) | FailureSource::ErrorResponse(-32005) => {
                RpcErrorKind::QueryLimit
            }
            _ if is_query_limit_message(&message) => RpcErrorKind::QueryLimit,
            FailureSource::Transport | FailureSource::HttpStatus(500..=599) => {
                RpcErrorKind::Connectivity
            }
            _ if is_connectivity_message(&message) => RpcErrorKind::Connectivity,
            _ => RpcErrorKind::Rejected,
        };
        Self::new(method, kind, message)
    }

    /// A call that did not answer within `after`, classified as `kind`
    pub fn timeout(method: &'static str, kind: RpcErrorKind, after: Duration) -> Self {
        Self::new(method, kind, format!("timed out after {after:?}"))
    }

    pub fn is_query_limit(&self) -> bool {
        self.kind == RpcErrorKind::QueryLimit
    }

    pub fn is_connectivity(&self) -> bool {
        self.kind == RpcErrorKind::Connectivity
    }
}

/// Where a failed call's error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSource {
    /// No HTTP answer at all (connect, IO, closed backend)
    Transport,
    /// Non-success HTTP status
    HttpStatus(u16),
    /// JSON-RPC error object with this code
    ErrorResponse(i64),
    /// Anything else: null or undecodable result, local errors
    Other,
}

/// Provider messages that mean "ask for less"
pub fn is_query_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("limit exceeded")
        || lower.contains("query returned more than")
        || lower.contains("block range")
        || lower.contains("range too large")
        || lower.contains("too many blocks")
        || lower.contains("response size")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
}

fn is_connectivity_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("dns error")
        || lower.contains("error sending request")
        || lower.contains("bad gateway")
        || lower.contains("service unavailable")
        || lower.contains("temporarily unavailable")
}

/// Why a log could not be turned into a [`crate::types::BridgeEvent`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("topic0 does not match {expected}")]
    TopicMismatch { expected: EventKind },
    #[error("missing indexed topic for parameter {param}")]
    MissingTopic { param: usize },
    #[error("log data too short: {len} bytes, need {needed}")]
    ShortData { len: usize, needed: usize },
    #[error("parameter {param} is not a valid address word")]
    InvalidAddress { param: usize },
    #[error("log has no {0}")]
    MissingMetadata(&'static str),
}

/// Failure to produce a signed transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("signing failed: {0}")]
pub struct SignError(pub String);

/// Batch-level dispatch failures; nothing was submitted when one of these is returned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("cannot read warden nonce on {role}: {source}")]
    NonceRead { role: ChainRole, source: RpcError },
}

/// Fatal cycle errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("config error: {0}")]
    Config(String),

    #[error("cannot connect to {role} chain: {source}")]
    Connection { role: ChainRole, source: RpcError },

    #[error("scan of {role} chain aborted: {source}")]
    Scan { role: ChainRole, source: RpcError },

    #[error("dispatch aborted: {0}")]
    Dispatch(#[from] DispatchError),
}

impl RelayError {
    pub fn config(message: impl Into<String>) -> Self {
        RelayError::Config(message.into())
    }

    /// Short label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "config",
            RelayError::Connection { .. } => "connection",
            RelayError::Scan { .. } => "scan",
            RelayError::Dispatch(_) => "dispatch",
        }
    }
}

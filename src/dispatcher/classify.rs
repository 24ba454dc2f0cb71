//! Classification of relay submission failures
//!
//! Sends are never retried inside a cycle; the class is reported with the
//! outcome so operators can tell a nonce gap from a revert.

use std::fmt;

/// Why a relay transaction was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// RPC timeout, network issue or rate limit
    Transient,
    /// Gas price below what the node accepts
    Underpriced,
    /// Nonce already used on chain
    NonceTooLow,
    /// Earlier nonces still missing
    NonceTooHigh,
    /// Revert, insufficient funds, bad signature
    Permanent,
    Unknown,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Underpriced => "underpriced",
            ErrorClass::NonceTooLow => "nonce_too_low",
            ErrorClass::NonceTooHigh => "nonce_too_high",
            ErrorClass::Permanent => "permanent",
            ErrorClass::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a node's rejection message
pub fn classify_error(error: &str) -> ErrorClass {
    let error_lower = error.to_lowercase();

    if error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection")
        || error_lower.contains("network")
        || error_lower.contains("rate limit")
        || error_lower.contains("too many requests")
        || error_lower.contains("service unavailable")
        || error_lower.contains("bad gateway")
        || error_lower.contains("temporarily unavailable")
    {
        return ErrorClass::Transient;
    }

    if error_lower.contains("underpriced")
        || error_lower.contains("replacement transaction")
        || error_lower.contains("gas price too low")
        || error_lower.contains("max fee per gas less than")
    {
        return ErrorClass::Underpriced;
    }

    if error_lower.contains("nonce too low")
        || error_lower.contains("already known")
        || error_lower.contains("already been processed")
    {
        return ErrorClass::NonceTooLow;
    }

    if error_lower.contains("nonce too high") {
        return ErrorClass::NonceTooHigh;
    }

    if error_lower.contains("reverted")
        || error_lower.contains("invalid signature")
        || error_lower.contains("invalid sender")
        || error_lower.contains("insufficient funds")
        || error_lower.contains("out of gas")
        || error_lower.contains("intrinsic gas too low")
        || error_lower.contains("exceeds block gas limit")
        || error_lower.contains("invalid parameters")
        || error_lower.contains("signing failed")
    {
        return ErrorClass::Permanent;
    }

    ErrorClass::Unknown
}

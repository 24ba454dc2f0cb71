//! Prometheus metrics for the bridge warden
//!
//! The warden runs one-shot, so metrics are written to a textfile for the
//! node-exporter textfile collector instead of being served.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, Encoder, GaugeVec, TextEncoder,
};
use std::path::Path;

use crate::dispatcher::RelayStatus;
use crate::types::{ChainRole, EventKind};

lazy_static! {
    pub static ref CYCLES: CounterVec = register_counter_vec!(
        "warden_cycles_total",
        "Relay cycles run, by watched role and result",
        &["role", "result"]
    ).unwrap();

    pub static ref SCANS: CounterVec = register_counter_vec!(
        "warden_scans_total",
        "Scans completed, by role and the strategy that answered",
        &["role", "strategy"]
    ).unwrap();

    pub static ref SCAN_FALLBACKS: CounterVec = register_counter_vec!(
        "warden_scan_fallbacks_total",
        "Strategies abandoned because of provider query limits",
        &["role", "strategy"]
    ).unwrap();

    pub static ref LATEST_BLOCK: GaugeVec = register_gauge_vec!(
        "warden_latest_scanned_block",
        "Upper bound of the last scanned window",
        &["role"]
    ).unwrap();

    pub static ref EVENTS_DETECTED: CounterVec = register_counter_vec!(
        "warden_events_detected_total",
        "Bridge events decoded",
        &["role", "event"]
    ).unwrap();

    pub static ref RELAY_TRANSACTIONS: CounterVec = register_counter_vec!(
        "warden_relay_transactions_total",
        "Relay transactions by target chain, status and failure class",
        &["chain", "status", "class"]
    ).unwrap();
}

pub fn record_cycle(role: ChainRole, result: &str) {
    CYCLES.with_label_values(&[role.as_str(), result]).inc();
}

pub fn record_scan(role: ChainRole, strategy: &str, to_block: u64) {
    SCANS.with_label_values(&[role.as_str(), strategy]).inc();
    LATEST_BLOCK
        .with_label_values(&[role.as_str()])
        .set(to_block as f64);
}

pub fn record_scan_fallback(role: ChainRole, strategy: &str) {
    SCAN_FALLBACKS
        .with_label_values(&[role.as_str(), strategy])
        .inc();
}

pub fn record_events(role: ChainRole, kind: EventKind, count: usize) {
    EVENTS_DETECTED
        .with_label_values(&[role.as_str(), kind.name()])
        .inc_by(count as f64);
}

pub fn record_relay(chain: ChainRole, status: &RelayStatus) {
    let (status, class) = match status {
        RelayStatus::Submitted { .. } => ("submitted", "none"),
        RelayStatus::Failed { class, .. } => ("failed", class.as_str()),
    };
    RELAY_TRANSACTIONS
        .with_label_values(&[chain.as_str(), status, class])
        .inc();
}

/// Text exposition of every registered metric
pub fn encode_text() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Write the exposition to `path` via a temp file so collectors never read a partial file
pub fn write_textfile(path: &Path) -> std::io::Result<()> {
    let text = encode_text().map_err(std::io::Error::other)?;
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, text)?;
    std::fs::rename(&tmp, path)
}

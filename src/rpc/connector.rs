//! HTTP connector with ordered endpoint fallback
//!
//! Each role may list several RPC URLs. A connection attempt walks them in
//! order and keeps the first one that answers `eth_chainId`.

use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{AlloyChainClient, ChainClient, ChainConnector, ChainHandle};
use crate::error::{RelayError, RpcError, RpcErrorKind};
use crate::types::ChainRole;

/// Parse a comma-separated RPC URL string into individual trimmed URLs.
pub fn parse_rpc_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Scheme and host of an RPC URL. Paths and query strings often carry API keys.
pub fn endpoint_label(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}", parsed.scheme(), host, port),
            (Some(host), None) => format!("{}://{}", parsed.scheme(), host),
            _ => "<redacted>".to_string(),
        },
        Err(_) => "<redacted>".to_string(),
    }
}

/// RPC endpoints and header handling for one chain
#[derive(Clone)]
pub struct ChainEndpoint {
    pub urls: Vec<String>,
    /// Accept proof-of-authority block headers
    pub poa_compat: bool,
}

impl ChainEndpoint {
    pub fn new(urls: Vec<String>, poa_compat: bool) -> Self {
        Self { urls, poa_compat }
    }
}

impl std::fmt::Debug for ChainEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<String> = self.urls.iter().map(|u| endpoint_label(u)).collect();
        f.debug_struct("ChainEndpoint")
            .field("urls", &labels)
            .field("poa_compat", &self.poa_compat)
            .finish()
    }
}

/// Production [`ChainConnector`]
#[derive(Debug, Clone)]
pub struct RpcConnector {
    source: ChainEndpoint,
    destination: ChainEndpoint,
    timeout: Duration,
}

impl RpcConnector {
    pub fn new(source: ChainEndpoint, destination: ChainEndpoint, timeout: Duration) -> Self {
        Self {
            source,
            destination,
            timeout,
        }
    }

    pub fn endpoint(&self, role: ChainRole) -> &ChainEndpoint {
        match role {
            ChainRole::Source => &self.source,
            ChainRole::Destination => &self.destination,
        }
    }
}

#[async_trait]
impl ChainConnector for RpcConnector {
    async fn connect(&self, role: ChainRole) -> Result<ChainHandle, RelayError> {
        let endpoint = self.endpoint(role);
        if endpoint.urls.is_empty() {
            return Err(RelayError::config(format!(
                "no RPC URL configured for {} chain",
                role
            )));
        }

        let mut last_error = None;
        for (i, url) in endpoint.urls.iter().enumerate() {
            let label = endpoint_label(url);
            let client = match AlloyChainClient::new(url, self.timeout, endpoint.poa_compat) {
                Ok(client) => client,
                Err(e) => {
                    warn!(
                        role = %role,
                        endpoint = %label,
                        error = %e,
                        "Skipping invalid RPC endpoint"
                    );
                    last_error = Some(e);
                    continue;
                }
            };

            match client.chain_id().await {
                Ok(chain_id) => {
                    if i > 0 {
                        info!(
                            role = %role,
                            endpoint = %label,
                            attempt = i + 1,
                            "Connected via fallback RPC endpoint"
                        );
                    } else {
                        debug!(role = %role, endpoint = %label, chain_id, "Connected");
                    }
                    return Ok(ChainHandle::new(
                        role,
                        chain_id,
                        label,
                        endpoint.poa_compat,
                        Arc::new(client),
                    ));
                }
                Err(e) => {
                    warn!(role = %role, endpoint = %label, error = %e, "RPC endpoint unavailable");
                    last_error = Some(e);
                }
            }
        }

        Err(RelayError::Connection {
            role,
            source: last_error.unwrap_or_else(|| {
                RpcError::new("eth_chainId", RpcErrorKind::Connectivity, "no endpoint answered")
            }),
        })
    }
}

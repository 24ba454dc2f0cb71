//! Warden signing capability
//!
//! The warden key is loaded once at startup and injected into the
//! orchestrator as a [`WardenSigner`]. The same identity signs on both chains.

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::fmt;
use tracing::info;

use crate::error::SignError;
use crate::types::RelayTransaction;

/// `{address, sign(transaction) -> signed raw transaction}`
#[async_trait]
pub trait WardenSigner: Send + Sync {
    fn address(&self) -> Address;

    /// EIP-2718 encoded signed transaction, ready for `eth_sendRawTransaction`
    async fn sign(&self, tx: &RelayTransaction) -> Result<Bytes, SignError>;
}

/// Warden backed by an in-memory secp256k1 key
pub struct LocalWarden {
    address: Address,
    wallet: EthereumWallet,
}

impl LocalWarden {
    /// Private key as hex, with or without 0x prefix
    pub fn from_private_key(private_key: &str) -> Result<Self, SignError> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| SignError(format!("invalid private key: {}", e)))?;
        Ok(Self::new(signer))
    }

    pub fn new(signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        info!(address = %address, "Warden signer loaded");
        Self {
            address,
            wallet: EthereumWallet::from(signer),
        }
    }
}

impl fmt::Debug for LocalWarden {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWarden")
            .field("address", &self.address)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl WardenSigner for LocalWarden {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, tx: &RelayTransaction) -> Result<Bytes, SignError> {
        // Legacy (EIP-155) transaction: gas price set, no fee-market fields
        let request = TransactionRequest::default()
            .with_from(self.address)
            .with_to(tx.to)
            .with_nonce(tx.nonce)
            .with_gas_limit(tx.gas_limit)
            .with_gas_price(tx.gas_price)
            .with_chain_id(tx.chain_id)
            .with_input(tx.input.clone());

        let envelope: TxEnvelope = request
            .build(&self.wallet)
            .await
            .map_err(|e| SignError(e.to_string()))?;

        Ok(envelope.encoded_2718().into())
    }
}

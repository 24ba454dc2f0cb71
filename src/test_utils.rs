//! In-memory chains and fixtures shared by unit tests

use alloy::primitives::{address, Address, Bytes, LogData, B256, U256};
use alloy::rpc::types::Log;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::error::{RelayError, RpcError, RpcErrorKind};
use crate::rpc::{ChainClient, ChainConnector, ChainHandle, LogQuery};
use crate::types::{ChainRole, EventKind};

pub const SOURCE_CONTRACT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
pub const DESTINATION_CONTRACT: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");

/// Anvil account #0
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_WARDEN: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

pub const TOKEN: Address = address!("1000000000000000000000000000000000000001");
pub const WRAPPED_TOKEN: Address = address!("2000000000000000000000000000000000000002");
pub const ALICE: Address = address!("a11ce00000000000000000000000000000000a11");
pub const BOB: Address = address!("b0b0000000000000000000000000000000000b0b");

/// contract_info.json for both roles. `indexed` marks the address parameters
/// of each event as indexed.
pub fn contract_info_json(indexed: bool) -> String {
    let event_input = |name: &str, ty: &str, is_indexed: bool| {
        serde_json::json!({ "name": name, "type": ty, "indexed": is_indexed })
    };
    let fn_input = |name: &str, ty: &str| serde_json::json!({ "name": name, "type": ty });

    serde_json::json!({
        "source": {
            "address": format!("{:?}", SOURCE_CONTRACT),
            "abi": [
                {
                    "type": "event",
                    "name": "Deposit",
                    "anonymous": false,
                    "inputs": [
                        event_input("token", "address", indexed),
                        event_input("recipient", "address", indexed),
                        event_input("amount", "uint256", false)
                    ]
                },
                {
                    "type": "function",
                    "name": "withdraw",
                    "stateMutability": "nonpayable",
                    "inputs": [
                        fn_input("underlying_token", "address"),
                        fn_input("recipient", "address"),
                        fn_input("amount", "uint256")
                    ],
                    "outputs": []
                }
            ]
        },
        "destination": {
            "address": format!("{:?}", DESTINATION_CONTRACT),
            "abi": [
                {
                    "type": "event",
                    "name": "Unwrap",
                    "anonymous": false,
                    "inputs": [
                        event_input("underlying_token", "address", indexed),
                        event_input("wrapped_token", "address", indexed),
                        event_input("frm", "address", indexed),
                        event_input("to", "address", false),
                        event_input("amount", "uint256", false)
                    ]
                },
                {
                    "type": "function",
                    "name": "wrap",
                    "stateMutability": "nonpayable",
                    "inputs": [
                        fn_input("token", "address"),
                        fn_input("recipient", "address"),
                        fn_input("amount", "uint256")
                    ],
                    "outputs": []
                }
            ]
        }
    })
    .to_string()
}

/// Deterministic transaction hash for a log fixture
pub fn tx_hash_at(block: u64, n: u64) -> B256 {
    word(U256::from(block) << 32 | U256::from(n))
}

pub fn raw_log(
    address: Address,
    topics: Vec<B256>,
    data: Vec<u8>,
    block: u64,
    tx_hash: B256,
    log_index: u64,
) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address,
            data: LogData::new_unchecked(topics, Bytes::from(data)),
        },
        block_number: Some(block),
        transaction_hash: Some(tx_hash),
        log_index: Some(log_index),
        ..Default::default()
    }
}

/// Big-endian 32-byte ABI word
pub fn word(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

fn words(params: &[B256]) -> Vec<u8> {
    params.iter().flat_map(|w| w.0).collect()
}

/// `Deposit` from the source contract, every parameter in data
pub fn deposit_log(
    block: u64,
    log_index: u64,
    token: Address,
    recipient: Address,
    amount: u64,
) -> Log {
    raw_log(
        SOURCE_CONTRACT,
        vec![EventKind::Deposit.topic()],
        words(&[
            token.into_word(),
            recipient.into_word(),
            word(U256::from(amount)),
        ]),
        block,
        tx_hash_at(block, log_index),
        log_index,
    )
}

/// `Deposit` laid out for `contract_info_json(true)`
pub fn indexed_deposit_log(
    block: u64,
    log_index: u64,
    token: Address,
    recipient: Address,
    amount: u64,
) -> Log {
    raw_log(
        SOURCE_CONTRACT,
        vec![
            EventKind::Deposit.topic(),
            token.into_word(),
            recipient.into_word(),
        ],
        words(&[word(U256::from(amount))]),
        block,
        tx_hash_at(block, log_index),
        log_index,
    )
}

/// `Unwrap` from the destination contract, every parameter in data
pub fn unwrap_log(block: u64, log_index: u64, from: Address, to: Address, amount: u64) -> Log {
    raw_log(
        DESTINATION_CONTRACT,
        vec![EventKind::Unwrap.topic()],
        words(&[
            TOKEN.into_word(),
            WRAPPED_TOKEN.into_word(),
            from.into_word(),
            to.into_word(),
            word(U256::from(amount)),
        ]),
        block,
        tx_hash_at(block, log_index),
        log_index,
    )
}

#[derive(Default)]
struct MockState {
    latest: u64,
    nonce: u64,
    gas_price: u128,
    /// block → (tx hash, logs) in inclusion order
    blocks: BTreeMap<u64, Vec<(B256, Vec<Log>)>>,
    max_log_range: Option<u64>,
    get_logs_error: Option<RpcError>,
    block_error: Option<RpcError>,
    block_number_error: Option<RpcError>,
    nonce_error: Option<RpcError>,
    /// send call index → rejection message
    send_failures: HashMap<usize, String>,
    sends: usize,
    sent: Vec<Bytes>,
    calls: HashMap<&'static str, usize>,
}

/// Scriptable in-memory chain
pub struct MockChain {
    chain_id: u64,
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new(chain_id: u64, latest: u64) -> Self {
        Self {
            chain_id,
            state: Mutex::new(MockState {
                latest,
                gas_price: 5_000_000_000,
                ..Default::default()
            }),
        }
    }

    fn with(self, f: impl FnOnce(&mut MockState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        self.with(|s| s.nonce = nonce)
    }

    pub fn with_gas_price(self, gas_price: u128) -> Self {
        self.with(|s| s.gas_price = gas_price)
    }

    /// Include `log` in its block, grouped by transaction hash
    pub fn with_log(self, log: Log) -> Self {
        self.with(|s| {
            let block = log.block_number.unwrap_or_default();
            let tx_hash = log.transaction_hash.unwrap_or_default();
            let txs = s.blocks.entry(block).or_default();
            match txs.iter_mut().find(|(hash, _)| *hash == tx_hash) {
                Some((_, logs)) => logs.push(log),
                None => txs.push((tx_hash, vec![log])),
            }
        })
    }

    pub fn with_logs(self, logs: impl IntoIterator<Item = Log>) -> Self {
        logs.into_iter().fold(self, |chain, log| chain.with_log(log))
    }

    /// Reject `eth_getLogs` spanning more than `blocks` blocks
    pub fn with_log_range_limit(self, blocks: u64) -> Self {
        self.with(|s| s.max_log_range = Some(blocks))
    }

    pub fn fail_get_logs(self, err: RpcError) -> Self {
        self.with(|s| s.get_logs_error = Some(err))
    }

    pub fn fail_blocks(self, err: RpcError) -> Self {
        self.with(|s| s.block_error = Some(err))
    }

    pub fn fail_block_number(self, err: RpcError) -> Self {
        self.with(|s| s.block_number_error = Some(err))
    }

    pub fn fail_nonce(self, err: RpcError) -> Self {
        self.with(|s| s.nonce_error = Some(err))
    }

    /// Reject the `index`-th raw transaction sent (0-based)
    pub fn fail_send_at(self, index: usize, message: &str) -> Self {
        self.with(|s| {
            s.send_failures.insert(index, message.to_string());
        })
    }

    pub fn sent_transactions(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or_default()
    }

    fn record(&self, method: &'static str) -> std::sync::MutexGuard<'_, MockState> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method).or_default() += 1;
        state
    }
}

pub fn query_limit_error(method: &'static str) -> RpcError {
    RpcError::new(
        method,
        RpcErrorKind::QueryLimit,
        "error code -32005: limit exceeded",
    )
}

pub fn connectivity_error(method: &'static str) -> RpcError {
    RpcError::new(method, RpcErrorKind::Connectivity, "connection refused")
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.record("eth_chainId");
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        let state = self.record("eth_blockNumber");
        match &state.block_number_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.latest),
        }
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>, RpcError> {
        let state = self.record("eth_getLogs");
        if let Some(err) = &state.get_logs_error {
            return Err(err.clone());
        }
        if let Some(max) = state.max_log_range {
            if query.to_block - query.from_block + 1 > max {
                return Err(query_limit_error("eth_getLogs"));
            }
        }
        Ok(state
            .blocks
            .range(query.from_block..=query.to_block)
            .flat_map(|(_, txs)| txs.iter().flat_map(|(_, logs)| logs.iter()))
            .filter(|log| {
                log.address() == query.address && log.topics().first() == Some(&query.topic0)
            })
            .cloned()
            .collect())
    }

    async fn block_transactions(&self, number: u64) -> Result<Vec<B256>, RpcError> {
        let state = self.record("eth_getBlockByNumber");
        if let Some(err) = &state.block_error {
            return Err(err.clone());
        }
        Ok(state
            .blocks
            .get(&number)
            .map(|txs| txs.iter().map(|(hash, _)| *hash).collect())
            .unwrap_or_default())
    }

    async fn receipt_logs(&self, tx_hash: B256) -> Result<Vec<Log>, RpcError> {
        let state = self.record("eth_getTransactionReceipt");
        state
            .blocks
            .values()
            .flat_map(|txs| txs.iter())
            .find(|(hash, _)| *hash == tx_hash)
            .map(|(_, logs)| logs.clone())
            .ok_or_else(|| {
                RpcError::new(
                    "eth_getTransactionReceipt",
                    RpcErrorKind::Rejected,
                    "receipt not found",
                )
            })
    }

    async fn transaction_count(&self, _address: Address) -> Result<u64, RpcError> {
        let state = self.record("eth_getTransactionCount");
        match &state.nonce_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.nonce),
        }
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        Ok(self.record("eth_gasPrice").gas_price)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError> {
        let mut state = self.record("eth_sendRawTransaction");
        let index = state.sends;
        state.sends += 1;
        if let Some(message) = state.send_failures.get(&index) {
            return Err(RpcError::new(
                "eth_sendRawTransaction",
                RpcErrorKind::Rejected,
                message.clone(),
            ));
        }
        let hash = alloy::primitives::keccak256(&raw);
        state.sent.push(raw);
        state.nonce += 1;
        Ok(hash)
    }
}

/// Connector handing out the same mock chain for a role on every connect
#[derive(Default)]
pub struct MockConnector {
    chains: HashMap<ChainRole, Arc<MockChain>>,
    connects: Mutex<HashMap<ChainRole, usize>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, role: ChainRole, chain: Arc<MockChain>) -> Self {
        self.chains.insert(role, chain);
        self
    }

    pub fn connect_count(&self, role: ChainRole) -> usize {
        self.connects
            .lock()
            .unwrap()
            .get(&role)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChainConnector for MockConnector {
    async fn connect(&self, role: ChainRole) -> Result<ChainHandle, RelayError> {
        *self.connects.lock().unwrap().entry(role).or_default() += 1;
        let chain = self.chains.get(&role).cloned().ok_or_else(|| RelayError::Connection {
            role,
            source: connectivity_error("eth_chainId"),
        })?;
        let chain_id = chain.chain_id;
        Ok(ChainHandle::new(
            role,
            chain_id,
            format!("mock://{}", role),
            true,
            chain,
        ))
    }
}

pub fn handle(role: ChainRole, chain: &Arc<MockChain>) -> ChainHandle {
    ChainHandle::new(role, chain.chain_id, format!("mock://{}", role), true, chain.clone())
}

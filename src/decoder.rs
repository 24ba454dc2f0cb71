//! Bridge event decoding
//!
//! Turns raw logs into [`BridgeEvent`]s. The topic0 of a log must equal the
//! keccak256 of the event's canonical signature; parameters are read from the
//! remaining topics (indexed) or from consecutive 32-byte data words, in the
//! order the contract ABI declares them.

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;

use crate::contracts::ContractBinding;
use crate::error::{DecodeError, RelayError};
use crate::types::{BridgeEvent, DepositEvent, EventKind, EventOrigin, UnwrapEvent};

const WORD: usize = 32;
const MAX_INDEXED: usize = 3;

/// Decoder for one event kind with a fixed parameter layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDecoder {
    kind: EventKind,
    topic: B256,
    /// Per ABI parameter: carried in a topic rather than in data
    indexed: Vec<bool>,
}

impl EventDecoder {
    /// Decoder for the plain layout: no indexed parameters
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            topic: kind.topic(),
            indexed: vec![false; kind.param_count()],
        }
    }

    /// Decoder for `kind` as declared in a contract's ABI, honouring its indexed flags
    pub fn for_binding(binding: &ContractBinding, kind: EventKind) -> Result<Self, RelayError> {
        let event = binding.event(kind).ok_or_else(|| {
            RelayError::config(format!(
                "{} contract ABI does not declare event {}",
                binding.role,
                kind.signature()
            ))
        })?;

        let indexed: Vec<bool> = event.inputs.iter().map(|input| input.indexed).collect();
        if indexed.len() != kind.param_count() {
            return Err(RelayError::config(format!(
                "{} declares {} parameters, expected {}",
                kind,
                indexed.len(),
                kind.param_count()
            )));
        }
        if indexed.iter().filter(|i| **i).count() > MAX_INDEXED {
            return Err(RelayError::config(format!(
                "{} declares more than {} indexed parameters",
                kind, MAX_INDEXED
            )));
        }

        Ok(Self {
            kind,
            topic: kind.topic(),
            indexed,
        })
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// topic0 of every log this decoder accepts
    pub fn topic(&self) -> B256 {
        self.topic
    }

    pub fn matches(&self, log: &Log) -> bool {
        log.topics().first() == Some(&self.topic)
    }

    pub fn decode(&self, log: &Log) -> Result<BridgeEvent, DecodeError> {
        if !self.matches(log) {
            return Err(DecodeError::TopicMismatch {
                expected: self.kind,
            });
        }

        let params = self.param_words(log)?;
        let origin = origin(log)?;

        let event = match self.kind {
            EventKind::Deposit => BridgeEvent::Deposit(DepositEvent {
                token: address_param(&params, 0)?,
                recipient: address_param(&params, 1)?,
                amount: U256::from_be_bytes(params[2].0),
                origin,
            }),
            EventKind::Unwrap => BridgeEvent::Unwrap(UnwrapEvent {
                underlying_token: address_param(&params, 0)?,
                wrapped_token: address_param(&params, 1)?,
                from: address_param(&params, 2)?,
                to: address_param(&params, 3)?,
                amount: U256::from_be_bytes(params[4].0),
                origin,
            }),
        };
        Ok(event)
    }

    /// One 32-byte word per ABI parameter, in declaration order
    fn param_words(&self, log: &Log) -> Result<Vec<B256>, DecodeError> {
        let topics = log.topics();
        let data = log.data().data.as_ref();

        let data_params = self.indexed.iter().filter(|i| !**i).count();
        let needed = data_params * WORD;
        if data.len() < needed {
            return Err(DecodeError::ShortData {
                len: data.len(),
                needed,
            });
        }

        let mut next_topic = 1;
        let mut next_word = 0;
        let mut words = Vec::with_capacity(self.indexed.len());
        for (param, indexed) in self.indexed.iter().enumerate() {
            if *indexed {
                let topic = topics
                    .get(next_topic)
                    .ok_or(DecodeError::MissingTopic { param })?;
                words.push(*topic);
                next_topic += 1;
            } else {
                let start = next_word * WORD;
                words.push(B256::from_slice(&data[start..start + WORD]));
                next_word += 1;
            }
        }
        Ok(words)
    }
}

fn address_param(params: &[B256], param: usize) -> Result<Address, DecodeError> {
    let word = params[param];
    if word[..12].iter().any(|b| *b != 0) {
        return Err(DecodeError::InvalidAddress { param });
    }
    Ok(Address::from_word(word))
}

fn origin(log: &Log) -> Result<EventOrigin, DecodeError> {
    Ok(EventOrigin {
        block_number: log
            .block_number
            .ok_or(DecodeError::MissingMetadata("block number"))?,
        tx_hash: log
            .transaction_hash
            .ok_or(DecodeError::MissingMetadata("transaction hash"))?,
        log_index: log
            .log_index
            .ok_or(DecodeError::MissingMetadata("log index"))?,
    })
}

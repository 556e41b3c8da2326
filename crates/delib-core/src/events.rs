//! Event log queries, decoding and argument filters

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use alloy::dyn_abi::EventExt;
use alloy::json_abi::Event;
use alloy::primitives::{Address, B256};
use alloy::rpc::types::{Filter, Log};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::abi::sol_value_to_json;
use crate::error::{Error, Result};
use crate::methods::MethodTable;

/// Event name that selects every event of a contract
pub const ALL_EVENTS: &str = "allEvents";

/// Inclusive block range for past log queries. `from_block` defaults to the
/// genesis block and `to_block` to the latest block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockRange {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

impl BlockRange {
    pub fn new(from_block: Option<u64>, to_block: Option<u64>) -> Self {
        Self {
            from_block,
            to_block,
        }
    }
}

/// Condition on one decoded event argument
#[derive(Clone)]
pub enum ArgMatch {
    Exact(Value),
    AnyOf(Vec<Value>),
    Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl ArgMatch {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        ArgMatch::Predicate(Arc::new(f))
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ArgMatch::Exact(expected) => same_value(expected, value),
            ArgMatch::AnyOf(options) => options.iter().any(|o| same_value(o, value)),
            ArgMatch::Predicate(f) => f(value),
        }
    }
}

impl fmt::Debug for ArgMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgMatch::Exact(v) => f.debug_tuple("Exact").field(v).finish(),
            ArgMatch::AnyOf(v) => f.debug_tuple("AnyOf").field(v).finish(),
            ArgMatch::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Argument name to condition. Every condition must hold.
pub type ArgFilter = BTreeMap<String, ArgMatch>;

/// Decoded values render integers as decimal strings and addresses in
/// checksum case, so numbers and hex strings are compared loosely.
fn same_value(expected: &Value, actual: &Value) -> bool {
    if expected == actual {
        return true;
    }
    match (normalize(expected), normalize(actual)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn normalize(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if s.starts_with("0x") => Some(s.to_ascii_lowercase()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// True when every condition holds. Conditions on arguments the event does
/// not have are ignored.
pub fn matches_filter(args: &Map<String, Value>, filter: &ArgFilter) -> bool {
    filter
        .iter()
        .all(|(name, condition)| args.get(name).is_none_or(|value| condition.matches(value)))
}

/// One decoded log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedEvent {
    pub event: String,
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
    pub args: Map<String, Value>,
}

/// Decode a log against an event definition. Unnamed inputs are keyed by
/// their position.
pub fn decode_log(event: &Event, log: &Log) -> Result<DecodedEvent> {
    let decoded = event
        .decode_log(log.data())
        .map_err(|e| Error::Abi(format!("Failed to decode {} log: {}", event.name, e)))?;

    let mut indexed = decoded.indexed.iter();
    let mut body = decoded.body.iter();
    let mut args = Map::new();

    for (position, input) in event.inputs.iter().enumerate() {
        let value = if input.indexed {
            indexed.next()
        } else {
            body.next()
        };
        let key = if input.name.is_empty() {
            position.to_string()
        } else {
            input.name.clone()
        };
        args.insert(key, value.map(sol_value_to_json).unwrap_or(Value::Null));
    }

    Ok(DecodedEvent {
        event: event.name.clone(),
        address: log.address(),
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
        log_index: log.log_index,
        args,
    })
}

/// Which events a query covers
#[derive(Debug, Clone)]
pub(crate) enum EventSelection {
    All,
    One(Event),
}

impl EventSelection {
    /// Validate an event name against a contract's event table
    pub(crate) fn lookup(table: &MethodTable, name: &str) -> Result<Self> {
        if name == ALL_EVENTS {
            return Ok(EventSelection::All);
        }
        table.event(name).cloned().map(EventSelection::One)
    }

    /// Log filter at `address`. An open `to_block` means the latest block.
    pub(crate) fn filter(&self, address: Address, from_block: u64, to_block: Option<u64>) -> Filter {
        let mut filter = Filter::new().address(address).from_block(from_block);
        if let Some(to_block) = to_block {
            filter = filter.to_block(to_block);
        }

        match self {
            EventSelection::One(event) => filter.event_signature(event.selector()),
            EventSelection::All => filter,
        }
    }

    /// Decode a log, or `None` for logs this selection does not describe
    pub(crate) fn decode(&self, table: &MethodTable, log: &Log) -> Option<Result<DecodedEvent>> {
        let topic = log.topics().first()?;
        let event = match self {
            EventSelection::One(event) if event.selector() == *topic => event,
            EventSelection::One(_) => return None,
            EventSelection::All => table.event_by_selector(topic)?,
        };
        Some(decode_log(event, log))
    }
}

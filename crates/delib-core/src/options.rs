//! Transaction option resolution
//!
//! Call-time options are merged over object-level defaults, filtered to a
//! fixed allow-list and coerced into a typed [`TxOptions`]. Resolution is pure
//! and idempotent: resolving [`TxOptions::to_raw`] again yields the same value.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Loosely typed options as they arrive from config files, CLI flags or a
/// trailing JSON object argument.
pub type RawOptions = Map<String, Value>;

/// Keys that survive filtering. Anything else is dropped.
pub const ALLOWED_KEYS: [&str; 9] = [
    "from",
    "to",
    "value",
    "gas",
    "gasPrice",
    "data",
    "nonce",
    "accountIndex",
    "maxGas",
];

/// Resolved transaction options.
///
/// Zero numeric values never appear here: a zero is "unset", which for `gas`
/// means "estimate me".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_gas: Option<u64>,
}

impl TxOptions {
    /// Copy of these options with `gas` cleared, as sent to gas estimation.
    pub fn without_gas(&self) -> Self {
        Self {
            gas: None,
            ..self.clone()
        }
    }

    /// Convert back into raw form so the options can be resolved again.
    pub fn to_raw(&self) -> RawOptions {
        let mut raw = RawOptions::new();
        if let Some(from) = self.from {
            raw.insert("from".into(), Value::String(from.to_string()));
        }
        if let Some(to) = self.to {
            raw.insert("to".into(), Value::String(to.to_string()));
        }
        if let Some(value) = self.value {
            raw.insert("value".into(), u256_to_json(value));
        }
        if let Some(gas) = self.gas {
            raw.insert("gas".into(), Value::from(gas));
        }
        if let Some(gas_price) = self.gas_price {
            raw.insert("gasPrice".into(), u256_to_json(U256::from(gas_price)));
        }
        if let Some(data) = &self.data {
            raw.insert("data".into(), Value::String(data.to_string()));
        }
        if let Some(nonce) = self.nonce {
            raw.insert("nonce".into(), Value::from(nonce));
        }
        if let Some(index) = self.account_index {
            raw.insert("accountIndex".into(), Value::from(index as u64));
        }
        if let Some(max_gas) = self.max_gas {
            raw.insert("maxGas".into(), Value::from(max_gas));
        }
        raw
    }

    /// Apply the value, gas, gas price and nonce fields to a request.
    /// `from`, `to` and `data` are set by the caller, which knows the target.
    pub fn apply_to(&self, mut request: TransactionRequest) -> TransactionRequest {
        if let Some(value) = self.value {
            request = request.with_value(value);
        }
        if let Some(gas) = self.gas {
            request = request.with_gas_limit(gas);
        }
        if let Some(gas_price) = self.gas_price {
            request = request.with_gas_price(gas_price);
        }
        if let Some(nonce) = self.nonce {
            request = request.with_nonce(nonce);
        }
        request
    }
}

/// Merge, filter and format in one step.
pub fn resolve(defaults: &RawOptions, call: Option<&RawOptions>) -> Result<TxOptions> {
    format(&filter(merge(defaults, call)))
}

/// Copy every default whose key is absent from the call options.
///
/// A key present in `call` always wins, even when its value is falsy.
pub fn merge(defaults: &RawOptions, call: Option<&RawOptions>) -> RawOptions {
    let mut merged = call.cloned().unwrap_or_default();
    for (key, value) in defaults {
        merged
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    merged
}

/// Drop keys outside [`ALLOWED_KEYS`] and keys holding a falsy value.
pub fn filter(mut options: RawOptions) -> RawOptions {
    options.retain(|key, value| ALLOWED_KEYS.contains(&key.as_str()) && is_truthy(value));
    options
}

/// Coerce filtered raw options into their declared types.
pub fn format(options: &RawOptions) -> Result<TxOptions> {
    let mut tx = TxOptions::default();

    for (key, value) in options {
        match key.as_str() {
            "from" => tx.from = Some(coerce_address(key, value)?),
            "to" => tx.to = Some(coerce_address(key, value)?),
            "data" => {
                let hex = coerce_string(key, value)?;
                let data: Bytes = hex
                    .parse()
                    .map_err(|e| Error::invalid_option(key, format!("invalid hex: {}", e)))?;
                tx.data = Some(data);
            }
            "value" => tx.value = Some(coerce_number(key, value)?).filter(|v| !v.is_zero()),
            "gas" => tx.gas = non_zero(narrow(key, coerce_number(key, value)?)?),
            "gasPrice" => tx.gas_price = non_zero(narrow(key, coerce_number(key, value)?)?),
            "nonce" => tx.nonce = non_zero(narrow(key, coerce_number(key, value)?)?),
            "maxGas" => tx.max_gas = non_zero(narrow(key, coerce_number(key, value)?)?),
            "accountIndex" => {
                let index: u64 = narrow(key, coerce_number(key, value)?)?;
                let index = usize::try_from(index)
                    .map_err(|_| Error::invalid_option(key, "index too large"))?;
                tx.account_index = Some(index).filter(|i| *i != 0);
            }
            _ => {}
        }
    }

    Ok(tx)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_string(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::invalid_option(key, "expected a string")),
    }
}

fn coerce_address(key: &str, value: &Value) -> Result<Address> {
    let s = coerce_string(key, value)?;
    s.trim()
        .parse()
        .map_err(|e| Error::invalid_option(key, format!("invalid address '{}': {}", s, e)))
}

fn coerce_number(key: &str, value: &Value) -> Result<U256> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Ok(U256::from(u));
            }
            if n.as_i64().is_some() {
                return Err(Error::invalid_option(key, "negative numbers are not allowed"));
            }
            match n.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f < u128::MAX as f64 => {
                    Ok(U256::from(f as u128))
                }
                _ => Err(Error::invalid_option(
                    key,
                    format!("{} is not a non-negative integer", n),
                )),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<U256>()
            .map_err(|e| Error::invalid_option(key, format!("invalid number '{}': {}", s, e))),
        _ => Err(Error::invalid_option(key, "expected a number")),
    }
}

fn narrow<T: TryFrom<U256>>(key: &str, n: U256) -> Result<T> {
    T::try_from(n).map_err(|_| Error::invalid_option(key, format!("{} is out of range", n)))
}

fn non_zero<T: Default + PartialEq>(n: T) -> Option<T> {
    (n != T::default()).then_some(n)
}

fn u256_to_json(n: U256) -> Value {
    u64::try_from(n)
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(n.to_string()))
}

//! ABI parsing and value conversion
//!
//! Provides the [`Abi`] wrapper used to describe a contract's callable
//! surface and the JSON <-> Solidity value conversions used by every
//! dispatch path.

use alloy::dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier};
use alloy::json_abi::{Event, JsonAbi, Param, StateMutability as AlloyStateMutability};
use alloy::primitives::{Address, Bytes, FixedBytes, I256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// =============================================================================
// Abi Struct
// =============================================================================

/// Wrapper around alloy's JsonAbi
#[derive(Debug, Clone)]
pub struct Abi(JsonAbi);

impl Abi {
    /// Parse a JSON ABI string
    pub fn parse(json: &str) -> Result<Self> {
        let abi: JsonAbi = serde_json::from_str(json)
            .map_err(|e| Error::Abi(format!("Failed to parse ABI: {}", e)))?;
        Ok(Self(abi))
    }

    /// Parse from a serde_json::Value
    pub fn from_value(value: &Value) -> Result<Self> {
        let abi: JsonAbi = serde_json::from_value(value.clone())
            .map_err(|e| Error::Abi(format!("Failed to parse ABI: {}", e)))?;
        Ok(Self(abi))
    }

    pub fn inner(&self) -> &JsonAbi {
        &self.0
    }

    /// Encode constructor arguments. Contracts without a constructor accept
    /// no arguments.
    pub fn encode_constructor(&self, args: &[Value]) -> Result<Vec<u8>> {
        match &self.0.constructor {
            Some(constructor) => {
                let values = json_to_sol_values(&constructor.inputs, args)?;
                constructor
                    .abi_encode_input(&values)
                    .map_err(|e| Error::Abi(format!("Failed to encode constructor: {}", e)))
            }
            None if args.is_empty() => Ok(Vec::new()),
            None => Err(Error::Abi(format!(
                "Contract has no constructor but {} argument(s) were given",
                args.len()
            ))),
        }
    }

    /// Summary of functions split into read (view/pure) and write
    pub fn functions(&self) -> ParsedFunctions {
        let (mut read, mut write): (Vec<_>, Vec<_>) = self
            .0
            .functions
            .values()
            .flatten()
            .map(|f| FunctionInfo {
                name: f.name.clone(),
                signature: f.signature(),
                inputs: f.inputs.iter().map(ParamInfo::from_abi_param).collect(),
                outputs: f.outputs.iter().map(ParamInfo::from_abi_param).collect(),
                payable: f.state_mutability == AlloyStateMutability::Payable,
                read_only: matches!(
                    f.state_mutability,
                    AlloyStateMutability::View | AlloyStateMutability::Pure
                ),
            })
            .partition(|f| f.read_only);

        read.sort_by(|a, b| a.name.cmp(&b.name));
        write.sort_by(|a, b| a.name.cmp(&b.name));

        ParsedFunctions { read, write }
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.0.events.values().flatten()
    }
}

/// Functions separated by read/write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFunctions {
    pub read: Vec<FunctionInfo>,
    pub write: Vec<FunctionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub signature: String,
    pub inputs: Vec<ParamInfo>,
    pub outputs: Vec<ParamInfo>,
    pub payable: bool,
    pub read_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub param_type: String,
}

impl ParamInfo {
    pub fn from_abi_param(param: &Param) -> Self {
        Self {
            name: param.name.clone(),
            param_type: param.selector_type().into_owned(),
        }
    }
}

// =============================================================================
// JSON <-> Solidity values
// =============================================================================

/// Convert positional JSON arguments for a parameter list
pub fn json_to_sol_values(params: &[Param], args: &[Value]) -> Result<Vec<DynSolValue>> {
    if params.len() != args.len() {
        return Err(Error::Abi(format!(
            "Expected {} parameters, got {}",
            params.len(),
            args.len()
        )));
    }

    params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (param, value))| {
            let ty = param
                .resolve()
                .map_err(|e| Error::Abi(format!("Parameter {}: {}", i, e)))?;
            json_to_sol_value(&ty, value)
                .map_err(|e| Error::Abi(format!("Parameter {} ({}): {}", i, param.name, e)))
        })
        .collect()
}

/// Convert a JSON value into a Solidity value of the given type.
///
/// Numbers may be given as JSON numbers or decimal/hex strings, tuples as
/// arrays in component order.
pub fn json_to_sol_value(ty: &DynSolType, value: &Value) -> std::result::Result<DynSolValue, String> {
    match ty {
        DynSolType::Address => {
            let s = value.as_str().ok_or("Expected string for address")?;
            let addr: Address = s
                .parse()
                .map_err(|e| format!("Invalid address '{}': {}", s, e))?;
            Ok(DynSolValue::Address(addr))
        }
        DynSolType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            Value::String(s) if s == "true" || s == "false" => Ok(DynSolValue::Bool(s == "true")),
            _ => Err("Expected boolean".to_string()),
        },
        DynSolType::Uint(bits) => Ok(DynSolValue::Uint(parse_uint(value)?, *bits)),
        DynSolType::Int(bits) => Ok(DynSolValue::Int(parse_int(value)?, *bits)),
        DynSolType::Bytes => {
            let s = value.as_str().ok_or("Expected hex string for bytes")?;
            let bytes: Bytes = s.parse().map_err(|e| format!("Invalid hex: {}", e))?;
            Ok(DynSolValue::Bytes(bytes.to_vec()))
        }
        DynSolType::String => match value {
            Value::String(s) => Ok(DynSolValue::String(s.clone())),
            Value::Number(n) => Ok(DynSolValue::String(n.to_string())),
            _ => Err("Expected string".to_string()),
        },
        DynSolType::FixedBytes(size) => {
            let s = value.as_str().ok_or("Expected hex string")?;
            let bytes: Bytes = s.parse().map_err(|e| format!("Invalid hex: {}", e))?;
            if bytes.len() > *size {
                return Err(format!("Expected {} bytes, got {}", size, bytes.len()));
            }
            // Right-pad short values, as Solidity does for bytesN literals
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(FixedBytes::from(word), *size))
        }
        DynSolType::Array(inner) => {
            let arr = value.as_array().ok_or("Expected array")?;
            let values = arr
                .iter()
                .map(|v| json_to_sol_value(inner, v))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Array(values))
        }
        DynSolType::FixedArray(inner, len) => {
            let arr = value.as_array().ok_or("Expected array")?;
            if arr.len() != *len {
                return Err(format!("Expected {} elements, got {}", len, arr.len()));
            }
            let values = arr
                .iter()
                .map(|v| json_to_sol_value(inner, v))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(DynSolValue::FixedArray(values))
        }
        DynSolType::Tuple(types) => {
            let arr = value.as_array().ok_or("Expected array for tuple")?;
            if arr.len() != types.len() {
                return Err(format!(
                    "Expected {} tuple components, got {}",
                    types.len(),
                    arr.len()
                ));
            }
            let values = types
                .iter()
                .zip(arr)
                .map(|(t, v)| json_to_sol_value(t, v))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Tuple(values))
        }
        other => Err(format!("Unsupported type: {}", other)),
    }
}

pub fn parse_uint(value: &Value) -> std::result::Result<U256, String> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(U256::from(u))
            } else if n.as_i64().is_some() {
                Err("Negative number not allowed for uint".to_string())
            } else {
                Err("Number too large, pass it as a string".to_string())
            }
        }
        Value::String(s) => s.parse::<U256>().map_err(|e| format!("Invalid uint: {}", e)),
        _ => Err("Expected number or string for uint".to_string()),
    }
}

pub fn parse_int(value: &Value) -> std::result::Result<I256, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(|i| I256::try_from(i).map_err(|e| e.to_string()))
            .unwrap_or_else(|| Err("Number out of range, pass it as a string".to_string())),
        Value::String(s) => s.parse::<I256>().map_err(|e| format!("Invalid int: {}", e)),
        _ => Err("Expected number or string for int".to_string()),
    }
}

/// Convert a decoded Solidity value to JSON. Integers become decimal strings
/// so that 256-bit values survive.
pub fn sol_value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Uint(n, _) => Value::String(n.to_string()),
        DynSolValue::Int(n, _) => Value::String(n.to_string()),
        DynSolValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        DynSolValue::FixedBytes(b, size) => {
            Value::String(format!("0x{}", hex::encode(&b[..*size])))
        }
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(arr) | DynSolValue::FixedArray(arr) | DynSolValue::Tuple(arr) => {
            Value::Array(arr.iter().map(sol_value_to_json).collect())
        }
        _ => Value::Null,
    }
}

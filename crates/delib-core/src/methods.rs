//! Method and event tables built once from a parsed ABI

use std::collections::BTreeMap;

use alloy::dyn_abi::{FunctionExt, JsonAbiExt};
use alloy::json_abi::{Event, Function, StateMutability};
use alloy::primitives::{Bytes, B256};
use serde_json::Value;

use crate::abi::{json_to_sol_values, sol_value_to_json, Abi};
use crate::error::{Error, Result};

/// How a method may be dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// view or pure
    Read,
    /// nonpayable
    Write,
    Payable,
}

impl From<StateMutability> for MethodKind {
    fn from(sm: StateMutability) -> Self {
        match sm {
            StateMutability::Pure | StateMutability::View => MethodKind::Read,
            StateMutability::NonPayable => MethodKind::Write,
            StateMutability::Payable => MethodKind::Payable,
        }
    }
}

/// One callable ABI function
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub function: Function,
    pub kind: MethodKind,
}

impl MethodDescriptor {
    pub fn new(function: Function) -> Self {
        let kind = function.state_mutability.into();
        Self { function, kind }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn signature(&self) -> String {
        self.function.signature()
    }

    pub fn is_read_only(&self) -> bool {
        self.kind == MethodKind::Read
    }

    /// Selector followed by the ABI-encoded arguments
    pub fn encode(&self, args: &[Value]) -> Result<Bytes> {
        let values = json_to_sol_values(&self.function.inputs, args)?;
        let encoded = self
            .function
            .abi_encode_input(&values)
            .map_err(|e| Error::Abi(format!("Failed to encode {}: {}", self.signature(), e)))?;
        Ok(Bytes::from(encoded))
    }

    /// Decode return data. No outputs decode to null, one output to a bare
    /// value, several outputs to an array.
    pub fn decode(&self, data: &[u8]) -> Result<Value> {
        if self.function.outputs.is_empty() {
            return Ok(Value::Null);
        }

        let decoded = self
            .function
            .abi_decode_output(data)
            .map_err(|e| Error::Abi(format!("Failed to decode {}: {}", self.signature(), e)))?;

        let mut values: Vec<Value> = decoded.iter().map(sol_value_to_json).collect();
        if values.len() == 1 {
            Ok(values.remove(0))
        } else {
            Ok(Value::Array(values))
        }
    }
}

/// Lookup table of a contract's methods and events
#[derive(Debug, Clone)]
pub struct MethodTable {
    contract: String,
    methods: BTreeMap<String, Vec<MethodDescriptor>>,
    events: BTreeMap<String, Event>,
}

impl MethodTable {
    pub fn from_abi(contract: impl Into<String>, abi: &Abi) -> Self {
        let methods = abi
            .inner()
            .functions
            .iter()
            .map(|(name, overloads)| {
                let descriptors = overloads.iter().cloned().map(MethodDescriptor::new).collect();
                (name.clone(), descriptors)
            })
            .collect();

        // Overloaded events resolve to the first declaration
        let mut events = BTreeMap::new();
        for event in abi.events() {
            events
                .entry(event.name.clone())
                .or_insert_with(|| event.clone());
        }

        Self {
            contract: contract.into(),
            methods,
            events,
        }
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Find the method to dispatch for `name` and `arity` positional arguments.
    ///
    /// `name` may be a bare name or a full signature such as
    /// `transfer(address,uint256)`. For a bare name the overload with matching
    /// arity is preferred, falling back to the first overload so that the
    /// argument count error comes from encoding.
    pub fn resolve(&self, name: &str, arity: usize) -> Result<&MethodDescriptor> {
        let lookup = match name.split_once('(') {
            Some((base, _)) => self
                .methods
                .get(base)
                .and_then(|overloads| overloads.iter().find(|m| m.signature() == name)),
            None => self.methods.get(name).and_then(|overloads| {
                overloads
                    .iter()
                    .find(|m| m.function.inputs.len() == arity)
                    .or_else(|| overloads.first())
            }),
        };

        lookup.ok_or_else(|| Error::invalid_method(&self.contract, name))
    }

    pub fn event(&self, name: &str) -> Result<&Event> {
        self.events
            .get(name)
            .ok_or_else(|| Error::invalid_method(&self.contract, name))
    }

    /// Find the event whose topic0 matches a log
    pub fn event_by_selector(&self, selector: &B256) -> Option<&Event> {
        self.events
            .values()
            .find(|event| !event.anonymous && event.selector() == *selector)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values().flatten()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }
}

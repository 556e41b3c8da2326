//! Per-contract address ledger
//!
//! Every deployment of a contract appends one [`AddressRecord`] to
//! `<ContractName>Addresses.json` in the ledger directory. The most recent
//! valid record is the contract's current address. Older plain-text
//! `<ContractName>Addresses` files (one address per line) are still read and
//! are migrated to JSON on the next write.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

const SUFFIX: &str = "Addresses";

/// Length of `0x` followed by 40 hex characters
pub const ADDRESS_LENGTH: usize = 42;

/// One deployment of a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: String,
    /// Library name to linked library address
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, String>,
}

impl AddressRecord {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            links: BTreeMap::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_address(&self.address)
    }

    pub fn parsed(&self) -> Result<Address> {
        self.address
            .parse()
            .map_err(|_| Error::InvalidAddress(self.address.clone()))
    }
}

/// True for `0x` followed by exactly 40 hex characters
pub fn is_valid_address(address: &str) -> bool {
    address.len() == ADDRESS_LENGTH
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// File-backed ledger rooted at a directory
#[derive(Debug, Clone)]
pub struct AddressLedger {
    dir: PathBuf,
}

impl AddressLedger {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn json_path(&self, contract: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", contract, SUFFIX))
    }

    fn legacy_path(&self, contract: &str) -> PathBuf {
        self.dir.join(format!("{}{}", contract, SUFFIX))
    }

    /// Append a deployment address. Returns the number of stored records.
    pub fn set(
        &self,
        contract: &str,
        address: &str,
        links: &BTreeMap<String, String>,
    ) -> Result<usize> {
        if !is_valid_address(address) {
            return Err(Error::InvalidAddress(address.to_string()));
        }

        let mut records = match self.records(contract) {
            Ok(records) => records,
            Err(Error::LedgerNotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        records.push(AddressRecord {
            address: address.to_string(),
            links: links.clone(),
        });

        fs::create_dir_all(&self.dir)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(serde_json::to_string_pretty(&records)?.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(self.json_path(contract)).map_err(|e| e.error)?;

        let legacy = self.legacy_path(contract);
        if legacy.exists() {
            fs::remove_file(legacy)?;
        }

        tracing::info!(contract, address, count = records.len(), "recorded address");
        Ok(records.len())
    }

    /// Most recent valid record, or the most recent valid record at or
    /// before `index`.
    pub fn get(&self, contract: &str, index: Option<usize>) -> Result<AddressRecord> {
        let records = self.records(contract)?;
        if records.is_empty() {
            return Err(Error::NoValidAddress(contract.to_string()));
        }

        let start = index.unwrap_or(records.len() - 1);
        if start >= records.len() {
            return Err(Error::OutOfRange {
                index: start,
                len: records.len(),
            });
        }

        records[..=start]
            .iter()
            .rev()
            .find(|r| r.is_valid())
            .cloned()
            .ok_or_else(|| Error::NoValidAddress(contract.to_string()))
    }

    /// Current address of a contract, parsed
    pub fn current(&self, contract: &str) -> Result<Address> {
        self.get(contract, None)?.parsed()
    }

    /// Every valid record in deployment order
    pub fn get_all(&self, contract: &str) -> Result<Vec<AddressRecord>> {
        Ok(self
            .records(contract)?
            .into_iter()
            .filter(AddressRecord::is_valid)
            .collect())
    }

    /// Every stored record in deployment order, malformed ones included.
    /// Positions match the `index` accepted by [`AddressLedger::get`].
    pub fn records(&self, contract: &str) -> Result<Vec<AddressRecord>> {
        let json_path = self.json_path(contract);
        if json_path.exists() {
            let content = fs::read_to_string(&json_path)?;
            let entries: Vec<Value> = serde_json::from_str(&content)?;
            return Ok(entries
                .into_iter()
                .map(|entry| match entry {
                    Value::String(address) => AddressRecord::new(address),
                    other => serde_json::from_value(other)
                        .unwrap_or_else(|_| AddressRecord::new(String::new())),
                })
                .collect());
        }

        let legacy = self.legacy_path(contract);
        if legacy.exists() {
            let content = fs::read_to_string(&legacy)?;
            return Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(AddressRecord::new)
                .collect());
        }

        Err(Error::LedgerNotFound(contract.to_string()))
    }
}

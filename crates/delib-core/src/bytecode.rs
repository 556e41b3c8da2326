//! Bytecode handling and library linking
//!
//! Compiled bytecode may contain 40-character library placeholders where a
//! library address belongs. Two placeholder styles are recognised:
//!
//! - `__Name______________________________` with the library key truncated to
//!   36 characters and padded with underscores
//! - `__$<hash>$__` where `<hash>` is the first 34 hex characters of
//!   `keccak256(key)`

use std::collections::BTreeMap;

use alloy::primitives::{keccak256, Address};

use crate::error::{Error, Result};

/// Width of a placeholder, equal to a hex-encoded address
const PLACEHOLDER_LEN: usize = 40;
const KEY_LEN: usize = 36;
const HASH_LEN: usize = 34;

/// Decoded, fully linked contract bytecode
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    bytes: Vec<u8>,
}

impl Bytecode {
    /// Decode from a hex string (with or without 0x prefix). Unlinked
    /// placeholders fail with [`Error::UnlinkedBytecode`].
    pub fn from_hex(hex: &str) -> Result<Self> {
        let clean = hex.trim_start_matches("0x");
        if clean.is_empty() {
            return Ok(Self::default());
        }

        let unlinked = unlinked_references(clean);
        if !unlinked.is_empty() {
            return Err(Error::UnlinkedBytecode(unlinked));
        }

        Ok(Self {
            bytes: hex::decode(clean)?,
        })
    }

    /// Append ABI-encoded constructor arguments
    pub fn with_constructor_args(mut self, encoded: &[u8]) -> Self {
        self.bytes.extend_from_slice(encoded);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// A placeholder found in unlinked bytecode
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placeholder {
    /// Library key with padding removed
    Named(String),
    /// First 34 hex characters of the key hash
    Hashed(String),
}

impl Placeholder {
    fn parse(slot: &str) -> Self {
        let inner = &slot[2..PLACEHOLDER_LEN - 2];
        if inner.starts_with('$') && inner.ends_with('$') {
            Placeholder::Hashed(inner[1..inner.len() - 1].to_ascii_lowercase())
        } else {
            Placeholder::Named(inner.trim_end_matches('_').to_string())
        }
    }

    fn label(&self) -> String {
        match self {
            Placeholder::Named(name) => name.clone(),
            Placeholder::Hashed(hash) => format!("${}$", hash),
        }
    }

    /// Whether a library key given by the user fills this placeholder
    fn matches(&self, key: &str) -> bool {
        match self {
            Placeholder::Named(name) => {
                let truncated: String = key.chars().take(KEY_LEN).collect();
                *name == truncated || short_name(name) == key
            }
            Placeholder::Hashed(hash) => *hash == placeholder_hash(key),
        }
    }
}

/// `Name` out of a `path/File.sol:Name` key
fn short_name(key: &str) -> &str {
    key.rsplit(':').next().unwrap_or(key)
}

/// First 34 hex characters of `keccak256(key)`
pub fn placeholder_hash(key: &str) -> String {
    let hash = hex::encode(keccak256(key.as_bytes()));
    hash[..HASH_LEN].to_string()
}

/// Every placeholder with the byte offset (in hex characters) it starts at
fn placeholders(hex: &str) -> Vec<(usize, Placeholder)> {
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(offset) = hex[pos..].find("__") {
        let start = pos + offset;
        let end = start + PLACEHOLDER_LEN;
        if end > hex.len() || !hex.is_char_boundary(end) {
            break;
        }
        let slot = &hex[start..end];
        if slot.ends_with("__") {
            found.push((start, Placeholder::parse(slot)));
            pos = end;
        } else {
            pos = start + 1;
        }
    }
    found
}

/// Labels of the placeholders still present in `hex`, deduplicated in order
pub fn unlinked_references(hex: &str) -> Vec<String> {
    let mut labels = Vec::new();
    for (_, placeholder) in placeholders(hex) {
        let label = placeholder.label();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Replace library placeholders with addresses.
///
/// `links` keys may be a bare library name or a fully qualified
/// `path:Name`. Placeholders without a matching key are left in place so
/// that [`Bytecode::from_hex`] reports them.
pub fn link(hex: &str, links: &BTreeMap<String, Address>) -> String {
    let prefixed = hex.starts_with("0x");
    let clean = hex.trim_start_matches("0x");
    let mut linked = clean.to_string();

    for (start, placeholder) in placeholders(clean) {
        let address = links
            .iter()
            .find(|(key, _)| placeholder.matches(key))
            .map(|(_, address)| address);

        if let Some(address) = address {
            let replacement = hex::encode(address.as_slice());
            linked.replace_range(start..start + PLACEHOLDER_LEN, &replacement);
            tracing::debug!(library = %placeholder.label(), %address, "linked library");
        }
    }

    if prefixed {
        format!("0x{}", linked)
    } else {
        linked
    }
}

/// Link and decode in one step, with string addresses as stored in the ledger
pub fn link_bytecode(hex: &str, links: &BTreeMap<String, String>) -> Result<Bytecode> {
    let parsed = links
        .iter()
        .map(|(name, address)| {
            address
                .parse::<Address>()
                .map(|address| (name.clone(), address))
                .map_err(|_| Error::InvalidAddress(address.clone()))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    Bytecode::from_hex(&link(hex, &parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_placeholder(name: &str) -> String {
        format!("__{:_<38}", name)
    }

    fn lib_address() -> Address {
        Address::repeat_byte(0xbb)
    }

    #[test]
    fn test_bytecode_from_hex() {
        let bytecode = Bytecode::from_hex("0x6080604052").unwrap();
        assert_eq!(bytecode.into_bytes(), vec![0x60, 0x80, 0x60, 0x40, 0x52]);

        let bytecode = Bytecode::from_hex("6080604052").unwrap();
        assert_eq!(bytecode.into_bytes().len(), 5);
    }

    #[test]
    fn test_bytecode_empty() {
        assert!(Bytecode::from_hex("0x").unwrap().into_bytes().is_empty());
        assert!(Bytecode::from_hex("").unwrap().into_bytes().is_empty());
    }

    #[test]
    fn test_bytecode_invalid_hex() {
        assert!(matches!(Bytecode::from_hex("0xzz"), Err(Error::Hex(_))));
    }

    #[test]
    fn test_constructor_args_appended() {
        let bytecode = Bytecode::from_hex("0x6080")
            .unwrap()
            .with_constructor_args(&[0x01, 0x02]);
        assert_eq!(bytecode.into_bytes(), vec![0x60, 0x80, 0x01, 0x02]);
    }

    #[test]
    fn test_named_placeholder() {
        let placeholder = named_placeholder("MathLib");
        assert_eq!(placeholder.len(), 40);

        let code = format!("0x6080{}6040", placeholder);
        assert_eq!(unlinked_references(&code), vec!["MathLib".to_string()]);
        assert!(matches!(
            Bytecode::from_hex(&code),
            Err(Error::UnlinkedBytecode(ref names)) if names == &["MathLib".to_string()]
        ));

        let links = BTreeMap::from([("MathLib".to_string(), lib_address())]);
        let linked = link(&code, &links);
        assert_eq!(linked, format!("0x6080{}6040", "bb".repeat(20)));
        assert_eq!(Bytecode::from_hex(&linked).unwrap().into_bytes().len(), 24);
    }

    #[test]
    fn test_named_placeholder_with_path() {
        let code = format!("6080{}", named_placeholder("contracts/Math.sol:MathLib"));
        let links = BTreeMap::from([("MathLib".to_string(), lib_address())]);
        assert!(unlinked_references(&link(&code, &links)).is_empty());
    }

    #[test]
    fn test_hashed_placeholder() {
        let key = "contracts/Math.sol:MathLib";
        let code = format!("6080__${}$__00", placeholder_hash(key));

        assert_eq!(unlinked_references(&code).len(), 1);

        let links = BTreeMap::from([(key.to_string(), lib_address())]);
        let linked = link(&code, &links);
        assert_eq!(linked, format!("6080{}00", "bb".repeat(20)));
    }

    #[test]
    fn test_unmatched_links_leave_placeholder() {
        let code = format!("6080{}", named_placeholder("MathLib"));
        let links = BTreeMap::from([("Other".to_string(), lib_address())]);
        assert_eq!(unlinked_references(&link(&code, &links)), vec!["MathLib"]);
    }

    #[test]
    fn test_link_bytecode_rejects_bad_address() {
        let code = format!("6080{}", named_placeholder("MathLib"));
        let links = BTreeMap::from([("MathLib".to_string(), "0x12".to_string())]);
        assert!(matches!(
            link_bytecode(&code, &links),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_repeated_placeholder_reported_once() {
        let placeholder = named_placeholder("MathLib");
        let code = format!("{}60{}", placeholder, placeholder);
        assert_eq!(unlinked_references(&code), vec!["MathLib"]);

        let links = BTreeMap::from([("MathLib".to_string(), lib_address())]);
        assert!(unlinked_references(&link(&code, &links)).is_empty());
    }
}

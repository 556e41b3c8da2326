//! Compiled contract artifacts
//!
//! One `<ContractName>.json` file per contract in the build directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::abi::Abi;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub abi: Value,
    /// Hex bytecode, possibly containing library placeholders
    #[serde(default)]
    pub bytecode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl Artifact {
    pub fn parsed_abi(&self) -> Result<Abi> {
        Abi::from_value(&self.abi)
    }

    /// Interfaces and abstract contracts compile to empty bytecode
    pub fn is_deployable(&self) -> bool {
        !self.bytecode.trim_start_matches("0x").is_empty()
    }
}

/// Reads and writes artifacts in a build directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    pub fn load(&self, name: &str) -> Result<Artifact> {
        let content = fs::read_to_string(self.path(name))
            .map_err(|_| Error::ArtifactNotFound(name.to_string()))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, artifact: &Artifact) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(&artifact.contract_name);
        fs::write(&path, serde_json::to_string_pretty(artifact)?)?;
        tracing::debug!(contract = %artifact.contract_name, path = %path.display(), "saved artifact");
        Ok(path)
    }

    /// Names of every stored artifact, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bank() -> Artifact {
        Artifact {
            contract_name: "Bank".into(),
            abi: json!([]),
            bytecode: "0x6080".into(),
            metadata: None,
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("built"));

        let path = store.save(&bank()).unwrap();
        assert!(path.ends_with("Bank.json"));
        assert_eq!(store.load("Bank").unwrap(), bank());
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(
            store.load("Bank"),
            Err(Error::ArtifactNotFound(ref name)) if name == "Bank"
        ));
    }

    #[test]
    fn test_list_sorted_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&Artifact { contract_name: "Vault".into(), ..bank() }).unwrap();
        store.save(&bank()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(store.list().unwrap(), vec!["Bank", "Vault"]);
        assert!(ArtifactStore::new(dir.path().join("missing")).list().unwrap().is_empty());
    }

    #[test]
    fn test_camel_case_layout() {
        let artifact: Artifact = serde_json::from_value(json!({
            "contractName": "Lib",
            "abi": [],
            "bytecode": "0x",
        }))
        .unwrap();
        assert!(!artifact.is_deployable());
        assert!(artifact.parsed_abi().is_ok());
    }
}

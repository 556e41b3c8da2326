//! Solidity compilation through the `solc` binary

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use color_eyre::eyre::{eyre, Result};
use delib_core::Artifact;
use serde::Deserialize;
use serde_json::Value;

/// Output of `solc --combined-json abi,bin,metadata`
#[derive(Debug, Deserialize)]
struct CombinedOutput {
    contracts: BTreeMap<String, CombinedContract>,
}

#[derive(Debug, Deserialize)]
struct CombinedContract {
    /// Older compilers emit the ABI as a JSON string
    abi: Value,
    #[serde(default)]
    bin: String,
    #[serde(default)]
    metadata: Option<String>,
}

pub struct Solc {
    binary: String,
    contracts_dir: PathBuf,
}

impl Solc {
    pub fn new(binary: impl Into<String>, contracts_dir: &Path) -> Self {
        Self {
            binary: binary.into(),
            contracts_dir: contracts_dir.to_path_buf(),
        }
    }

    /// Compile source files relative to the contracts directory. `.sol` is
    /// appended to names given without it.
    pub fn compile(&self, files: &[String]) -> Result<Vec<Artifact>> {
        let files: Vec<String> = files.iter().map(|f| source_file(f)).collect();

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--combined-json")
            .arg("abi,bin,metadata")
            .args(&files)
            .current_dir(&self.contracts_dir);

        tracing::debug!(solc = %self.binary, files = ?files, "compiling");
        let output = cmd
            .output()
            .map_err(|e| eyre!("Could not run {}: {}", self.binary, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(eyre!("Compilation failed:\n{}", stderr));
        }

        parse_combined_json(&String::from_utf8_lossy(&output.stdout))
    }
}

fn source_file(name: &str) -> String {
    if name.ends_with(".sol") {
        name.to_string()
    } else {
        format!("{}.sol", name)
    }
}

/// One artifact per contract, keyed by the name after the last `:`
pub fn parse_combined_json(output: &str) -> Result<Vec<Artifact>> {
    let combined: CombinedOutput = serde_json::from_str(output)?;

    combined
        .contracts
        .into_iter()
        .map(|(key, contract)| -> Result<Artifact> {
            let contract_name = key.rsplit(':').next().unwrap_or(&key).to_string();
            let abi = match contract.abi {
                Value::String(s) => serde_json::from_str(&s)?,
                other => other,
            };
            let bytecode = if contract.bin.is_empty() {
                String::new()
            } else {
                format!("0x{}", contract.bin.trim_start_matches("0x"))
            };

            Ok(Artifact {
                contract_name,
                abi,
                bytecode,
                metadata: contract.metadata.filter(|m| !m.is_empty()),
            })
        })
        .collect()
}

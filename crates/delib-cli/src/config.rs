use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, Result};
use delib_core::{Error, ProjectRoot, RawOptions, Settings};
use serde::{Deserialize, Serialize};

/// Project configuration file structure (delib.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DelibConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub transactions: TransactionsConfig,
    #[serde(default)]
    pub signers: SignersConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Directories, relative to the project root
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_contracts")]
    pub contracts: PathBuf,
    #[serde(default = "default_built")]
    pub built: PathBuf,
    #[serde(default = "default_addresses")]
    pub addresses: PathBuf,
}

fn default_contracts() -> PathBuf {
    PathBuf::from("contracts")
}

fn default_built() -> PathBuf {
    PathBuf::from("built")
}

fn default_addresses() -> PathBuf {
    PathBuf::from("addresses")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            contracts: default_contracts(),
            built: default_built(),
            addresses: default_addresses(),
        }
    }
}

/// Node endpoint. The first of `rpc`, `ws` and `ipc` that is set is used.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConnectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipc: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionsConfig {
    #[serde(default)]
    pub account_index: usize,
    #[serde(default)]
    pub gas_margin: f64,
    /// Default transaction options, keyed as in a call options object
    #[serde(default)]
    pub defaults: toml::Table,
}

/// Local signing keys. Entries may reference environment variables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SignersConfig {
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompilerConfig {
    #[serde(default = "default_solc")]
    pub solc: String,
}

fn default_solc() -> String {
    "solc".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            solc: default_solc(),
        }
    }
}

impl DelibConfig {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| eyre!("Could not read {}", path.display()))?;
        Ok(toml::from_str(&content)?)
    }

    /// Find the project root from the current directory and load its config.
    /// Outside a project the defaults apply, rooted at the current directory.
    pub fn discover() -> Result<(ProjectRoot, Self)> {
        let cwd = std::env::current_dir()?;
        match ProjectRoot::discover(&cwd, ProjectRoot::SEARCH_LEVELS) {
            Some(root) => {
                let config = Self::load_from(&root.config_path())?;
                tracing::debug!(root = %root.path().display(), "loaded project config");
                Ok((root, config))
            }
            None => Ok((ProjectRoot::at(cwd), Self::default())),
        }
    }

    /// Connection string for the configured endpoint
    pub fn endpoint(&self) -> Result<String> {
        let connection = &self.connection;
        let endpoint = connection
            .rpc
            .as_ref()
            .or(connection.ws.as_ref())
            .or(connection.ipc.as_ref())
            .ok_or_else(|| {
                Error::Configuration(
                    "no connection configured; set [connection] rpc, ws or ipc in delib.toml"
                        .into(),
                )
            })?;
        resolve_env_var(endpoint)
    }

    /// Private keys with environment references resolved
    pub fn signer_keys(&self) -> Result<Vec<String>> {
        self.signers.keys.iter().map(|k| resolve_env_var(k)).collect()
    }

    /// Context settings from the `[transactions]` section
    pub fn settings(&self) -> Result<Settings> {
        let defaults = serde_json::to_value(&self.transactions.defaults)?;
        let defaults: RawOptions = match defaults {
            serde_json::Value::Object(map) => map,
            _ => RawOptions::new(),
        };

        Ok(Settings {
            defaults,
            account_index: self.transactions.account_index,
            gas_margin: self.transactions.gas_margin,
        })
    }
}

/// Resolve environment variable references in a string
/// Supports ${VAR_NAME} syntax
fn resolve_env_var(value: &str) -> Result<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).map_err(|_| eyre!("Environment variable '{}' not set", var_name))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[paths]
contracts = "src"
built = "out"

[connection]
rpc = "http://localhost:8545"

[transactions]
account_index = 1
gas_margin = 0.05

[transactions.defaults]
gas = 0
maxGas = 3000000

[signers]
keys = ["0x01"]

[compiler]
solc = "/usr/bin/solc"
"#;

        let config: DelibConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.paths.contracts, PathBuf::from("src"));
        assert_eq!(config.paths.addresses, PathBuf::from("addresses"));
        assert_eq!(config.endpoint().unwrap(), "http://localhost:8545");
        assert_eq!(config.compiler.solc, "/usr/bin/solc");

        let settings = config.settings().unwrap();
        assert_eq!(settings.account_index, 1);
        assert_eq!(settings.gas_margin, 0.05);
        assert_eq!(settings.defaults["gas"], json!(0));
        assert_eq!(settings.defaults["maxGas"], json!(3_000_000));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: DelibConfig = toml::from_str("").unwrap();

        assert_eq!(config.paths.built, PathBuf::from("built"));
        assert_eq!(config.compiler.solc, "solc");
        assert!(config.signers.keys.is_empty());
        assert_eq!(config.settings().unwrap(), Settings::default());
    }

    #[test]
    fn test_missing_connection() {
        let config = DelibConfig::default();
        let err = config.endpoint().unwrap_err();
        assert!(err.to_string().contains("no connection configured"));
    }

    #[test]
    fn test_endpoint_priority() {
        let config: DelibConfig = toml::from_str(
            r#"
[connection]
ipc = "/tmp/geth.ipc"
ws = "ws://localhost:8546"
"#,
        )
        .unwrap();
        assert_eq!(config.endpoint().unwrap(), "ws://localhost:8546");
    }

    #[test]
    fn test_env_resolution() {
        std::env::set_var("DELIB_TEST_RPC_URL", "http://rpc.test:8545");
        std::env::set_var("DELIB_TEST_KEY", "0xabc");

        let config: DelibConfig = toml::from_str(
            r#"
[connection]
rpc = "${DELIB_TEST_RPC_URL}"

[signers]
keys = ["${DELIB_TEST_KEY}", "0xdef"]
"#,
        )
        .unwrap();

        assert_eq!(config.endpoint().unwrap(), "http://rpc.test:8545");
        assert_eq!(config.signer_keys().unwrap(), vec!["0xabc", "0xdef"]);

        std::env::remove_var("DELIB_TEST_RPC_URL");
        std::env::remove_var("DELIB_TEST_KEY");
    }

    #[test]
    fn test_resolve_env_var_missing() {
        assert!(resolve_env_var("${DELIB_NONEXISTENT_VAR_99999}").is_err());
        assert_eq!(resolve_env_var("literal").unwrap(), "literal");
    }

    #[test]
    fn test_roundtrip_written_config() {
        let mut config = DelibConfig::default();
        config.connection.rpc = Some("http://localhost:8545".into());
        let written = toml::to_string_pretty(&config).unwrap();
        let parsed: DelibConfig = toml::from_str(&written).unwrap();
        assert_eq!(parsed.endpoint().unwrap(), "http://localhost:8545");
    }
}

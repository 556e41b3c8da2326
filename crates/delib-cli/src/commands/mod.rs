//! CLI commands for delib

use std::path::PathBuf;

use alloy::primitives::utils::parse_ether;
use clap::{Args, Subcommand};
use color_eyre::eyre::{eyre, Result};
use delib_core::{AddressLedger, ArtifactStore, ConnectionContext, ProjectRoot, RawOptions};
use serde_json::Value;

use crate::config::DelibConfig;
use crate::transport::AlloyTransport;

pub mod addresses;
pub mod balance;
pub mod build;
pub mod create;
pub mod deploy;
pub mod exec;
pub mod info;
pub mod init;
pub mod logs;
pub mod set;
pub mod unlock;

/// All available CLI commands
#[derive(Subcommand)]
pub enum Command {
    /// Create delib.toml and the contract directories
    Init(init::InitCommand),

    /// Compile Solidity sources with solc
    Build(build::BuildCommand),

    /// Deploy a built contract and record its address
    Deploy(deploy::DeployCommand),

    /// Record an address for a contract
    Set(set::SetCommand),

    /// List the recorded addresses of a contract
    Addresses(addresses::AddressesCommand),

    /// Show the methods and events of a built contract
    Info(info::InfoCommand),

    /// Call, estimate or send a contract method
    Exec(exec::ExecCommand),

    /// Read or watch contract event logs
    Logs(logs::LogsCommand),

    /// Show the balance of an account
    Balance(balance::BalanceCommand),

    /// Create a node-managed account
    Create(create::CreateCommand),

    /// Unlock a node-managed account
    Unlock(unlock::UnlockCommand),
}

impl Command {
    /// Execute the command
    pub async fn run(self, globals: GlobalArgs) -> Result<()> {
        match self {
            Command::Init(cmd) => cmd.run().await,
            Command::Build(cmd) => cmd.run(&Project::load(globals)?).await,
            Command::Deploy(cmd) => cmd.run(&Project::load(globals)?).await,
            Command::Set(cmd) => cmd.run(&Project::load(globals)?).await,
            Command::Addresses(cmd) => cmd.run(&Project::load(globals)?).await,
            Command::Info(cmd) => cmd.run(&Project::load(globals)?).await,
            Command::Exec(cmd) => cmd.run(&Project::load(globals)?).await,
            Command::Logs(cmd) => cmd.run(&Project::load(globals)?).await,
            Command::Balance(cmd) => cmd.run(&Project::load(globals)?).await,
            Command::Create(cmd) => cmd.run(&Project::load(globals)?).await,
            Command::Unlock(cmd) => cmd.run(&Project::load(globals)?).await,
        }
    }
}

/// Flags accepted by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub paths: PathArgs,

    #[command(flatten)]
    pub tx: TxArgs,
}

/// Connection overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// HTTP JSON-RPC endpoint
    #[arg(long, global = true, conflicts_with_all = ["ws", "ipc"])]
    pub rpc: Option<String>,

    /// WebSocket endpoint
    #[arg(long, global = true, conflicts_with = "ipc")]
    pub ws: Option<String>,

    /// IPC socket path
    #[arg(long, global = true)]
    pub ipc: Option<String>,
}

impl ConnectionArgs {
    fn endpoint(&self) -> Option<&String> {
        self.rpc.as_ref().or(self.ws.as_ref()).or(self.ipc.as_ref())
    }
}

/// Directory overrides
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// Solidity source directory
    #[arg(long, global = true)]
    pub contracts: Option<PathBuf>,

    /// Build output directory
    #[arg(long, global = true)]
    pub built: Option<PathBuf>,

    /// Address ledger directory
    #[arg(long, global = true)]
    pub addresses: Option<PathBuf>,
}

/// Transaction options
#[derive(Args, Debug, Clone, Default)]
pub struct TxArgs {
    /// Sending address
    #[arg(long, global = true)]
    pub from: Option<String>,

    #[arg(long, global = true)]
    pub to: Option<String>,

    /// Value in ether
    #[arg(long, global = true)]
    pub value: Option<String>,

    /// Gas limit. Estimated when omitted or zero.
    #[arg(long, global = true)]
    pub gas: Option<String>,

    /// Gas price in wei
    #[arg(long, global = true)]
    pub gas_price: Option<String>,

    /// Hex call data
    #[arg(long, global = true)]
    pub data: Option<String>,

    #[arg(long, global = true)]
    pub nonce: Option<String>,

    /// Sender by position in the account list
    #[arg(long, global = true)]
    pub account_index: Option<String>,

    /// Refuse to send when gas exceeds this limit
    #[arg(long, global = true)]
    pub max_gas: Option<String>,
}

impl TxArgs {
    /// Flags as a call options object
    pub fn to_raw(&self) -> Result<RawOptions> {
        let mut raw = RawOptions::new();
        let value = self
            .value
            .as_deref()
            .map(|ether| {
                parse_ether(ether)
                    .map(|wei| wei.to_string())
                    .map_err(|e| eyre!("Invalid --value '{}': {}", ether, e))
            })
            .transpose()?;

        let flags = [
            ("from", self.from.clone()),
            ("to", self.to.clone()),
            ("value", value),
            ("gas", self.gas.clone()),
            ("gasPrice", self.gas_price.clone()),
            ("data", self.data.clone()),
            ("nonce", self.nonce.clone()),
            ("accountIndex", self.account_index.clone()),
            ("maxGas", self.max_gas.clone()),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                raw.insert(key.to_string(), Value::String(value));
            }
        }
        Ok(raw)
    }
}

/// Loaded project: root, config and command line overrides
pub struct Project {
    pub root: ProjectRoot,
    pub config: DelibConfig,
    globals: GlobalArgs,
}

impl Project {
    pub fn load(globals: GlobalArgs) -> Result<Self> {
        let (root, config) = DelibConfig::discover()?;
        Ok(Self {
            root,
            config,
            globals,
        })
    }

    pub fn contracts_dir(&self) -> PathBuf {
        let dir = self.globals.paths.contracts.as_ref();
        self.root.join(dir.unwrap_or(&self.config.paths.contracts))
    }

    pub fn built_dir(&self) -> PathBuf {
        let dir = self.globals.paths.built.as_ref();
        self.root.join(dir.unwrap_or(&self.config.paths.built))
    }

    pub fn addresses_dir(&self) -> PathBuf {
        let dir = self.globals.paths.addresses.as_ref();
        self.root.join(dir.unwrap_or(&self.config.paths.addresses))
    }

    pub fn artifacts(&self) -> ArtifactStore {
        ArtifactStore::new(self.built_dir())
    }

    pub fn ledger(&self) -> AddressLedger {
        AddressLedger::new(self.addresses_dir())
    }

    /// Connect to the node named by the flags, else by the config
    pub async fn connect(&self) -> Result<ConnectionContext<AlloyTransport>> {
        let endpoint = match self.globals.connection.endpoint() {
            Some(endpoint) => endpoint.clone(),
            None => self.config.endpoint()?,
        };
        let keys = self.config.signer_keys()?;
        let transport = AlloyTransport::connect(&endpoint, &keys).await?;
        Ok(ConnectionContext::new(transport, self.config.settings()?))
    }

    /// Positional arguments with the transaction flags appended as an
    /// options object. A trailing options object given on the command line
    /// is merged with the flags, flags taking precedence.
    pub fn call_args(&self, args: &[String]) -> Result<Vec<Value>> {
        let mut values: Vec<Value> = args.iter().map(|a| parse_arg(a)).collect();
        let flags = self.globals.tx.to_raw()?;
        if flags.is_empty() {
            return Ok(values);
        }

        match values.last_mut() {
            Some(Value::Object(options)) => options.extend(flags),
            _ => values.push(Value::Object(flags)),
        }
        Ok(values)
    }
}

/// Objects, arrays and booleans are read as JSON. Anything else, numbers
/// included, stays a string so integers keep their exact decimal text.
pub fn parse_arg(arg: &str) -> Value {
    match serde_json::from_str(arg) {
        Ok(value @ (Value::Object(_) | Value::Array(_) | Value::Bool(_))) => value,
        _ => Value::String(arg.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delib_core::{Abi, MethodTable, U256};
    use serde_json::json;

    fn project(tx: TxArgs) -> Project {
        Project {
            root: ProjectRoot::at("/project"),
            config: DelibConfig::default(),
            globals: GlobalArgs {
                tx,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("5"), json!("5"));
        assert_eq!(parse_arg("-3"), json!("-3"));
        assert_eq!(parse_arg("null"), json!("null"));
        assert_eq!(parse_arg("true"), json!(true));
        assert_eq!(parse_arg("[1,2]"), json!([1, 2]));
        assert_eq!(parse_arg("hello"), json!("hello"));
        assert_eq!(
            parse_arg("0x52908400098527886E0F7030069857D2E4169EE7"),
            json!("0x52908400098527886E0F7030069857D2E4169EE7")
        );
    }

    #[test]
    fn test_parse_arg_keeps_large_integers_exact() {
        let amount = parse_arg("100000000000000000000");
        assert_eq!(amount, json!("100000000000000000000"));

        let abi = Abi::parse(
            r#"[{"type": "function", "name": "withdraw", "inputs": [{"name": "amount", "type": "uint256"}], "outputs": [], "stateMutability": "nonpayable"}]"#,
        )
        .unwrap();
        let table = MethodTable::from_abi("Bank", &abi);
        let data = table.resolve("withdraw", 1).unwrap().encode(&[amount]).unwrap();

        let expected = U256::from(10u64).pow(U256::from(20u64));
        assert_eq!(&data[4..], &expected.to_be_bytes::<32>()[..]);
    }

    #[test]
    fn test_tx_flags_to_raw() {
        let tx = TxArgs {
            value: Some("1.5".into()),
            gas: Some("50000".into()),
            account_index: Some("2".into()),
            ..Default::default()
        };
        let raw = tx.to_raw().unwrap();
        assert_eq!(raw["value"], json!("1500000000000000000"));
        assert_eq!(raw["gas"], json!("50000"));
        assert_eq!(raw["accountIndex"], json!("2"));
        assert!(!raw.contains_key("from"));
    }

    #[test]
    fn test_invalid_value_flag() {
        let tx = TxArgs {
            value: Some("lots".into()),
            ..Default::default()
        };
        assert!(tx.to_raw().is_err());
    }

    #[test]
    fn test_call_args_without_flags() {
        let project = project(TxArgs::default());
        let args = project.call_args(&["1".into(), "bob".into()]).unwrap();
        assert_eq!(args, vec![json!("1"), json!("bob")]);
    }

    #[test]
    fn test_call_args_appends_flags() {
        let project = project(TxArgs {
            gas: Some("70000".into()),
            ..Default::default()
        });
        let args = project.call_args(&["1".into()]).unwrap();
        assert_eq!(args, vec![json!("1"), json!({"gas": "70000"})]);

        let args = project
            .call_args(&["1".into(), r#"{"gas": 1, "nonce": 4}"#.into()])
            .unwrap();
        assert_eq!(args, vec![json!("1"), json!({"gas": "70000", "nonce": 4})]);
    }

    #[test]
    fn test_path_overrides() {
        let mut project = project(TxArgs::default());
        assert_eq!(project.built_dir(), PathBuf::from("/project/built"));

        project.globals.paths.built = Some(PathBuf::from("out"));
        assert_eq!(project.built_dir(), PathBuf::from("/project/out"));
        assert_eq!(project.addresses_dir(), PathBuf::from("/project/addresses"));
        assert_eq!(project.contracts_dir(), PathBuf::from("/project/contracts"));
    }
}

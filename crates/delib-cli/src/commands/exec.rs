use clap::Args;
use color_eyre::eyre::{eyre, Result};
use delib_core::{split_options, Address, CallMode, MethodDescriptor, Outcome};

use super::Project;

/// Call, estimate or send a contract method
#[derive(Args)]
pub struct ExecCommand {
    contract: String,

    method: String,

    /// Method arguments, JSON or plain strings. A trailing JSON object is
    /// taken as call options.
    args: Vec<String>,

    /// Force a read-only call
    #[arg(long, conflicts_with = "estimate")]
    call: bool,

    /// Print the raw gas estimate instead of sending
    #[arg(long)]
    estimate: bool,

    /// Contract address, instead of the recorded one
    #[arg(long, conflicts_with = "index")]
    at: Option<String>,

    /// Use the recorded address at this position
    #[arg(long)]
    index: Option<usize>,
}

impl ExecCommand {
    pub async fn run(self, project: &Project) -> Result<()> {
        let artifact = project.artifacts().load(&self.contract)?;
        let abi = artifact.parsed_abi()?;
        let address = contract_address(project, &self.contract, self.at.as_deref(), self.index)?;
        let args = project.call_args(&self.args)?;

        let context = project.connect().await?;
        let handle = context.at(&self.contract, &abi, address);

        let (positional, _) = split_options(&args);
        let method = handle.table().resolve(&self.method, positional.len())?;
        let mode = select_mode(method, self.call, self.estimate);
        tracing::debug!(method = %method.signature(), %mode, "exec");

        match handle.invoke(mode, &self.method, &args).await? {
            Outcome::Value(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            Outcome::Gas(gas) => println!("{}", gas),
            Outcome::Receipt(receipt) => println!("{}", serde_json::to_string_pretty(&receipt)?),
        }

        Ok(())
    }
}

pub(crate) fn contract_address(
    project: &Project,
    contract: &str,
    at: Option<&str>,
    index: Option<usize>,
) -> Result<Address> {
    if let Some(at) = at {
        return at
            .parse()
            .map_err(|e| eyre!("Invalid address '{}': {}", at, e));
    }

    let ledger = project.ledger();
    let address = match index {
        Some(index) => ledger.get(contract, Some(index))?.parsed()?,
        None => ledger.current(contract)?,
    };
    Ok(address)
}

/// Read-only methods are called unless a mode is forced
fn select_mode(method: &MethodDescriptor, call: bool, estimate: bool) -> CallMode {
    if estimate {
        CallMode::Estimate
    } else if call || method.is_read_only() {
        CallMode::Call
    } else {
        CallMode::Send
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delib_core::{Abi, MethodTable};

    const ABI: &str = r#"[
        {"type": "function", "name": "balance", "inputs": [], "outputs": [{"name": "", "type": "uint256"}], "stateMutability": "view"},
        {"type": "function", "name": "deposit", "inputs": [], "outputs": [], "stateMutability": "payable"}
    ]"#;

    #[test]
    fn test_select_mode() {
        let table = MethodTable::from_abi("Bank", &Abi::parse(ABI).unwrap());
        let balance = table.resolve("balance", 0).unwrap();
        let deposit = table.resolve("deposit", 0).unwrap();

        assert_eq!(select_mode(balance, false, false), CallMode::Call);
        assert_eq!(select_mode(deposit, false, false), CallMode::Send);
        assert_eq!(select_mode(deposit, true, false), CallMode::Call);
        assert_eq!(select_mode(deposit, false, true), CallMode::Estimate);
        assert_eq!(select_mode(balance, false, true), CallMode::Estimate);
    }
}

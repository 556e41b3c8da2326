use std::collections::BTreeMap;

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use console::style;

use super::Project;

/// Deploy a built contract and record its address
#[derive(Args)]
pub struct DeployCommand {
    /// Contract name in the build directory
    contract: String,

    /// Constructor arguments, JSON or plain strings
    args: Vec<String>,

    /// Library address for a link placeholder, as Name=0x...
    #[arg(long = "link", value_name = "NAME=ADDRESS")]
    links: Vec<String>,

    /// Print the gas estimate instead of deploying
    #[arg(long)]
    estimate: bool,
}

impl DeployCommand {
    pub async fn run(self, project: &Project) -> Result<()> {
        let artifact = project.artifacts().load(&self.contract)?;
        let links = parse_links(&self.links)?;
        let args = project.call_args(&self.args)?;
        let context = project.connect().await?;

        if self.estimate {
            let gas = context.deploy_estimate(&artifact, &args, &links).await?;
            println!("{}", gas);
            return Ok(());
        }

        println!(
            "{} Deploying {}...",
            style("→").blue(),
            style(&self.contract).cyan()
        );

        let ledger = project.ledger();
        let deployment = context
            .deploy(&artifact, &args, &links, Some(&ledger))
            .await?;
        let receipt = &deployment.receipt;

        println!(
            "{} {} deployed at {}",
            style("✓").green().bold(),
            style(&self.contract).cyan(),
            style(deployment.contract.address()).green()
        );
        println!("  Transaction: {}", receipt.transaction_hash);
        println!("  Gas used:    {}", receipt.gas_used);

        Ok(())
    }
}

fn parse_links(links: &[String]) -> Result<BTreeMap<String, String>> {
    links
        .iter()
        .map(|link| {
            link.split_once('=')
                .filter(|(name, address)| !name.is_empty() && !address.is_empty())
                .map(|(name, address)| (name.to_string(), address.to_string()))
                .ok_or_else(|| eyre!("Invalid --link '{}', expected Name=0x...", link))
        })
        .collect()
}

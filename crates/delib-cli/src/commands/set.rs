use std::collections::BTreeMap;

use clap::Args;
use color_eyre::eyre::Result;
use console::style;

use super::Project;

/// Record an address for a contract
#[derive(Args)]
pub struct SetCommand {
    contract: String,

    /// 0x-prefixed contract address
    address: String,
}

impl SetCommand {
    pub async fn run(self, project: &Project) -> Result<()> {
        let count = project
            .ledger()
            .set(&self.contract, &self.address, &BTreeMap::new())?;

        println!(
            "{} {} is now at {} ({} recorded)",
            style("✓").green(),
            style(&self.contract).cyan(),
            self.address,
            count
        );
        Ok(())
    }
}

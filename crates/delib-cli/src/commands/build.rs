use clap::Args;
use color_eyre::eyre::Result;
use console::style;

use super::Project;
use crate::solc::Solc;

/// Compile Solidity sources with solc
#[derive(Args)]
pub struct BuildCommand {
    /// Source files in the contracts directory (`.sol` optional)
    #[arg(required = true)]
    files: Vec<String>,
}

impl BuildCommand {
    pub async fn run(self, project: &Project) -> Result<()> {
        let contracts_dir = project.contracts_dir();
        println!(
            "{} Compiling from {}...",
            style("→").blue(),
            style(contracts_dir.display()).cyan()
        );

        let solc = Solc::new(&project.config.compiler.solc, &contracts_dir);
        let artifacts = solc.compile(&self.files)?;

        let store = project.artifacts();
        for artifact in &artifacts {
            store.save(artifact)?;
            let note = if artifact.is_deployable() {
                style("")
            } else {
                style(" (no bytecode)").dim()
            };
            println!(
                "{} {}{}",
                style("✓").green(),
                style(&artifact.contract_name).cyan(),
                note
            );
        }

        println!();
        println!(
            "{} {} contract(s) built at {}",
            style("✓").green().bold(),
            artifacts.len(),
            store.dir().display()
        );

        Ok(())
    }
}

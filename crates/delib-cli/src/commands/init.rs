//! Initialize a delib project in the current directory

use std::path::Path;

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use console::style;
use delib_core::ProjectRoot;

use crate::config::DelibConfig;

/// Create delib.toml and the contract directories
#[derive(Args)]
pub struct InitCommand {
    /// Endpoint written to [connection]
    #[arg(long, default_value = "http://localhost:8545")]
    endpoint: String,
}

impl InitCommand {
    pub async fn run(self) -> Result<()> {
        let root = ProjectRoot::at(std::env::current_dir()?);
        init_at(&root, &self.endpoint)?;

        println!();
        println!("{} delib initialized successfully!", style("✓").green().bold());
        println!();
        println!("Next steps:");
        println!(
            "  1. Add Solidity sources to {}",
            style("contracts/").cyan()
        );
        println!(
            "  2. Run {} then {}",
            style("delib build <file>").cyan(),
            style("delib deploy <contract>").cyan()
        );

        Ok(())
    }
}

fn init_at(root: &ProjectRoot, endpoint: &str) -> Result<()> {
    let config_path = root.config_path();
    if config_path.exists() {
        return Err(eyre!(
            "delib is already initialized in this project ({} exists)",
            ProjectRoot::CONFIG_FILE
        ));
    }

    let mut config = DelibConfig::default();
    config.connection.rpc = Some(endpoint.to_string());
    std::fs::write(&config_path, toml::to_string_pretty(&config)?)?;
    println!("{} Created {}", style("✓").green(), ProjectRoot::CONFIG_FILE);

    for dir in [
        &config.paths.contracts,
        &config.paths.built,
        &config.paths.addresses,
    ] {
        create_dir(&root.join(dir))?;
    }

    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        println!(
            "{} {} already exists",
            style("!").yellow(),
            path.display()
        );
    } else {
        std::fs::create_dir_all(path)?;
        println!("{} Created {}/", style("✓").green(), path.display());
    }
    Ok(())
}

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use delib_core::{ArgFilter, ArgMatch, BlockRange, DecodedEvent, ALL_EVENTS};
use futures::StreamExt;

use super::exec::contract_address;
use super::{parse_arg, Project};

/// Read or watch contract event logs
#[derive(Args)]
pub struct LogsCommand {
    contract: String,

    /// Event name, every event when omitted
    #[arg(default_value = ALL_EVENTS)]
    event: String,

    #[arg(long)]
    from_block: Option<u64>,

    #[arg(long, conflicts_with = "watch")]
    to_block: Option<u64>,

    /// Keep only logs whose argument equals a value, as name=value
    #[arg(long = "where", value_name = "NAME=VALUE")]
    conditions: Vec<String>,

    /// Stream new logs until interrupted
    #[arg(long)]
    watch: bool,

    /// Contract address, instead of the recorded one
    #[arg(long)]
    at: Option<String>,
}

impl LogsCommand {
    pub async fn run(self, project: &Project) -> Result<()> {
        let artifact = project.artifacts().load(&self.contract)?;
        let abi = artifact.parsed_abi()?;
        let address = contract_address(project, &self.contract, self.at.as_deref(), None)?;
        let filter = parse_conditions(&self.conditions)?;

        let context = project.connect().await?;
        let handle = context.at(&self.contract, &abi, address);

        if self.watch {
            let mut events = handle.watch(&self.event, self.from_block, filter).await?;
            while let Some(event) = events.next().await {
                print_event(&event?)?;
            }
            return Ok(());
        }

        let range = BlockRange::new(self.from_block, self.to_block);
        for event in handle.events(&self.event, range, &filter).await? {
            print_event(&event)?;
        }
        Ok(())
    }
}

fn print_event(event: &DecodedEvent) -> Result<()> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

fn parse_conditions(conditions: &[String]) -> Result<ArgFilter> {
    conditions
        .iter()
        .map(|condition| {
            let (name, value) = condition
                .split_once('=')
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| eyre!("Invalid --where '{}', expected name=value", condition))?;
            Ok((name.to_string(), ArgMatch::Exact(parse_arg(value))))
        })
        .collect()
}

use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use delib_core::{FunctionInfo, ParamInfo};

use super::Project;

/// Show the methods and events of a built contract
#[derive(Args)]
pub struct InfoCommand {
    /// Contract name. Lists the built contracts when omitted.
    contract: Option<String>,

    /// Print the ABI summary as JSON
    #[arg(long)]
    json: bool,
}

impl InfoCommand {
    pub async fn run(self, project: &Project) -> Result<()> {
        let store = project.artifacts();
        let Some(contract) = self.contract else {
            for name in store.list()? {
                println!("{}", name);
            }
            return Ok(());
        };

        let artifact = store.load(&contract)?;
        let abi = artifact.parsed_abi()?;
        let functions = abi.functions();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&functions)?);
            return Ok(());
        }

        println!("{}", style(&artifact.contract_name).cyan().bold());
        if let Some(constructor) = &abi.inner().constructor {
            let inputs: Vec<ParamInfo> = constructor
                .inputs
                .iter()
                .map(ParamInfo::from_abi_param)
                .collect();
            println!("  constructor({})", params(&inputs));
        }
        if !artifact.is_deployable() {
            println!("  {}", style("no bytecode, cannot be deployed").dim());
        }

        section("Read", &functions.read);
        section("Write", &functions.write);

        let events: Vec<String> = abi.events().map(|e| e.signature()).collect();
        if !events.is_empty() {
            println!();
            println!("{}", style("Events").bold());
            for event in events {
                println!("  {}", event);
            }
        }

        Ok(())
    }
}

fn section(title: &str, functions: &[FunctionInfo]) {
    if functions.is_empty() {
        return;
    }

    println!();
    println!("{}", style(title).bold());
    for function in functions {
        let returns = if function.outputs.is_empty() {
            String::new()
        } else {
            format!(" -> ({})", params(&function.outputs))
        };
        let payable = if function.payable {
            style(" payable").yellow()
        } else {
            style("")
        };
        println!(
            "  {}({}){}{}",
            function.name,
            params(&function.inputs),
            returns,
            payable
        );
    }
}

fn params(params: &[ParamInfo]) -> String {
    params
        .iter()
        .map(|p| {
            if p.name.is_empty() {
                p.param_type.clone()
            } else {
                format!("{} {}", p.param_type, p.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use delib_core::AddressRecord;

use super::Project;

/// List the recorded addresses of a contract
#[derive(Args)]
pub struct AddressesCommand {
    contract: String,
}

impl AddressesCommand {
    pub async fn run(self, project: &Project) -> Result<()> {
        let records = project.ledger().records(&self.contract)?;
        let current = current_index(&records);

        println!("{}", style(&self.contract).cyan().bold());
        for (i, record) in records.iter().enumerate() {
            let address = if record.address.is_empty() {
                style("<invalid>".to_string()).red()
            } else if record.is_valid() {
                style(record.address.clone())
            } else {
                style(record.address.clone()).red()
            };
            let marker = if Some(i) == current {
                style("*").green().bold()
            } else {
                style(" ")
            };

            println!("{} {:>3}  {}", marker, i, address);
            for (name, link) in &record.links {
                println!("        {} {} = {}", style("↳").dim(), name, link);
            }
        }

        Ok(())
    }
}

/// Index of the record `AddressLedger::current` resolves to
fn current_index(records: &[AddressRecord]) -> Option<usize> {
    records.iter().rposition(AddressRecord::is_valid)
}

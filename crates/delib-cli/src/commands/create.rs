use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use dialoguer::Password;

use super::Project;

/// Create a node-managed account
#[derive(Args)]
pub struct CreateCommand {
    /// Account password, prompted for when omitted
    password: Option<String>,
}

impl CreateCommand {
    pub async fn run(self, project: &Project) -> Result<()> {
        let password = match self.password {
            Some(password) => password,
            None => Password::new()
                .with_prompt("Password for the new account")
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()?,
        };

        let context = project.connect().await?;
        let address = context.transport().new_account(&password).await?;

        println!("{} Created account {}", style("✓").green(), style(address).cyan());
        Ok(())
    }
}

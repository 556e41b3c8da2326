use clap::Args;
use color_eyre::eyre::{eyre, Result};
use console::style;
use delib_core::AccountRef;
use dialoguer::Password;

use super::Project;

/// Unlock a node-managed account
#[derive(Args)]
pub struct UnlockCommand {
    /// Account index
    index: usize,

    /// Account password, prompted for when omitted
    password: Option<String>,

    /// Unlock duration in seconds
    #[arg(default_value_t = 300)]
    seconds: u64,
}

impl UnlockCommand {
    pub async fn run(self, project: &Project) -> Result<()> {
        let context = project.connect().await?;
        let account = AccountRef::Index(self.index).resolve(&context.accounts().await?)?;

        let password = match self.password {
            Some(password) => password,
            None => Password::new()
                .with_prompt(format!("Password for {}", account))
                .interact()?,
        };

        let unlocked = context
            .transport()
            .unlock_account(account, &password, self.seconds)
            .await?;
        if !unlocked {
            return Err(eyre!("Node refused to unlock {}", account));
        }

        println!(
            "{} Unlocked {} for {}s",
            style("✓").green(),
            style(account).cyan(),
            self.seconds
        );
        Ok(())
    }
}

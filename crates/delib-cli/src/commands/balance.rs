use alloy::primitives::utils::format_ether;
use clap::Args;
use color_eyre::eyre::{eyre, Result};
use delib_core::AccountRef;

use super::Project;

/// Show the balance of an account, in ether
#[derive(Args)]
pub struct BalanceCommand {
    /// Account index or 0x address. The default account when omitted.
    account: Option<String>,
}

impl BalanceCommand {
    pub async fn run(self, project: &Project) -> Result<()> {
        let account = self.account.as_deref().map(parse_account).transpose()?;
        let context = project.connect().await?;
        let balance = context.balance(account).await?;
        println!("{}", format_ether(balance));
        Ok(())
    }
}

fn parse_account(account: &str) -> Result<AccountRef> {
    if account.starts_with("0x") {
        let address = account
            .parse()
            .map_err(|e| eyre!("Invalid address '{}': {}", account, e))?;
        return Ok(AccountRef::Address(address));
    }

    account
        .parse::<usize>()
        .map(AccountRef::Index)
        .map_err(|_| eyre!("Expected an account index or address, got '{}'", account))
}

#[cfg(test)]
mod tests {
    use super::*;
    use delib_core::Address;

    #[test]
    fn test_parse_account() {
        assert_eq!(parse_account("3").unwrap(), AccountRef::Index(3));

        let address: Address = "0x52908400098527886E0F7030069857D2E4169EE7".parse().unwrap();
        assert_eq!(
            parse_account("0x52908400098527886E0F7030069857D2E4169EE7").unwrap(),
            AccountRef::Address(address)
        );

        assert!(parse_account("alice").is_err());
        assert!(parse_account("0x1234").is_err());
    }
}

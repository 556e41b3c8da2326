//! Sender account resolution

use alloy::primitives::Address;

use crate::error::{Error, Result};
use crate::options::TxOptions;

/// Pick the sending account.
///
/// Priority is an explicit `from`, then `accounts[accountIndex]`, then
/// `accounts[default_index]`. An index outside the list is an error; it never
/// falls back to another account.
pub fn resolve_sender(
    options: &TxOptions,
    accounts: &[Address],
    default_index: usize,
) -> Result<Address> {
    if let Some(from) = options.from {
        return Ok(from);
    }

    let index = options.account_index.unwrap_or(default_index);
    accounts.get(index).copied().ok_or(Error::OutOfRange {
        index,
        len: accounts.len(),
    })
}

/// Account selector used by balance lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRef {
    Index(usize),
    Address(Address),
}

impl AccountRef {
    pub fn resolve(self, accounts: &[Address]) -> Result<Address> {
        match self {
            AccountRef::Address(address) => Ok(address),
            AccountRef::Index(index) => accounts.get(index).copied().ok_or(Error::OutOfRange {
                index,
                len: accounts.len(),
            }),
        }
    }
}

impl From<usize> for AccountRef {
    fn from(index: usize) -> Self {
        AccountRef::Index(index)
    }
}

impl From<Address> for AccountRef {
    fn from(address: Address) -> Self {
        AccountRef::Address(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> Vec<Address> {
        vec![
            Address::repeat_byte(0xa),
            Address::repeat_byte(0xb),
            Address::repeat_byte(0xc),
        ]
    }

    #[test]
    fn test_explicit_from_wins() {
        let from = Address::repeat_byte(0xf);
        let options = TxOptions {
            from: Some(from),
            account_index: Some(1),
            ..Default::default()
        };

        assert_eq!(resolve_sender(&options, &accounts(), 2).unwrap(), from);
    }

    #[test]
    fn test_from_needs_no_accounts() {
        let from = Address::repeat_byte(0xf);
        let options = TxOptions {
            from: Some(from),
            ..Default::default()
        };

        assert_eq!(resolve_sender(&options, &[], 0).unwrap(), from);
    }

    #[test]
    fn test_account_index_over_default() {
        let options = TxOptions {
            account_index: Some(1),
            ..Default::default()
        };

        assert_eq!(
            resolve_sender(&options, &accounts(), 2).unwrap(),
            Address::repeat_byte(0xb)
        );
    }

    #[test]
    fn test_default_index() {
        let options = TxOptions::default();
        assert_eq!(
            resolve_sender(&options, &accounts(), 2).unwrap(),
            Address::repeat_byte(0xc)
        );
    }

    #[test]
    fn test_out_of_range_index_fails() {
        let options = TxOptions {
            account_index: Some(5),
            ..Default::default()
        };

        let err = resolve_sender(&options, &accounts(), 0).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { index: 5, len: 3 }));
    }

    #[test]
    fn test_empty_account_list_fails() {
        let err = resolve_sender(&TxOptions::default(), &[], 0).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { index: 0, len: 0 }));
    }

    #[test]
    fn test_account_ref() {
        assert_eq!(
            AccountRef::from(1).resolve(&accounts()).unwrap(),
            Address::repeat_byte(0xb)
        );
        assert!(AccountRef::Index(9).resolve(&accounts()).is_err());

        let address = Address::repeat_byte(0x1);
        assert_eq!(AccountRef::from(address).resolve(&[]).unwrap(), address);
    }
}

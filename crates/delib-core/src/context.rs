//! Connection context
//!
//! A [`ConnectionContext`] owns one transport together with the settings
//! every dispatch path reads: default transaction options, the default
//! account index and the gas margin. Contexts are plain values; a program
//! talking to two nodes holds two of them.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use serde_json::Value;

use crate::abi::Abi;
use crate::accounts::{resolve_sender, AccountRef};
use crate::artifact::Artifact;
use crate::bytecode::link_bytecode;
use crate::contract::{split_options, ContractHandle};
use crate::error::{Error, Result};
use crate::gas::resolve_gas;
use crate::ledger::AddressLedger;
use crate::methods::MethodTable;
use crate::options::{self, RawOptions, TxOptions};
use crate::transport::Transport;
use crate::types::{Receipt, TransactionStatus};

/// Settings shared by every handle created from a context
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Options merged under every call
    pub defaults: RawOptions,
    /// Sender index used when neither `from` nor `accountIndex` is given
    pub account_index: usize,
    /// Fraction added to gas estimates, 0.05 adds 5%
    pub gas_margin: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            defaults: RawOptions::new(),
            account_index: 0,
            gas_margin: 0.0,
        }
    }
}

/// Result of a successful deployment
pub struct Deployment<T> {
    pub receipt: Receipt,
    pub contract: ContractHandle<T>,
}

pub struct ConnectionContext<T> {
    transport: Arc<T>,
    settings: Settings,
}

impl<T> Clone for ConnectionContext<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            settings: self.settings.clone(),
        }
    }
}

impl<T: Transport> ConnectionContext<T> {
    pub fn new(transport: T, settings: Settings) -> Self {
        Self::from_arc(Arc::new(transport), settings)
    }

    pub fn from_arc(transport: Arc<T>, settings: Settings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Merge call options over the context defaults
    pub fn resolve_options(&self, call: Option<&RawOptions>) -> Result<TxOptions> {
        options::resolve(&self.settings.defaults, call)
    }

    pub async fn accounts(&self) -> Result<Vec<Address>> {
        self.transport.accounts().await
    }

    /// Sending account for resolved options. The account list is only
    /// fetched when `from` is absent.
    pub async fn sender(&self, options: &TxOptions) -> Result<Address> {
        if let Some(from) = options.from {
            return Ok(from);
        }
        let accounts = self.transport.accounts().await?;
        resolve_sender(options, &accounts, self.settings.account_index)
    }

    /// Handle for a deployed contract
    pub fn at(&self, name: &str, abi: &Abi, address: Address) -> ContractHandle<T> {
        let table = Arc::new(MethodTable::from_abi(name, abi));
        ContractHandle::new(self.clone(), table, address)
    }

    /// Fill in gas if needed, then submit.
    ///
    /// `to` of `None` creates a contract from `input`.
    pub(crate) async fn submit(
        &self,
        options: TxOptions,
        from: Address,
        to: Option<Address>,
        input: Bytes,
    ) -> Result<Receipt> {
        let transport = &*self.transport;
        let options = resolve_gas(
            options,
            |options| {
                let request = build_request(&options, from, to, input.clone());
                async move { transport.estimate_gas(&request).await }
            },
            self.settings.gas_margin,
        )
        .await?;

        let request = build_request(&options, from, to, input);
        tracing::info!(%from, to = ?to, gas = ?options.gas, "sending transaction");
        let receipt = transport.send_transaction(request).await?;
        tracing::debug!(hash = %receipt.transaction_hash, status = %receipt.status, "transaction mined");
        Ok(receipt)
    }

    /// Deploy an artifact.
    ///
    /// A trailing JSON object in `args` is taken as call options. The ledger,
    /// when given, is only written once the node reports a contract address.
    pub async fn deploy(
        &self,
        artifact: &Artifact,
        args: &[Value],
        links: &BTreeMap<String, String>,
        ledger: Option<&AddressLedger>,
    ) -> Result<Deployment<T>> {
        let (abi, options, code) = self.prepare_deploy(artifact, args, links)?;
        let from = self.sender(&options).await?;

        let receipt = self.submit(options, from, None, code).await?;
        let address = match (receipt.status, receipt.contract_address) {
            (TransactionStatus::Success, Some(address)) => address,
            _ => {
                return Err(Error::Transport(format!(
                    "deployment of {} failed in transaction {}",
                    artifact.contract_name, receipt.transaction_hash
                )))
            }
        };

        if let Some(ledger) = ledger {
            ledger.set(&artifact.contract_name, &address.to_string(), links)?;
        }

        tracing::info!(contract = %artifact.contract_name, %address, "deployed");
        Ok(Deployment {
            contract: self.at(&artifact.contract_name, &abi, address),
            receipt,
        })
    }

    /// Raw gas estimate for a deployment, without margin
    pub async fn deploy_estimate(
        &self,
        artifact: &Artifact,
        args: &[Value],
        links: &BTreeMap<String, String>,
    ) -> Result<u64> {
        let (_, options, code) = self.prepare_deploy(artifact, args, links)?;
        let options = options.without_gas();
        let from = self.sender(&options).await?;
        let request = build_request(&options, from, None, code);
        self.transport.estimate_gas(&request).await
    }

    fn prepare_deploy(
        &self,
        artifact: &Artifact,
        args: &[Value],
        links: &BTreeMap<String, String>,
    ) -> Result<(Abi, TxOptions, Bytes)> {
        if !artifact.is_deployable() {
            return Err(Error::Abi(format!(
                "{} has no bytecode to deploy",
                artifact.contract_name
            )));
        }

        let (args, call) = split_options(args);
        let options = self.resolve_options(call)?;
        let abi = artifact.parsed_abi()?;
        let code = link_bytecode(&artifact.bytecode, links)?
            .with_constructor_args(&abi.encode_constructor(args)?)
            .into_bytes();

        Ok((abi, options, Bytes::from(code)))
    }

    /// Balance of an account by index or address. `None` is the default
    /// account.
    pub async fn balance(&self, account: Option<AccountRef>) -> Result<U256> {
        let address = match account.unwrap_or(AccountRef::Index(self.settings.account_index)) {
            AccountRef::Address(address) => address,
            index => index.resolve(&self.transport.accounts().await?)?,
        };
        self.transport.balance(address).await
    }

    /// Plain value transfer through the usual option and gas pipeline
    pub async fn transfer(
        &self,
        to: Address,
        value: U256,
        call: Option<&RawOptions>,
    ) -> Result<Receipt> {
        let mut options = self.resolve_options(call)?;
        if !value.is_zero() {
            options.value = Some(value);
        }
        let from = self.sender(&options).await?;
        let input = options.data.clone().unwrap_or_default();
        self.submit(options, from, Some(to), input).await
    }
}

/// Transaction request for resolved options. `to` of `None` deploys `input`.
pub(crate) fn build_request(
    options: &TxOptions,
    from: Address,
    to: Option<Address>,
    input: Bytes,
) -> TransactionRequest {
    let request = TransactionRequest::default().with_from(from);
    let request = match to {
        Some(to) => request.with_to(to).with_input(input),
        None => request.with_deploy_code(input),
    };
    options.apply_to(request)
}

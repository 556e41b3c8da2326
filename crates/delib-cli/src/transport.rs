//! alloy-backed transport
//!
//! Accounts managed by the node are sent through `eth_sendTransaction`.
//! Accounts whose private keys are configured locally are signed by an
//! [`EthereumWallet`] before submission.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use delib_core::{Error, LogStream, Receipt, Result, TransactionStatus, Transport};
use futures::stream::{self, StreamExt};

pub struct AlloyTransport {
    node: DynProvider,
    signing: Option<DynProvider>,
    local_accounts: Vec<Address>,
}

impl AlloyTransport {
    /// Connect to an HTTP, WebSocket or IPC endpoint. The scheme of
    /// `endpoint` selects the transport.
    pub async fn connect(endpoint: &str, keys: &[String]) -> Result<Self> {
        let node = ProviderBuilder::new()
            .connect(endpoint)
            .await
            .map_err(Error::transport)?
            .erased();

        if keys.is_empty() {
            return Ok(Self {
                node,
                signing: None,
                local_accounts: Vec::new(),
            });
        }

        let signers = keys
            .iter()
            .map(|key| parse_signer(key))
            .collect::<Result<Vec<_>>>()?;
        let local_accounts: Vec<Address> = signers.iter().map(|s| s.address()).collect();

        let mut signers = signers.into_iter();
        let mut wallet = EthereumWallet::from(signers.next().ok_or_else(|| {
            Error::Configuration("no signer keys".into())
        })?);
        for signer in signers {
            wallet.register_signer(signer);
        }

        let signing = ProviderBuilder::new()
            .wallet(wallet)
            .connect(endpoint)
            .await
            .map_err(Error::transport)?
            .erased();

        tracing::debug!(endpoint, local = local_accounts.len(), "connected");
        Ok(Self {
            node,
            signing: Some(signing),
            local_accounts,
        })
    }

    /// Provider able to send for `from`
    fn sender(&self, from: Option<Address>) -> &DynProvider {
        match (&self.signing, from) {
            (Some(signing), Some(from)) if self.local_accounts.contains(&from) => signing,
            _ => &self.node,
        }
    }

    /// Create a node-managed account protected by `password`
    pub async fn new_account(&self, password: &str) -> Result<Address> {
        self.node
            .raw_request("personal_newAccount".into(), (password.to_string(),))
            .await
            .map_err(Error::transport)
    }

    /// Unlock a node-managed account for `seconds`
    pub async fn unlock_account(&self, account: Address, password: &str, seconds: u64) -> Result<bool> {
        self.node
            .raw_request("personal_unlockAccount".into(), (account, password.to_string(), seconds))
            .await
            .map_err(Error::transport)
    }
}

fn parse_signer(key: &str) -> Result<PrivateKeySigner> {
    let key = if key.starts_with("0x") {
        key.to_string()
    } else {
        format!("0x{}", key)
    };
    key.parse()
        .map_err(|e| Error::Configuration(format!("Invalid private key: {}", e)))
}

fn to_receipt(receipt: &TransactionReceipt) -> Receipt {
    Receipt {
        transaction_hash: receipt.transaction_hash,
        contract_address: receipt.contract_address,
        block_number: receipt.block_number,
        from: receipt.from,
        gas_used: receipt.gas_used,
        status: receipt.status().into(),
    }
}

#[async_trait]
impl Transport for AlloyTransport {
    async fn accounts(&self) -> Result<Vec<Address>> {
        let mut accounts = self.node.get_accounts().await.map_err(Error::transport)?;
        for account in &self.local_accounts {
            if !accounts.contains(account) {
                accounts.push(*account);
            }
        }
        Ok(accounts)
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64> {
        self.node
            .estimate_gas(request.clone())
            .await
            .map_err(Error::transport)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<Receipt> {
        let pending = self
            .sender(request.from)
            .send_transaction(request)
            .await
            .map_err(Error::transport)?;
        tracing::debug!(hash = %pending.tx_hash(), "transaction submitted");

        let receipt = pending.get_receipt().await.map_err(Error::transport)?;
        let receipt = to_receipt(&receipt);
        if receipt.status == TransactionStatus::Reverted {
            tracing::warn!(hash = %receipt.transaction_hash, "transaction reverted");
        }
        Ok(receipt)
    }

    async fn call(&self, request: &TransactionRequest) -> Result<Bytes> {
        self.node
            .call(request.clone())
            .await
            .map_err(Error::transport)
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.node
            .get_balance(address)
            .await
            .map_err(Error::transport)
    }

    async fn block_number(&self) -> Result<u64> {
        self.node.get_block_number().await.map_err(Error::transport)
    }

    async fn logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        self.node.get_logs(filter).await.map_err(Error::transport)
    }

    async fn watch_logs(&self, filter: &Filter) -> Result<LogStream> {
        let poller = self
            .node
            .watch_logs(filter)
            .await
            .map_err(Error::transport)?;

        Ok(poller
            .into_stream()
            .flat_map(|logs| stream::iter(logs.into_iter().map(Ok)))
            .boxed())
    }
}

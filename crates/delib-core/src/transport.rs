//! Transport abstraction over an Ethereum client
//!
//! The core never talks to a node directly. Everything network-facing goes
//! through [`Transport`], which keeps contract dispatch testable with an
//! in-memory implementation and lets the CLI plug in an alloy provider.

use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::Receipt;

/// Stream of logs produced by [`Transport::watch_logs`]
pub type LogStream = BoxStream<'static, Result<Log>>;

/// Node operations required by the core
#[async_trait]
pub trait Transport: Send + Sync {
    /// Accounts usable as senders, in index order
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Estimate gas for a transaction
    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64>;

    /// Submit a transaction and wait for its receipt
    async fn send_transaction(&self, request: TransactionRequest) -> Result<Receipt>;

    /// Execute a read-only call
    async fn call(&self, request: &TransactionRequest) -> Result<Bytes>;

    async fn balance(&self, address: Address) -> Result<U256>;

    async fn block_number(&self) -> Result<u64>;

    /// Past logs matching a filter
    async fn logs(&self, filter: &Filter) -> Result<Vec<Log>>;

    /// Subscribe to new logs matching a filter
    async fn watch_logs(&self, filter: &Filter) -> Result<LogStream>;
}

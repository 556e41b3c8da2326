//! Contract handle
//!
//! Every ABI method of a deployed contract is reachable through three
//! dispatch paths: [`ContractHandle::call`] for read-only execution,
//! [`ContractHandle::estimate`] for a gas estimate and
//! [`ContractHandle::send`] for a state-changing transaction. Method lookup
//! and argument encoding happen before anything touches the transport.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;

use crate::context::{build_request, ConnectionContext};
use crate::error::Result;
use crate::events::{matches_filter, ArgFilter, BlockRange, DecodedEvent, EventSelection};
use crate::methods::{MethodDescriptor, MethodTable};
use crate::options::{RawOptions, TxOptions};
use crate::transport::Transport;
use crate::types::{CallMode, Outcome, Receipt};

/// Split a trailing JSON object off positional arguments as call options
pub fn split_options(args: &[Value]) -> (&[Value], Option<&RawOptions>) {
    match args.split_last() {
        Some((Value::Object(options), rest)) => (rest, Some(options)),
        _ => (args, None),
    }
}

/// A deployed contract bound to a connection
pub struct ContractHandle<T> {
    context: ConnectionContext<T>,
    table: Arc<MethodTable>,
    address: Address,
}

impl<T> Clone for ContractHandle<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            table: Arc::clone(&self.table),
            address: self.address,
        }
    }
}

/// A method invocation after lookup, option resolution and encoding
struct Prepared<'a> {
    method: &'a MethodDescriptor,
    options: TxOptions,
    input: Bytes,
}

impl<T: Transport> ContractHandle<T> {
    pub fn new(context: ConnectionContext<T>, table: Arc<MethodTable>, address: Address) -> Self {
        Self {
            context,
            table,
            address,
        }
    }

    pub fn name(&self) -> &str {
        self.table.contract()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn table(&self) -> &MethodTable {
        &self.table
    }

    pub fn context(&self) -> &ConnectionContext<T> {
        &self.context
    }

    fn prepare(&self, name: &str, args: &[Value]) -> Result<Prepared<'_>> {
        let (args, call) = split_options(args);
        let method = self.table.resolve(name, args.len())?;
        let options = self.context.resolve_options(call)?;
        let input = method.encode(args)?;
        Ok(Prepared {
            method,
            options,
            input,
        })
    }

    /// Execute a method without creating a transaction and decode its
    /// return value
    pub async fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let Prepared {
            method,
            options,
            input,
        } = self.prepare(name, args)?;
        let from = self.context.sender(&options).await?;

        let request = build_request(&options, from, Some(self.address), input);
        tracing::debug!(contract = self.name(), method = %method.signature(), "call");
        let output = self.context.transport().call(&request).await?;
        method.decode(&output)
    }

    /// Node gas estimate for a method, without margin
    pub async fn estimate(&self, name: &str, args: &[Value]) -> Result<u64> {
        let Prepared {
            method,
            options,
            input,
        } = self.prepare(name, args)?;
        let options = options.without_gas();
        let from = self.context.sender(&options).await?;

        let request = build_request(&options, from, Some(self.address), input);
        tracing::debug!(contract = self.name(), method = %method.signature(), "estimate");
        self.context.transport().estimate_gas(&request).await
    }

    /// Send a transaction invoking a method. Gas is estimated when not
    /// given.
    pub async fn send(&self, name: &str, args: &[Value]) -> Result<Receipt> {
        let Prepared {
            method,
            options,
            input,
        } = self.prepare(name, args)?;
        let from = self.context.sender(&options).await?;

        tracing::debug!(contract = self.name(), method = %method.signature(), "send");
        self.context
            .submit(options, from, Some(self.address), input)
            .await
    }

    pub async fn invoke(&self, mode: CallMode, name: &str, args: &[Value]) -> Result<Outcome> {
        match mode {
            CallMode::Call => self.call(name, args).await.map(Outcome::Value),
            CallMode::Estimate => self.estimate(name, args).await.map(Outcome::Gas),
            CallMode::Send => self.send(name, args).await.map(Outcome::Receipt),
        }
    }

    /// Past logs of one event, or of every event with
    /// [`crate::events::ALL_EVENTS`]
    pub async fn events(
        &self,
        event: &str,
        range: BlockRange,
        filter: &ArgFilter,
    ) -> Result<Vec<DecodedEvent>> {
        let selection = EventSelection::lookup(&self.table, event)?;
        let log_filter = selection.filter(
            self.address,
            range.from_block.unwrap_or_default(),
            range.to_block,
        );

        let logs = self.context.transport().logs(&log_filter).await?;
        let mut decoded = Vec::new();
        for log in &logs {
            if let Some(event) = selection.decode(&self.table, log).transpose()? {
                if matches_filter(&event.args, filter) {
                    decoded.push(event);
                }
            }
        }

        tracing::debug!(contract = self.name(), event, found = logs.len(), kept = decoded.len(), "events");
        Ok(decoded)
    }

    /// Stream newly emitted events, starting at `from_block` or the
    /// current block
    pub async fn watch(
        &self,
        event: &str,
        from_block: Option<u64>,
        filter: ArgFilter,
    ) -> Result<BoxStream<'static, Result<DecodedEvent>>> {
        let selection = EventSelection::lookup(&self.table, event)?;
        let from_block = match from_block {
            Some(block) => block,
            None => self.context.transport().block_number().await?,
        };

        let log_filter = selection.filter(self.address, from_block, None);
        let logs = self.context.transport().watch_logs(&log_filter).await?;
        let table = Arc::clone(&self.table);

        let events = logs.filter_map(move |log| {
            let decoded = match log {
                Ok(log) => selection.decode(&table, &log),
                Err(e) => Some(Err(e)),
            };
            let kept = match decoded {
                Some(Ok(event)) if !matches_filter(&event.args, &filter) => None,
                other => other,
            };
            future::ready(kept)
        });

        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Abi;
    use crate::context::Settings;
    use crate::error::Error;
    use crate::events::tests::deposited_log;
    use crate::events::{ArgMatch, ALL_EVENTS};
    use crate::methods::tests::BANK_ABI;
    use crate::transport::mock::MockTransport;
    use alloy::primitives::{TxKind, U256};
    use futures::TryStreamExt;
    use serde_json::json;

    const A: Address = Address::new([0x0a; 20]);
    const B: Address = Address::new([0x0b; 20]);
    const BANK: Address = Address::new([0xcc; 20]);

    fn raw(value: Value) -> RawOptions {
        value.as_object().cloned().unwrap()
    }

    fn bank(transport: MockTransport, settings: Settings) -> ContractHandle<MockTransport> {
        let context = ConnectionContext::new(transport, settings);
        context.at("Bank", &Abi::parse(BANK_ABI).unwrap(), BANK)
    }

    fn funded() -> MockTransport {
        MockTransport {
            accounts: vec![A, B],
            estimate: 80_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_split_options() {
        let args = vec![json!(1), json!({"gas": 5})];
        let (rest, options) = split_options(&args);
        assert_eq!(rest, &[json!(1)]);
        assert_eq!(options.unwrap()["gas"], json!(5));

        let args = vec![json!(1), json!([2])];
        let (rest, options) = split_options(&args);
        assert_eq!(rest.len(), 2);
        assert!(options.is_none());

        let (rest, options) = split_options(&[]);
        assert!(rest.is_empty() && options.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_touches_nothing() {
        let handle = bank(funded(), Settings::default());

        for mode in [CallMode::Call, CallMode::Estimate, CallMode::Send] {
            let err = handle.invoke(mode, "nonexistentMethod", &[]).await.unwrap_err();
            assert!(matches!(err, Error::InvalidEventOrMethod { ref name, .. } if name == "nonexistentMethod"));
        }
        assert!(matches!(
            handle.send("Deposited", &[]).await,
            Err(Error::InvalidEventOrMethod { .. })
        ));
        assert_eq!(handle.context().transport().total_invocations(), 0);
    }

    #[tokio::test]
    async fn test_send_estimates_with_margin() {
        let settings = Settings {
            defaults: raw(json!({"gas": 0})),
            account_index: 0,
            gas_margin: 0.05,
        };
        let handle = bank(funded(), settings);

        let receipt = handle.send("deposit", &[json!({"value": 4})]).await.unwrap();
        assert_eq!(receipt.gas_used, 84_000);

        let transport = handle.context().transport();
        assert_eq!(transport.estimate_count(), 1);
        assert_eq!(transport.send_count(), 1);
        assert_eq!(transport.estimates.lock().unwrap()[0].gas, None);

        let sent = transport.last_send();
        assert_eq!(sent.from, Some(A));
        assert_eq!(sent.to, Some(TxKind::Call(BANK)));
        assert_eq!(sent.gas, Some(84_000));
        assert_eq!(sent.value, Some(U256::from(4)));
    }

    #[tokio::test]
    async fn test_explicit_gas_skips_estimate() {
        let handle = bank(funded(), Settings::default());

        handle
            .send("withdraw", &[json!(5), json!({"gas": 50_000, "gasPrice": 7, "nonce": 3})])
            .await
            .unwrap();

        let transport = handle.context().transport();
        assert_eq!(transport.estimate_count(), 0);
        let sent = transport.last_send();
        assert_eq!(sent.gas, Some(50_000));
        assert_eq!(sent.gas_price, Some(7));
        assert_eq!(sent.nonce, Some(3));
    }

    #[tokio::test]
    async fn test_gas_ceiling_blocks_send() {
        let settings = Settings {
            gas_margin: 0.05,
            ..Default::default()
        };
        let handle = bank(funded(), settings);

        let err = handle
            .send("withdraw", &[json!(5), json!({"maxGas": 83_999})])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GasLimitExceeded { gas: 84_000, max_gas: 83_999 }));
        assert_eq!(handle.context().transport().send_count(), 0);
    }

    #[tokio::test]
    async fn test_estimate_failure_propagates() {
        let transport = MockTransport {
            fail_estimate: true,
            ..funded()
        };
        let handle = bank(transport, Settings::default());

        assert!(matches!(
            handle.send("withdraw", &[json!(1)]).await,
            Err(Error::Transport(_))
        ));
        assert_eq!(handle.context().transport().send_count(), 0);
    }

    #[tokio::test]
    async fn test_estimate_returns_raw_value() {
        let settings = Settings {
            gas_margin: 0.5,
            ..Default::default()
        };
        let handle = bank(funded(), settings);

        let gas = handle
            .estimate("withdraw", &[json!(1), json!({"gas": 10})])
            .await
            .unwrap();
        assert_eq!(gas, 80_000);

        let transport = handle.context().transport();
        assert_eq!(transport.estimates.lock().unwrap()[0].gas, None);
        assert_eq!(transport.send_count(), 0);
    }

    #[tokio::test]
    async fn test_call_decodes_output() {
        let transport = MockTransport {
            call_result: Bytes::from(U256::from(42).to_be_bytes::<32>().to_vec()),
            ..funded()
        };
        let handle = bank(transport, Settings::default());

        let value = handle
            .call("balance", &[json!({"accountIndex": 1})])
            .await
            .unwrap();
        assert_eq!(value, json!("42"));

        let transport = handle.context().transport();
        let request = transport.calls.lock().unwrap()[0].clone();
        assert_eq!(request.from, Some(B));
        assert_eq!(transport.send_count(), 0);
    }

    #[tokio::test]
    async fn test_overload_chosen_by_arity() {
        let handle = bank(funded(), Settings::default());
        let to = json!(B.to_string());

        handle.send("withdraw", &[json!(1), to]).await.unwrap();
        let sent = handle.context().transport().last_send();
        let input = sent.input.input().unwrap();
        assert_eq!(input.len(), 4 + 64);
    }

    #[tokio::test]
    async fn test_bad_arguments_fail_before_network() {
        let handle = bank(funded(), Settings::default());

        assert!(matches!(
            handle.send("withdraw", &[json!("not a number")]).await,
            Err(Error::Abi(_))
        ));
        assert!(matches!(
            handle.send("withdraw", &[json!(1), json!({"gas": "lots"})]).await,
            Err(Error::InvalidOption { .. })
        ));
        assert_eq!(handle.context().transport().total_invocations(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_account() {
        let handle = bank(funded(), Settings::default());
        assert!(matches!(
            handle.send("deposit", &[json!({"accountIndex": 5})]).await,
            Err(Error::OutOfRange { index: 5, len: 2 })
        ));
    }

    #[tokio::test]
    async fn test_invoke_modes() {
        let handle = bank(funded(), Settings::default());

        assert!(matches!(
            handle.invoke(CallMode::Estimate, "deposit", &[]).await.unwrap(),
            Outcome::Gas(80_000)
        ));
        assert!(matches!(
            handle.invoke(CallMode::Send, "deposit", &[]).await.unwrap(),
            Outcome::Receipt(_)
        ));
        assert!(matches!(
            handle.invoke(CallMode::Call, "deposit", &[]).await.unwrap(),
            Outcome::Value(Value::Null)
        ));
    }

    #[tokio::test]
    async fn test_past_events_filtered() {
        let transport = MockTransport {
            logs: vec![deposited_log(A, 5, 1), deposited_log(B, 10, 2)],
            ..funded()
        };
        let handle = bank(transport, Settings::default());

        let all = handle
            .events("Deposited", BlockRange::default(), &ArgFilter::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let mut filter = ArgFilter::new();
        filter.insert("amount".into(), ArgMatch::Exact(json!(10)));
        let matched = handle
            .events(ALL_EVENTS, BlockRange::new(Some(1), Some(2)), &filter)
            .await
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].block_number, Some(2));

        let queries = handle.context().transport().log_queries.lock().unwrap().clone();
        assert_eq!(queries[1].get_from_block(), Some(1));
        assert_eq!(queries[1].get_to_block(), Some(2));
    }

    #[tokio::test]
    async fn test_events_rejects_method_name() {
        let handle = bank(funded(), Settings::default());
        assert!(matches!(
            handle.events("deposit", BlockRange::default(), &ArgFilter::new()).await,
            Err(Error::InvalidEventOrMethod { .. })
        ));
        assert_eq!(handle.context().transport().total_invocations(), 0);
    }

    #[tokio::test]
    async fn test_watch_streams_matching_events() {
        let transport = MockTransport {
            logs: vec![deposited_log(A, 5, 7), deposited_log(B, 10, 8)],
            block: 7,
            ..funded()
        };
        let handle = bank(transport, Settings::default());

        let mut filter = ArgFilter::new();
        filter.insert("from".into(), ArgMatch::Exact(json!(B.to_string())));
        let events: Vec<DecodedEvent> = handle
            .watch("Deposited", None, filter)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].args["amount"], json!("10"));

        let queries = handle.context().transport().log_queries.lock().unwrap().clone();
        assert_eq!(queries[0].get_from_block(), Some(7));
    }
}

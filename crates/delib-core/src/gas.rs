//! Gas estimation and ceiling checks

use std::future::Future;

use crate::error::{Error, Result};
use crate::options::TxOptions;

/// Fill in `gas` for a transaction that is about to be sent.
///
/// Explicit gas is used as-is and no estimate is requested. Otherwise
/// `estimate` is called exactly once with the gas-less options and the
/// result is padded by `margin` (0.05 adds 5%). Either way, a gas value above
/// `maxGas` fails with [`Error::GasLimitExceeded`].
pub async fn resolve_gas<F, Fut>(options: TxOptions, estimate: F, margin: f64) -> Result<TxOptions>
where
    F: FnOnce(TxOptions) -> Fut,
    Fut: Future<Output = Result<u64>>,
{
    let gas = match options.gas {
        Some(gas) => gas,
        None => {
            let estimated = estimate(options.without_gas()).await?;
            let padded = apply_margin(estimated, margin);
            tracing::debug!(estimated, padded, margin, "estimated gas");
            padded
        }
    };

    check_ceiling(gas, options.max_gas)?;

    Ok(TxOptions {
        gas: Some(gas),
        ..options
    })
}

/// `round(estimate + estimate * margin)`
pub fn apply_margin(estimate: u64, margin: f64) -> u64 {
    let estimate = estimate as f64;
    (estimate + estimate * margin).round() as u64
}

pub fn check_ceiling(gas: u64, max_gas: Option<u64>) -> Result<()> {
    match max_gas {
        Some(max_gas) if gas > max_gas => Err(Error::GasLimitExceeded { gas, max_gas }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_apply_margin() {
        assert_eq!(apply_margin(80_000, 0.05), 84_000);
        assert_eq!(apply_margin(80_000, 0.0), 80_000);
        assert_eq!(apply_margin(3, 0.5), 5); // 4.5 rounds away from zero
    }

    #[tokio::test]
    async fn test_estimates_when_gas_unset() {
        let calls = AtomicUsize::new(0);
        let options = TxOptions {
            gas: None,
            ..Default::default()
        };

        let resolved = resolve_gas(
            options,
            |opts| {
                calls.fetch_add(1, Ordering::SeqCst);
                assert!(opts.gas.is_none());
                async { Ok(80_000) }
            },
            0.05,
        )
        .await
        .unwrap();

        assert_eq!(resolved.gas, Some(84_000));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_explicit_gas_skips_estimate() {
        let calls = AtomicUsize::new(0);
        let options = TxOptions {
            gas: Some(30_000),
            ..Default::default()
        };

        let resolved = resolve_gas(
            options,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(1) }
            },
            0.5,
        )
        .await
        .unwrap();

        assert_eq!(resolved.gas, Some(30_000));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_estimate_over_max_gas_fails() {
        let options = TxOptions {
            max_gas: Some(84_000),
            ..Default::default()
        };

        let err = resolve_gas(options, |_| async { Ok(80_001) }, 0.05)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::GasLimitExceeded {
                gas: 84_001,
                max_gas: 84_000
            }
        ));
    }

    #[tokio::test]
    async fn test_estimate_at_max_gas_passes() {
        let options = TxOptions {
            max_gas: Some(84_000),
            ..Default::default()
        };

        let resolved = resolve_gas(options, |_| async { Ok(80_000) }, 0.05)
            .await
            .unwrap();
        assert_eq!(resolved.gas, Some(84_000));
    }

    #[tokio::test]
    async fn test_explicit_gas_over_max_gas_fails() {
        let options = TxOptions {
            gas: Some(500_000),
            max_gas: Some(100_000),
            ..Default::default()
        };

        let result = resolve_gas(options, |_| async { Ok(1) }, 0.0).await;
        assert!(matches!(result, Err(Error::GasLimitExceeded { .. })));
    }

    #[tokio::test]
    async fn test_estimate_failure_propagates() {
        let result = resolve_gas(
            TxOptions::default(),
            |_| async { Err(Error::Transport("execution reverted".into())) },
            0.05,
        )
        .await;

        assert!(matches!(result, Err(Error::Transport(_))));
    }
}

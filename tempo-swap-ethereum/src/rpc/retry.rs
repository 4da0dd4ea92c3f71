//! Backoff for read requests.
//!
//! Reads (`eth_call`, receipts, accounts, chain id) are retried while the endpoint looks
//! overloaded or briefly unreachable. Wallet answers such as a rejected signature or a revert are
//! final and surface immediately.

use std::time::Duration;

use alloy::rpc::json_rpc::ErrorPayload;
use backoff::{exponential::ExponentialBackoffBuilder, ExponentialBackoff};
use serde::Deserialize;

use crate::rpc::{
    config::RPCRetryConfig,
    errors::{AlloyError, EXECUTION_REVERTED_CODE, USER_REJECTED_CODE},
};

/// What to do with a failed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    GiveUp,
    Retry,
    /// The provider asked us to wait this long before the next attempt.
    RetryAfter(Duration),
}

fn verdict(err: &AlloyError) -> Verdict {
    let retry = |yes: bool| if yes { Verdict::Retry } else { Verdict::GiveUp };
    match err {
        AlloyError::ErrorResp(payload) => payload_verdict(payload),
        AlloyError::Transport(kind) => retry(kind.is_retry_err()),
        AlloyError::NullResp => Verdict::Retry,
        // Some providers answer errors without a JSON-RPC id, which fails to deserialize.
        AlloyError::DeserError { text, .. } => {
            #[derive(Deserialize)]
            struct Wrapped {
                error: ErrorPayload,
            }
            serde_json::from_str::<ErrorPayload>(text)
                .or_else(|_| serde_json::from_str::<Wrapped>(text).map(|w| w.error))
                .map(|payload| payload_verdict(&payload))
                .unwrap_or(Verdict::GiveUp)
        }
        _ => Verdict::GiveUp,
    }
}

fn payload_verdict(payload: &ErrorPayload) -> Verdict {
    if payload.code == USER_REJECTED_CODE || payload.code == EXECUTION_REVERTED_CODE {
        return Verdict::GiveUp;
    }
    if !payload.is_retry_err() {
        return Verdict::GiveUp;
    }
    rate_limit_hint(payload).map_or(Verdict::Retry, Verdict::RetryAfter)
}

/// Reads `data.rate.backoff_seconds` from a rate limiting error, if the provider sent one.
fn rate_limit_hint(payload: &ErrorPayload) -> Option<Duration> {
    let data = payload
        .try_data_as::<serde_json::Value>()?
        .ok()?;
    let seconds = data["rate"]["backoff_seconds"].as_f64()?;
    (seconds >= 0.0).then(|| Duration::from_secs(seconds.ceil() as u64))
}

/// Exponential backoff applied to read requests.
#[derive(Clone, Debug)]
pub struct RetryPolicy(ExponentialBackoff);

impl Default for RetryPolicy {
    fn default() -> Self {
        RPCRetryConfig::default().into()
    }
}

impl From<RPCRetryConfig> for RetryPolicy {
    fn from(config: RPCRetryConfig) -> Self {
        Self(
            ExponentialBackoffBuilder::new()
                .with_initial_interval(config.initial_backoff)
                .with_multiplier(config.multiplier)
                .with_max_interval(config.max_backoff)
                .with_max_elapsed_time(Some(config.max_elapsed))
                .build(),
        )
    }
}

impl RetryPolicy {
    #[cfg(test)]
    pub fn for_testing() -> Self {
        RPCRetryConfig::new(
            Duration::from_millis(1),
            1.1,
            Duration::from_millis(5),
            Duration::from_millis(50),
        )
        .into()
    }

    /// Runs `operation` until it succeeds, fails for good, or the policy runs out of time.
    pub(crate) async fn retry_request<F, Fut, T>(&self, mut operation: F) -> Result<T, AlloyError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, AlloyError>>,
    {
        backoff::future::retry(self.0.clone(), || {
            let attempt = operation();
            async move {
                attempt.await.map_err(|err| match verdict(&err) {
                    Verdict::GiveUp => backoff::Error::permanent(err),
                    Verdict::Retry => backoff::Error::transient(err),
                    Verdict::RetryAfter(wait) => backoff::Error::retry_after(err, wait),
                })
            }
        })
        .await
    }
}

use std::time::Duration;

/// Configuration for retrying read requests (calls, receipts, account queries).
///
/// Transaction submission is never retried.
#[derive(Clone, Debug, PartialEq)]
pub struct RPCRetryConfig {
    /// Initial backoff delay (default: 250ms)
    pub initial_backoff: Duration,
    /// Factor the delay grows by after each failed attempt (default: 1.75)
    pub multiplier: f64,
    /// Maximum backoff delay (default: 5s)
    pub max_backoff: Duration,
    /// Give up once this much time has passed since the first attempt (default: 30s)
    pub max_elapsed: Duration,
}

impl RPCRetryConfig {
    pub fn new(
        initial_backoff: Duration,
        multiplier: f64,
        max_backoff: Duration,
        max_elapsed: Duration,
    ) -> Self {
        Self { initial_backoff, multiplier, max_backoff, max_elapsed }
    }
}

impl Default for RPCRetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(250),
            multiplier: 1.75,
            max_backoff: Duration::from_secs(5),
            max_elapsed: Duration::from_secs(30),
        }
    }
}

/// How the gateway watches for a submitted transaction to be mined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptPollingConfig {
    /// Delay between two `eth_getTransactionReceipt` requests (default: 1s)
    pub interval: Duration,
}

impl Default for ReceiptPollingConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(1) }
    }
}

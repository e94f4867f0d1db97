//! Broker session lifecycle, grounded on
//! `examples/original_source/shijim/gateway/session.py`'s
//! `ShioajiSession`/`SessionConfig`: retry-with-delay `connect()`,
//! best-effort `disconnect()`. The concrete broker wire protocol is
//! abstracted behind [`BrokerSession`] so this crate never depends on a
//! specific broker SDK.

use crate::error::SubscriptionError;
use std::thread;
use std::time::Duration;

/// Retry/backoff tuning for [`BrokerSession::connect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_retries: 3, retry_delay: Duration::from_secs(3) }
    }
}

/// One logical connection to a broker. Implemented once per broker SDK;
/// [`connect_with_retry`] drives the retry loop around it.
pub trait BrokerSession: Send {
    /// A single login attempt. No internal retrying — `connect_with_retry`
    /// owns the retry policy so it can be tested without a real broker.
    fn login(&mut self) -> Result<(), String>;

    /// Best-effort logout; failures are logged, never propagated.
    fn logout(&mut self) -> Result<(), String>;

    fn is_connected(&self) -> bool;
}

/// Drive `session.login()` with up to `config.max_retries` attempts,
/// sleeping `config.retry_delay` between failures (never after the last
/// attempt).
pub fn connect_with_retry(
    session: &mut dyn BrokerSession,
    config: SessionConfig,
    index: usize,
) -> Result<(), SubscriptionError> {
    let mut last_error = String::new();
    for attempt in 1..=config.max_retries {
        match session.login() {
            Ok(()) => {
                tracing::info!(index, attempt, max = config.max_retries, "broker session login succeeded");
                return Ok(());
            }
            Err(reason) => {
                tracing::warn!(index, attempt, max = config.max_retries, %reason, "broker session login failed");
                last_error = reason;
                if attempt < config.max_retries {
                    thread::sleep(config.retry_delay);
                }
            }
        }
    }
    Err(SubscriptionError::Connect { index, reason: last_error })
}

//! Pool of broker sessions, grounded on
//! `examples/original_source/shijim/gateway/pool.py`'s `ConnectionPool`:
//! sequential jittered `login_all`, best-effort `logout_all`,
//! `get_session(index)` by modulo.

use crate::error::SubscriptionError;
use crate::session::{connect_with_retry, BrokerSession, SessionConfig};
use rand::Rng;
use std::time::Duration;

/// Jitter window between sequential logins (spec §4.5 "Session pool
/// lifecycle"), default 0.25-0.5s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterConfig {
    pub min: Duration,
    pub max: Duration,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self { min: Duration::from_millis(250), max: Duration::from_millis(500) }
    }
}

/// A fixed-size pool of broker sessions.
pub struct SessionPool<S: BrokerSession> {
    sessions: Vec<S>,
    logged_in_count: usize,
}

impl<S: BrokerSession> std::fmt::Debug for SessionPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("size", &self.sessions.len())
            .field("logged_in_count", &self.logged_in_count)
            .finish()
    }
}

impl<S: BrokerSession> SessionPool<S> {
    pub fn new(sessions: Vec<S>) -> Self {
        Self { sessions, logged_in_count: 0 }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn logged_in_count(&self) -> usize {
        self.logged_in_count
    }

    /// Login every session sequentially, sleeping a random jitter between
    /// attempts (never after the last). A session that fails all its
    /// retries is logged and skipped; the rest proceed.
    pub fn login_all(&mut self, session_config: SessionConfig, jitter: JitterConfig) {
        let total = self.sessions.len();
        self.logged_in_count = 0;
        for (i, session) in self.sessions.iter_mut().enumerate() {
            match connect_with_retry(session, session_config, i) {
                Ok(()) => {
                    self.logged_in_count += 1;
                    tracing::info!(index = i, total, "session logged in");
                }
                Err(e) => {
                    tracing::error!(index = i, total, error = %e, "session failed to log in, skipping");
                }
            }
            if i + 1 < total {
                let delay = rand::rng().random_range(jitter.min..=jitter.max);
                std::thread::sleep(delay);
            }
        }
    }

    /// Logout every session, swallowing individual failures.
    pub fn logout_all(&mut self) {
        for session in &mut self.sessions {
            if let Err(reason) = session.logout() {
                tracing::warn!(%reason, "session logout raised an error");
            }
        }
        self.logged_in_count = 0;
    }

    pub fn get_session(&self, index: usize) -> Result<&S, SubscriptionError> {
        if self.sessions.is_empty() {
            return Err(SubscriptionError::EmptyPool);
        }
        Ok(&self.sessions[index % self.sessions.len()])
    }

    pub fn get_session_mut(&mut self, index: usize) -> Result<&mut S, SubscriptionError> {
        if self.sessions.is_empty() {
            return Err(SubscriptionError::EmptyPool);
        }
        let len = self.sessions.len();
        Ok(&mut self.sessions[index % len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockSession {
        should_fail: bool,
        connected: bool,
    }

    impl BrokerSession for MockSession {
        fn login(&mut self) -> Result<(), String> {
            if self.should_fail {
                return Err("auth rejected".to_string());
            }
            self.connected = true;
            Ok(())
        }

        fn logout(&mut self) -> Result<(), String> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn no_jitter() -> JitterConfig {
        JitterConfig { min: Duration::from_millis(0), max: Duration::from_millis(1) }
    }

    fn fast_session_config() -> SessionConfig {
        SessionConfig { max_retries: 1, retry_delay: Duration::from_millis(0) }
    }

    #[test]
    fn login_all_counts_only_successful_sessions() {
        let mut pool = SessionPool::new(vec![
            MockSession { should_fail: false, connected: false },
            MockSession { should_fail: true, connected: false },
            MockSession { should_fail: false, connected: false },
        ]);
        pool.login_all(fast_session_config(), no_jitter());
        assert_eq!(pool.logged_in_count(), 2);
        assert!(pool.get_session(0).unwrap().is_connected());
        assert!(!pool.get_session(1).unwrap().is_connected());
        assert!(pool.get_session(2).unwrap().is_connected());
    }

    #[test]
    fn get_session_wraps_modulo_pool_size() {
        let pool = SessionPool::new(vec![
            MockSession { should_fail: false, connected: false },
            MockSession { should_fail: false, connected: false },
        ]);
        assert!(pool.get_session(0).is_ok());
        assert!(pool.get_session(3).is_ok());
    }

    #[test]
    fn empty_pool_reports_error() {
        let pool: SessionPool<MockSession> = SessionPool::new(vec![]);
        assert!(matches!(pool.get_session(0), Err(SubscriptionError::EmptyPool)));
    }

    #[test]
    fn logout_all_resets_logged_in_count() {
        let mut pool = SessionPool::new(vec![MockSession { should_fail: false, connected: false }]);
        pool.login_all(fast_session_config(), no_jitter());
        assert_eq!(pool.logged_in_count(), 1);
        pool.logout_all();
        assert_eq!(pool.logged_in_count(), 0);
        assert!(!pool.get_session(0).unwrap().is_connected());
    }
}

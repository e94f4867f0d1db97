//! Subscription manager, grounded on
//! `examples/original_source/shijim/gateway/subscriptions.py`'s
//! `SubscriptionManager`: round-robin pool distribution, per-session cap,
//! batched/throttled subscribe, idempotence tracking, best-effort
//! teardown.

use crate::error::SubscriptionError;
use crate::filter::{ContractFilter, ContractLookup};
use shijim_core::event::AssetType;
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

/// A universe to subscribe, split by asset class (spec §3
/// `SubscriptionPlan`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionPlan {
    pub futures: Vec<String>,
    pub stocks: Vec<String>,
}

/// Batching/throttle tuning (spec §4.5 "Batching and throttle").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscriptionConfig {
    pub max_subscriptions_per_session: usize,
    pub batch_size: usize,
    pub batch_sleep: Duration,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_subscriptions_per_session: 200,
            batch_size: 50,
            batch_sleep: Duration::from_millis(250),
        }
    }
}

/// One target to subscribe: trade-tick + top-of-book streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey {
    pub asset_type_is_stock: bool,
    pub code: String,
}

impl SubscriptionKey {
    fn new(asset_type: AssetType, code: &str) -> Self {
        Self { asset_type_is_stock: asset_type == AssetType::Stock, code: code.to_string() }
    }
}

/// Issues the two subscribe/unsubscribe calls (tick + bid/ask) for one
/// session. Implemented once per broker SDK.
pub trait QuoteSubscriber: Send + Sync {
    fn subscribe_tick(&self, session_index: usize, asset_type: AssetType, code: &str) -> Result<(), String>;
    fn subscribe_bidask(&self, session_index: usize, asset_type: AssetType, code: &str) -> Result<(), String>;
    fn unsubscribe_tick(&self, session_index: usize, asset_type: AssetType, code: &str) -> Result<(), String>;
    fn unsubscribe_bidask(&self, session_index: usize, asset_type: AssetType, code: &str) -> Result<(), String>;
}

/// Tracks which `(asset_type, code)` targets are subscribed and to which
/// session, enforcing filtering, pool distribution, per-session caps,
/// batching, and idempotent teardown.
pub struct SubscriptionManager<'a> {
    subscriber: &'a dyn QuoteSubscriber,
    session_count: usize,
    config: SubscriptionConfig,
    subscribed: BTreeMap<SubscriptionKey, usize>,
}

impl<'a> std::fmt::Debug for SubscriptionManager<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("session_count", &self.session_count)
            .field("config", &self.config)
            .field("subscribed", &self.subscribed.len())
            .finish()
    }
}

impl<'a> SubscriptionManager<'a> {
    pub fn new(
        subscriber: &'a dyn QuoteSubscriber,
        session_count: usize,
        config: SubscriptionConfig,
    ) -> Result<Self, SubscriptionError> {
        if session_count == 0 {
            return Err(SubscriptionError::EmptyPool);
        }
        if config.batch_size == 0 {
            return Err(SubscriptionError::InvalidBatchSize);
        }
        Ok(Self { subscriber, session_count, config, subscribed: BTreeMap::new() })
    }

    pub fn subscribed_count(&self) -> usize {
        self.subscribed.len()
    }

    /// Filter, distribute, and subscribe every target in `plan`.
    pub fn subscribe_universe(&mut self, plan: &SubscriptionPlan, filter: &ContractFilter, lookup: &dyn ContractLookup) {
        let futures: Vec<&str> = filter.filter_codes(&plan.futures, AssetType::Futures, lookup);
        let stocks: Vec<&str> = filter.filter_codes(&plan.stocks, AssetType::Stock, lookup);

        let mut targets: Vec<(AssetType, String)> = Vec::with_capacity(futures.len() + stocks.len());
        targets.extend(futures.into_iter().map(|c| (AssetType::Futures, c.to_string())));
        targets.extend(stocks.into_iter().map(|c| (AssetType::Stock, c.to_string())));

        if targets.is_empty() {
            tracing::info!("subscription manager: no contracts to subscribe after filtering");
            return;
        }

        let mut buckets: Vec<Vec<(AssetType, String)>> = vec![Vec::new(); self.session_count];
        for (i, target) in targets.into_iter().enumerate() {
            buckets[i % self.session_count].push(target);
        }

        for (session_index, bucket) in buckets.into_iter().enumerate() {
            self.subscribe_bucket(session_index, bucket);
        }
    }

    fn subscribe_bucket(&mut self, session_index: usize, mut bucket: Vec<(AssetType, String)>) {
        if bucket.len() > self.config.max_subscriptions_per_session {
            tracing::warn!(
                session_index,
                dropped = bucket.len() - self.config.max_subscriptions_per_session,
                cap = self.config.max_subscriptions_per_session,
                "session subscription bucket truncated to per-session cap"
            );
            bucket.truncate(self.config.max_subscriptions_per_session);
        }

        let total = bucket.len();
        let mut processed = 0usize;
        for (batch_index, batch) in bucket.chunks(self.config.batch_size).enumerate() {
            for (asset_type, code) in batch {
                processed += 1;
                let key = SubscriptionKey::new(*asset_type, code);
                if self.subscribed.contains_key(&key) {
                    continue;
                }
                if self.subscribe_one(session_index, *asset_type, code) {
                    self.subscribed.insert(key, session_index);
                }
            }
            tracing::info!(session_index, processed, total, "subscribed batch");

            let is_last_batch = (batch_index + 1) * self.config.batch_size >= total;
            if !is_last_batch && !self.config.batch_sleep.is_zero() {
                thread::sleep(self.config.batch_sleep);
            }
        }
    }

    fn subscribe_one(&self, session_index: usize, asset_type: AssetType, code: &str) -> bool {
        let tick = self.subscriber.subscribe_tick(session_index, asset_type, code);
        let bidask = self.subscriber.subscribe_bidask(session_index, asset_type, code);
        match (tick, bidask) {
            (Ok(()), Ok(())) => true,
            (tick, bidask) => {
                tracing::warn!(
                    session_index,
                    code,
                    tick_err = tick.err(),
                    bidask_err = bidask.err(),
                    "subscribe failed for target"
                );
                false
            }
        }
    }

    /// Unsubscribe every tracked target, best-effort. Safe to call twice:
    /// the second call iterates an already-empty map and is a no-op.
    pub fn unsubscribe_all(&mut self) {
        for (key, session_index) in std::mem::take(&mut self.subscribed) {
            let asset_type = if key.asset_type_is_stock { AssetType::Stock } else { AssetType::Futures };
            if let Err(reason) = self.subscriber.unsubscribe_tick(session_index, asset_type, &key.code) {
                tracing::warn!(code = %key.code, %reason, "unsubscribe_tick failed");
            }
            if let Err(reason) = self.subscriber.unsubscribe_bidask(session_index, asset_type, &key.code) {
                tracing::warn!(code = %key.code, %reason, "unsubscribe_bidask failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ContractInfo;
    use std::sync::Mutex;

    struct AllowAllLookup;
    impl ContractLookup for AllowAllLookup {
        fn lookup(&self, _asset_type: AssetType, _code: &str) -> Option<ContractInfo> {
            Some(ContractInfo { exchange: "TSE".to_string(), contract_type: None })
        }
    }

    #[derive(Default)]
    struct RecordingSubscriber {
        calls: Mutex<Vec<(usize, String, &'static str)>>,
        fail_codes: Vec<String>,
    }

    impl QuoteSubscriber for RecordingSubscriber {
        fn subscribe_tick(&self, session_index: usize, _asset_type: AssetType, code: &str) -> Result<(), String> {
            self.calls.lock().unwrap().push((session_index, code.to_string(), "tick"));
            if self.fail_codes.iter().any(|c| c == code) {
                return Err("rejected".to_string());
            }
            Ok(())
        }
        fn subscribe_bidask(&self, session_index: usize, _asset_type: AssetType, code: &str) -> Result<(), String> {
            self.calls.lock().unwrap().push((session_index, code.to_string(), "bidask"));
            Ok(())
        }
        fn unsubscribe_tick(&self, session_index: usize, _asset_type: AssetType, code: &str) -> Result<(), String> {
            self.calls.lock().unwrap().push((session_index, code.to_string(), "unsub_tick"));
            Ok(())
        }
        fn unsubscribe_bidask(&self, session_index: usize, _asset_type: AssetType, code: &str) -> Result<(), String> {
            self.calls.lock().unwrap().push((session_index, code.to_string(), "unsub_bidask"));
            Ok(())
        }
    }

    fn fast_config() -> SubscriptionConfig {
        SubscriptionConfig { max_subscriptions_per_session: 200, batch_size: 50, batch_sleep: Duration::ZERO }
    }

    #[test]
    fn distributes_targets_round_robin_across_sessions() {
        let subscriber = RecordingSubscriber::default();
        let mut manager = SubscriptionManager::new(&subscriber, 2, fast_config()).unwrap();
        let plan = SubscriptionPlan {
            futures: vec![],
            stocks: vec!["2330".to_string(), "2317".to_string(), "2412".to_string()],
        };
        manager.subscribe_universe(&plan, &ContractFilter::default(), &AllowAllLookup);
        assert_eq!(manager.subscribed_count(), 3);
        assert_eq!(manager.subscribed.get(&SubscriptionKey::new(AssetType::Stock, "2330")), Some(&0));
        assert_eq!(manager.subscribed.get(&SubscriptionKey::new(AssetType::Stock, "2317")), Some(&1));
        assert_eq!(manager.subscribed.get(&SubscriptionKey::new(AssetType::Stock, "2412")), Some(&0));
    }

    #[test]
    fn duplicate_subscribe_is_idempotent() {
        let subscriber = RecordingSubscriber::default();
        let mut manager = SubscriptionManager::new(&subscriber, 1, fast_config()).unwrap();
        let plan = SubscriptionPlan { futures: vec![], stocks: vec!["2330".to_string()] };
        manager.subscribe_universe(&plan, &ContractFilter::default(), &AllowAllLookup);
        manager.subscribe_universe(&plan, &ContractFilter::default(), &AllowAllLookup);
        let calls = subscriber.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|(_, code, kind)| code == "2330" && *kind == "tick").count(), 1);
    }

    #[test]
    fn per_session_cap_truncates_excess_targets() {
        let subscriber = RecordingSubscriber::default();
        let config = SubscriptionConfig { max_subscriptions_per_session: 2, batch_size: 50, batch_sleep: Duration::ZERO };
        let mut manager = SubscriptionManager::new(&subscriber, 1, config).unwrap();
        let plan = SubscriptionPlan {
            futures: vec![],
            stocks: vec!["2330".to_string(), "2317".to_string(), "2412".to_string()],
        };
        manager.subscribe_universe(&plan, &ContractFilter::default(), &AllowAllLookup);
        assert_eq!(manager.subscribed_count(), 2);
    }

    #[test]
    fn failed_subscribe_is_not_tracked() {
        let subscriber = RecordingSubscriber { fail_codes: vec!["2330".to_string()], ..Default::default() };
        let mut manager = SubscriptionManager::new(&subscriber, 1, fast_config()).unwrap();
        let plan = SubscriptionPlan { futures: vec![], stocks: vec!["2330".to_string(), "2317".to_string()] };
        manager.subscribe_universe(&plan, &ContractFilter::default(), &AllowAllLookup);
        assert_eq!(manager.subscribed_count(), 1);
    }

    #[test]
    fn unsubscribe_all_is_a_no_op_second_time() {
        let subscriber = RecordingSubscriber::default();
        let mut manager = SubscriptionManager::new(&subscriber, 1, fast_config()).unwrap();
        let plan = SubscriptionPlan { futures: vec![], stocks: vec!["2330".to_string()] };
        manager.subscribe_universe(&plan, &ContractFilter::default(), &AllowAllLookup);
        manager.unsubscribe_all();
        assert_eq!(manager.subscribed_count(), 0);
        let calls_after_first = subscriber.calls.lock().unwrap().len();
        manager.unsubscribe_all();
        assert_eq!(subscriber.calls.lock().unwrap().len(), calls_after_first);
    }

    #[test]
    fn empty_plan_does_not_call_subscriber() {
        let subscriber = RecordingSubscriber::default();
        let mut manager = SubscriptionManager::new(&subscriber, 1, fast_config()).unwrap();
        manager.subscribe_universe(&SubscriptionPlan::default(), &ContractFilter::default(), &AllowAllLookup);
        assert!(subscriber.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_sessions_is_rejected_at_construction() {
        let subscriber = RecordingSubscriber::default();
        assert!(matches!(
            SubscriptionManager::new(&subscriber, 0, fast_config()),
            Err(SubscriptionError::EmptyPool)
        ));
    }
}

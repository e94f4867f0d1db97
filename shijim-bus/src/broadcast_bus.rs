//! Broadcast event bus: every live subscriber gets its own bounded
//! queue, so each independently observes every matching event.
//!
//! Grounded on `examples/original_source/shijim/bus/event_bus.py`'s
//! `BroadcastEventBus`, re-architected per the Design Note ("Broadcast
//! bus per-subscriber queue registry held by lock + subscription
//! lifetime -> explicit subscription handles that deregister themselves
//! on drop; the registry is a map from topic to list of weak references
//! to live handles"): the registry holds `Weak` references, so a
//! dropped [`Subscription`] simply stops upgrading and is pruned lazily.

use crate::topic::Topic;
use crate::{EventBus, LagReport};
use shijim_core::event::MarketDataEvent;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, RwLock, Weak};
use std::time::Duration;
use tracing::warn;

const HIGH_WATER_MARK_RATIO: f64 = 0.8;

struct SubscriberQueue {
    max_queue_size: usize,
    state: Mutex<VecDeque<MarketDataEvent>>,
    not_empty: Condvar,
}

impl SubscriberQueue {
    fn push(&self, event: MarketDataEvent) {
        let mut queue = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= self.max_queue_size {
            queue.pop_front();
            warn!(
                max_queue_size = self.max_queue_size,
                "BroadcastEventBus queue exceeded max_queue_size; dropping oldest event"
            );
        }
        queue.push_back(event);
        if queue.len() as f64 >= self.max_queue_size as f64 * HIGH_WATER_MARK_RATIO {
            warn!(
                queue_len = queue.len(),
                max_queue_size = self.max_queue_size,
                "BroadcastEventBus queue high water mark"
            );
        }
        drop(queue);
        self.not_empty.notify_all();
    }
}

struct Inner {
    max_queue_size: usize,
    registry: RwLock<HashMap<Topic, Vec<Weak<SubscriberQueue>>>>,
}

/// Broadcast ("per-subscriber") event bus. Cheaply cloneable: clones
/// share the same subscriber registry.
#[derive(Clone)]
pub struct BroadcastBus(Arc<Inner>);

impl std::fmt::Debug for BroadcastBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastBus")
            .field("max_queue_size", &self.0.max_queue_size)
            .finish()
    }
}

impl BroadcastBus {
    pub fn new(max_queue_size: usize) -> Self {
        Self(Arc::new(Inner {
            max_queue_size,
            registry: RwLock::new(HashMap::new()),
        }))
    }
}

impl EventBus for BroadcastBus {
    type Subscription = Subscription;

    fn publish(&self, event: MarketDataEvent) {
        let registry = self.0.registry.read().unwrap_or_else(|e| e.into_inner());
        let concrete = Topic::of(&event);
        for topic in [concrete, Topic::Wildcard] {
            if let Some(subs) = registry.get(&topic) {
                for weak in subs {
                    if let Some(queue) = weak.upgrade() {
                        queue.push(event.clone());
                    }
                }
            }
        }
    }

    fn publish_many(&self, events: Vec<MarketDataEvent>) {
        if events.is_empty() {
            return;
        }
        let registry = self.0.registry.read().unwrap_or_else(|e| e.into_inner());
        for event in events {
            let concrete = Topic::of(&event);
            for topic in [concrete, Topic::Wildcard] {
                if let Some(subs) = registry.get(&topic) {
                    for weak in subs {
                        if let Some(queue) = weak.upgrade() {
                            queue.push(event.clone());
                        }
                    }
                }
            }
        }
    }

    fn subscribe(&self, topic: Topic, timeout: Option<Duration>) -> Subscription {
        let queue = Arc::new(SubscriberQueue {
            max_queue_size: self.0.max_queue_size,
            state: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        });

        let mut registry = self.0.registry.write().unwrap_or_else(|e| e.into_inner());
        let slot = registry.entry(topic).or_default();
        slot.retain(|weak| weak.strong_count() > 0);
        slot.push(Arc::downgrade(&queue));

        Subscription { queue, timeout }
    }

    fn get_lag(&self, topic: Option<Topic>) -> LagReport {
        let registry = self.0.registry.read().unwrap_or_else(|e| e.into_inner());
        let lag_for = |subs: &[Weak<SubscriberQueue>]| -> usize {
            subs.iter()
                .filter_map(|w| w.upgrade())
                .map(|q| q.state.lock().unwrap_or_else(|e| e.into_inner()).len())
                .max()
                .unwrap_or(0)
        };
        match topic {
            Some(t) => {
                let mut report = LagReport::new();
                let lag = registry.get(&t).map(|subs| lag_for(subs)).unwrap_or(0);
                report.insert(t.to_string(), lag);
                report
            }
            None => registry.iter().map(|(t, subs)| (t.to_string(), lag_for(subs))).collect(),
        }
    }
}

/// A live broadcast subscription. Each subscriber owns a dedicated
/// bounded queue for the lifetime of this handle.
pub struct Subscription {
    queue: Arc<SubscriberQueue>,
    timeout: Option<Duration>,
}

impl Iterator for Subscription {
    type Item = Option<MarketDataEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut guard = self.queue.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(event) = guard.pop_front() {
                return Some(Some(event));
            }
            match self.timeout {
                None => {
                    guard = self
                        .queue
                        .not_empty
                        .wait(guard)
                        .unwrap_or_else(|e| e.into_inner());
                }
                Some(duration) => {
                    let (next_guard, result) = self
                        .queue
                        .not_empty
                        .wait_timeout(guard, duration)
                        .unwrap_or_else(|e| e.into_inner());
                    guard = next_guard;
                    if result.timed_out() {
                        if let Some(event) = guard.pop_front() {
                            return Some(Some(event));
                        }
                        return Some(None);
                    }
                }
            }
        }
    }
}

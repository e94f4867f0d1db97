//! Competing-consumer event bus: one shared queue per topic, consumed
//! cooperatively by however many subscribers are registered.
//!
//! Grounded on `examples/original_source/shijim/bus/event_bus.py`'s
//! `InMemoryEventBus`.

use crate::topic::Topic;
use crate::{EventBus, LagReport};
use shijim_core::event::MarketDataEvent;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracing::warn;

const HIGH_WATER_MARK_RATIO: f64 = 0.8;

struct Inner {
    max_queue_size: usize,
    queues: Mutex<HashMap<Topic, VecDeque<MarketDataEvent>>>,
    not_empty: Condvar,
}

impl Inner {
    fn push_locked(queues: &mut HashMap<Topic, VecDeque<MarketDataEvent>>, topic: Topic, event: MarketDataEvent, max_queue_size: usize) {
        let queue = queues.entry(topic).or_default();
        if queue.len() >= max_queue_size {
            queue.pop_front();
            warn!(
                topic = %topic,
                max_queue_size,
                "EventBus backlog exceeded max_queue_size; dropping oldest event"
            );
        }
        queue.push_back(event);
        if queue.len() as f64 >= max_queue_size as f64 * HIGH_WATER_MARK_RATIO {
            warn!(
                topic = %topic,
                queue_len = queue.len(),
                max_queue_size,
                "EventBus queue high water mark"
            );
        }
    }
}

/// Competing-consumer ("queue") event bus. Cheaply cloneable: clones
/// share the same underlying queues.
#[derive(Clone)]
pub struct QueueBus(Arc<Inner>);

impl std::fmt::Debug for QueueBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueBus")
            .field("max_queue_size", &self.0.max_queue_size)
            .finish()
    }
}

impl QueueBus {
    pub fn new(max_queue_size: usize) -> Self {
        Self(Arc::new(Inner {
            max_queue_size,
            queues: Mutex::new(HashMap::new()),
            not_empty: Condvar::new(),
        }))
    }
}

impl EventBus for QueueBus {
    type Subscription = QueueSubscription;

    fn publish(&self, event: MarketDataEvent) {
        let mut queues = self.0.queues.lock().unwrap_or_else(|e| e.into_inner());
        let concrete = Topic::of(&event);
        Inner::push_locked(&mut queues, concrete, event.clone(), self.0.max_queue_size);
        Inner::push_locked(&mut queues, Topic::Wildcard, event, self.0.max_queue_size);
        drop(queues);
        self.0.not_empty.notify_all();
    }

    fn publish_many(&self, events: Vec<MarketDataEvent>) {
        if events.is_empty() {
            return;
        }
        let mut queues = self.0.queues.lock().unwrap_or_else(|e| e.into_inner());
        for event in events {
            let concrete = Topic::of(&event);
            Inner::push_locked(&mut queues, concrete, event.clone(), self.0.max_queue_size);
            Inner::push_locked(&mut queues, Topic::Wildcard, event, self.0.max_queue_size);
        }
        drop(queues);
        self.0.not_empty.notify_all();
    }

    fn subscribe(&self, topic: Topic, timeout: Option<Duration>) -> QueueSubscription {
        QueueSubscription { inner: Arc::clone(&self.0), topic, timeout }
    }

    fn get_lag(&self, topic: Option<Topic>) -> LagReport {
        let queues = self.0.queues.lock().unwrap_or_else(|e| e.into_inner());
        match topic {
            Some(t) => {
                let mut report = LagReport::new();
                report.insert(t.to_string(), queues.get(&t).map(VecDeque::len).unwrap_or(0));
                report
            }
            None => queues.iter().map(|(t, q)| (t.to_string(), q.len())).collect(),
        }
    }
}

/// An ephemeral consumer of a shared per-topic queue (spec §4.1: "a
/// subscriber is an ephemeral consumer of the shared per-topic queue").
pub struct QueueSubscription {
    inner: Arc<Inner>,
    topic: Topic,
    timeout: Option<Duration>,
}

impl Iterator for QueueSubscription {
    type Item = Option<MarketDataEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut guard = self.inner.queues.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(event) = guard.get_mut(&self.topic).and_then(VecDeque::pop_front) {
                return Some(Some(event));
            }
            match self.timeout {
                None => {
                    guard = self
                        .inner
                        .not_empty
                        .wait(guard)
                        .unwrap_or_else(|e| e.into_inner());
                }
                Some(duration) => {
                    let (next_guard, result) = self
                        .inner
                        .not_empty
                        .wait_timeout(guard, duration)
                        .unwrap_or_else(|e| e.into_inner());
                    guard = next_guard;
                    if result.timed_out() {
                        if let Some(event) = guard.get_mut(&self.topic).and_then(VecDeque::pop_front) {
                            return Some(Some(event));
                        }
                        return Some(None);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shijim_core::event::{AssetType, MDTickEvent, Side};
    use shijim_core::extras::Extras;

    fn tick(ts_ns: i64, symbol: &str) -> MarketDataEvent {
        MDTickEvent::new(
            ts_ns,
            symbol,
            AssetType::Stock,
            "TSE",
            None,
            None,
            Side::None,
            None,
            None,
            Extras::new(),
        )
        .unwrap()
        .into()
    }

    #[test]
    fn single_subscriber_observes_events_in_order() {
        let bus = QueueBus::new(100);
        for i in 0..5 {
            bus.publish(tick(i, "2330"));
        }
        let mut sub = bus.subscribe(Topic::Tick, None);
        for i in 0..5 {
            assert_eq!(sub.next().unwrap().unwrap().ts_ns(), i);
        }
    }

    #[test]
    fn backpressure_drops_oldest_and_keeps_tail() {
        let bus = QueueBus::new(3);
        for i in 0..5 {
            bus.publish(tick(i, "2330"));
        }
        let mut sub = bus.subscribe(Topic::Tick, None);
        let observed: Vec<i64> = (0..3).map(|_| sub.next().unwrap().unwrap().ts_ns()).collect();
        assert_eq!(observed, vec![2, 3, 4]);
    }

    #[test]
    fn timeout_yields_heartbeat_null() {
        let bus = QueueBus::new(10);
        let mut sub = bus.subscribe(Topic::Tick, Some(Duration::from_millis(5)));
        assert_eq!(sub.next().unwrap(), None);
    }

    #[test]
    fn wildcard_topic_observes_every_event_kind() {
        let bus = QueueBus::new(10);
        bus.publish(tick(1, "2330"));
        let mut sub = bus.subscribe(Topic::Wildcard, None);
        assert!(sub.next().unwrap().is_some());
    }
}

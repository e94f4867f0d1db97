#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]
//! # shijim-bus
//!
//! In-process event bus with dual semantics (spec §4.1), grounded on
//! `examples/original_source/shijim/bus/event_bus.py`:
//!
//! - [`queue_bus::QueueBus`] — competing-consumer: all subscribers on a
//!   topic share one queue, so each published event is delivered to
//!   exactly one of them.
//! - [`broadcast_bus::BroadcastBus`] — broadcast: each [`Subscription`]
//!   gets a dedicated bounded queue, so every subscriber independently
//!   observes every matching event.
//!
//! Both implement [`EventBus`] and share the same drop-oldest
//! backpressure policy.

pub mod broadcast_bus;
pub mod error;
pub mod queue_bus;
pub mod topic;

pub use broadcast_bus::BroadcastBus;
pub use error::BusError;
pub use queue_bus::QueueBus;
pub use topic::Topic;

use shijim_core::event::MarketDataEvent;
use std::collections::HashMap;

/// Current queue depth per topic, used for observability (spec §4.1
/// `get_lag`).
pub type LagReport = HashMap<String, usize>;

/// Common interface implemented by both bus flavors.
///
/// `publish`/`publish_many` never block the publisher: backpressure is
/// handled by dropping the oldest queued event (spec §4.1).
pub trait EventBus {
    type Subscription: Iterator<Item = Option<MarketDataEvent>>;

    /// Enqueue an event for consumers of its topic and of the wildcard
    /// topic.
    fn publish(&self, event: MarketDataEvent);

    /// Enqueue a batch of events, amortizing lock acquisition.
    fn publish_many(&self, events: Vec<MarketDataEvent>);

    /// Register a subscriber for `topic`. The returned iterator yields
    /// `Some(event)` for real events and `None` as a heartbeat sentinel
    /// when `timeout` elapses with nothing queued.
    fn subscribe(&self, topic: Topic, timeout: Option<std::time::Duration>) -> Self::Subscription;

    /// Current depth of the queue(s) for `topic`, or every topic's depth
    /// if `topic` is `None`.
    fn get_lag(&self, topic: Option<Topic>) -> LagReport;
}

//! Bus topics: either a concrete normalized-event tag or the wildcard.

use shijim_core::event::{MDBookEvent, MDTickEvent, MarketDataEvent};

/// A bus topic: the concrete event tag (`MD_TICK`, `MD_BOOK`) or the
/// wildcard topic that observes every event regardless of tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Tick,
    Book,
    Wildcard,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Tick, Topic::Book, Topic::Wildcard];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Tick => MDTickEvent::TAG,
            Topic::Book => MDBookEvent::TAG,
            Topic::Wildcard => "*",
        }
    }

    pub fn of(event: &MarketDataEvent) -> Topic {
        match event {
            MarketDataEvent::Tick(_) => Topic::Tick,
            MarketDataEvent::Book(_) => Topic::Book,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

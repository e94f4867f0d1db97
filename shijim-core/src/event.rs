//! Normalized, immutable, value-typed market data events (spec §3).

use crate::error::ShijimError;
use crate::extras::Extras;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Asset class of a normalized event's instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Futures,
    Stock,
}

/// Aggressor side of a trade tick, if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
    None,
}

/// A single trade event or top-of-book update for one symbol.
///
/// `ts_ns` is the single canonical timestamp field, UTC nanoseconds since
/// the Unix epoch (Open Question in spec §9, resolved in `SPEC_FULL.md`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MDTickEvent {
    pub ts_ns: i64,
    pub symbol: String,
    pub asset_type: AssetType,
    pub exchange: String,
    pub price: Option<Decimal>,
    pub size: Option<i64>,
    pub side: Side,
    pub total_volume: Option<i64>,
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub extras: Extras,
}

impl MDTickEvent {
    /// Tag written to the `type` discriminator field when serialized as
    /// part of a [`MarketDataEvent`].
    pub const TAG: &'static str = "MD_TICK";

    /// Construct a tick event, enforcing the invariants in spec §3
    /// (`ts_ns >= 0`).
    pub fn new(
        ts_ns: i64,
        symbol: impl Into<String>,
        asset_type: AssetType,
        exchange: impl Into<String>,
        price: Option<Decimal>,
        size: Option<i64>,
        side: Side,
        total_volume: Option<i64>,
        total_amount: Option<Decimal>,
        extras: Extras,
    ) -> Result<Self, ShijimError> {
        if ts_ns < 0 {
            return Err(ShijimError::NegativeTimestamp(ts_ns));
        }
        Ok(Self {
            ts_ns,
            symbol: symbol.into(),
            asset_type,
            exchange: exchange.into(),
            price,
            size,
            side,
            total_volume,
            total_amount,
            extras,
        })
    }
}

/// A snapshot of the top-N price levels on bid and ask, plus the tick
/// fields that also apply to book updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MDBookEvent {
    pub ts_ns: i64,
    pub symbol: String,
    pub asset_type: AssetType,
    pub exchange: String,
    pub price: Option<Decimal>,
    pub size: Option<i64>,
    pub side: Side,
    pub total_volume: Option<i64>,
    pub total_amount: Option<Decimal>,
    pub bid_prices: Vec<Decimal>,
    pub bid_volumes: Vec<i64>,
    pub ask_prices: Vec<Decimal>,
    pub ask_volumes: Vec<i64>,
    pub bid_total_vol: Option<i64>,
    pub ask_total_vol: Option<i64>,
    pub underlying_price: Option<Decimal>,
    #[serde(default)]
    pub extras: Extras,
}

impl MDBookEvent {
    pub const TAG: &'static str = "MD_BOOK";

    /// Construct a book event, enforcing the invariants in spec §3:
    /// `ts_ns >= 0`, matching bid/ask array lengths, descending bids,
    /// ascending asks (index 0 = best, preserving the broker's level
    /// ordering).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ts_ns: i64,
        symbol: impl Into<String>,
        asset_type: AssetType,
        exchange: impl Into<String>,
        price: Option<Decimal>,
        size: Option<i64>,
        side: Side,
        total_volume: Option<i64>,
        total_amount: Option<Decimal>,
        bid_prices: Vec<Decimal>,
        bid_volumes: Vec<i64>,
        ask_prices: Vec<Decimal>,
        ask_volumes: Vec<i64>,
        bid_total_vol: Option<i64>,
        ask_total_vol: Option<i64>,
        underlying_price: Option<Decimal>,
        extras: Extras,
    ) -> Result<Self, ShijimError> {
        if ts_ns < 0 {
            return Err(ShijimError::NegativeTimestamp(ts_ns));
        }
        if bid_prices.len() != bid_volumes.len() {
            return Err(ShijimError::BidLengthMismatch {
                bid_prices: bid_prices.len(),
                bid_volumes: bid_volumes.len(),
            });
        }
        if ask_prices.len() != ask_volumes.len() {
            return Err(ShijimError::AskLengthMismatch {
                ask_prices: ask_prices.len(),
                ask_volumes: ask_volumes.len(),
            });
        }
        for i in 1..bid_prices.len() {
            if bid_prices[i] > bid_prices[i - 1] {
                return Err(ShijimError::BidNotDescending { index: i });
            }
        }
        for i in 1..ask_prices.len() {
            if ask_prices[i] < ask_prices[i - 1] {
                return Err(ShijimError::AskNotAscending { index: i });
            }
        }
        Ok(Self {
            ts_ns,
            symbol: symbol.into(),
            asset_type,
            exchange: exchange.into(),
            price,
            size,
            side,
            total_volume,
            total_amount,
            bid_prices,
            bid_volumes,
            ask_prices,
            ask_volumes,
            bid_total_vol,
            ask_total_vol,
            underlying_price,
            extras,
        })
    }

    /// Best bid price (index 0), if the book has any bid levels.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bid_prices.first().copied()
    }

    /// Best ask price (index 0), if the book has any ask levels.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.ask_prices.first().copied()
    }
}

/// Discriminated union of the two normalized event kinds, carrying the
/// `type` tag used by the event bus's topic routing and by the raw
/// writer's JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarketDataEvent {
    #[serde(rename = "MD_TICK")]
    Tick(MDTickEvent),
    #[serde(rename = "MD_BOOK")]
    Book(MDBookEvent),
}

impl MarketDataEvent {
    /// The topic this event routes to on the event bus: the concrete
    /// tag (`MD_TICK`/`MD_BOOK`), never the wildcard.
    pub fn topic(&self) -> &'static str {
        match self {
            MarketDataEvent::Tick(_) => MDTickEvent::TAG,
            MarketDataEvent::Book(_) => MDBookEvent::TAG,
        }
    }

    pub fn ts_ns(&self) -> i64 {
        match self {
            MarketDataEvent::Tick(t) => t.ts_ns,
            MarketDataEvent::Book(b) => b.ts_ns,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            MarketDataEvent::Tick(t) => &t.symbol,
            MarketDataEvent::Book(b) => &b.symbol,
        }
    }
}

impl From<MDTickEvent> for MarketDataEvent {
    fn from(value: MDTickEvent) -> Self {
        MarketDataEvent::Tick(value)
    }
}

impl From<MDBookEvent> for MarketDataEvent {
    fn from(value: MDBookEvent) -> Self {
        MarketDataEvent::Book(value)
    }
}

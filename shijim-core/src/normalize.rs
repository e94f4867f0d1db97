//! Market-data normalization contract (spec §4, component "Normalizers").
//!
//! Re-architects the source system's dynamic attribute probing on broker
//! payloads (`getattr`-style) into a typed trait: declare `BrokerPayload`
//! once per payload shape (futures-tick, futures-book, stock-tick,
//! stock-book) and let the normalizer consume the trait instead of
//! reflecting over an untyped object (Design Note, spec §9).

use crate::error::ShijimError;
use crate::event::{AssetType, MDBookEvent, MDTickEvent, Side};
use crate::extras::Extras;
use rust_decimal::Decimal;

/// Typed view over a broker callback payload.
///
/// Implement this once per concrete payload shape the broker feed
/// delivers (§6: futures-tick, futures-book, stock-tick, stock-book).
/// `normalize_tick`/`normalize_book` consume only this trait, so adding a
/// new broker never touches the normalization logic itself.
pub trait BrokerPayload {
    /// Exchange-native symbol/contract code.
    fn code(&self) -> &str;

    /// Exchange identifier (e.g. `"TSE"`, `"OTC"`, `"TAIFEX"`).
    fn exchange(&self) -> &str;

    /// Event timestamp as UTC nanoseconds since the Unix epoch.
    fn ts_ns(&self) -> i64;

    /// Asset class of the instrument this payload describes.
    fn asset_type(&self) -> AssetType;

    /// Last trade price, if this payload carries one.
    fn close(&self) -> Option<Decimal>;

    /// Last trade size, if this payload carries one.
    fn volume(&self) -> Option<i64>;

    /// Cumulative session volume, if known.
    fn total_volume(&self) -> Option<i64>;

    /// Cumulative session notional amount, if known.
    fn total_amount(&self) -> Option<Decimal>;

    /// Bid price levels, best first.
    fn bid_price(&self) -> &[Decimal];

    /// Bid size levels, aligned index-for-index with [`Self::bid_price`].
    fn bid_volume(&self) -> &[i64];

    /// Ask price levels, best first.
    fn ask_price(&self) -> &[Decimal];

    /// Ask size levels, aligned index-for-index with [`Self::ask_price`].
    fn ask_volume(&self) -> &[i64];

    /// Raw tick-direction code: `1` = buy, `2` = sell, anything else =
    /// no known aggressor side.
    fn tick_type(&self) -> i32;

    /// Underlying reference price for derivatives, if applicable.
    fn underlying_price(&self) -> Option<Decimal>;

    /// Whether this tick is a simulated ("simtrade") print.
    fn simtrade(&self) -> bool;
}

fn side_from_tick_type(tick_type: i32) -> Side {
    match tick_type {
        1 => Side::Buy,
        2 => Side::Sell,
        _ => Side::None,
    }
}

fn simtrade_extras(payload: &impl BrokerPayload) -> Extras {
    let mut extras = Extras::new();
    extras.insert("simtrade".to_string(), payload.simtrade().into());
    extras
}

/// Normalize a futures-tick or stock-tick broker payload into an
/// [`MDTickEvent`].
pub fn normalize_tick(payload: &impl BrokerPayload) -> Result<MDTickEvent, ShijimError> {
    MDTickEvent::new(
        payload.ts_ns(),
        payload.code(),
        payload.asset_type(),
        payload.exchange(),
        payload.close(),
        payload.volume(),
        side_from_tick_type(payload.tick_type()),
        payload.total_volume(),
        payload.total_amount(),
        simtrade_extras(payload),
    )
}

/// Normalize a futures-book or stock-book broker payload into an
/// [`MDBookEvent`]. Preserves the broker's level ordering verbatim
/// (index 0 = best), per spec §3.
pub fn normalize_book(payload: &impl BrokerPayload) -> Result<MDBookEvent, ShijimError> {
    MDBookEvent::new(
        payload.ts_ns(),
        payload.code(),
        payload.asset_type(),
        payload.exchange(),
        payload.close(),
        payload.volume(),
        side_from_tick_type(payload.tick_type()),
        payload.total_volume(),
        payload.total_amount(),
        payload.bid_price().to_vec(),
        payload.bid_volume().to_vec(),
        payload.ask_price().to_vec(),
        payload.ask_volume().to_vec(),
        payload.bid_volume().iter().copied().reduce(|a, b| a + b),
        payload.ask_volume().iter().copied().reduce(|a, b| a + b),
        payload.underlying_price(),
        simtrade_extras(payload),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct FakeStockBook {
        bid_price: Vec<Decimal>,
        bid_volume: Vec<i64>,
        ask_price: Vec<Decimal>,
        ask_volume: Vec<i64>,
    }

    impl BrokerPayload for FakeStockBook {
        fn code(&self) -> &str {
            "2330"
        }
        fn exchange(&self) -> &str {
            "TSE"
        }
        fn ts_ns(&self) -> i64 {
            1_700_000_000_000_000_000
        }
        fn asset_type(&self) -> AssetType {
            AssetType::Stock
        }
        fn close(&self) -> Option<Decimal> {
            Some(dec!(600))
        }
        fn volume(&self) -> Option<i64> {
            Some(10)
        }
        fn total_volume(&self) -> Option<i64> {
            Some(1000)
        }
        fn total_amount(&self) -> Option<Decimal> {
            Some(dec!(600000))
        }
        fn bid_price(&self) -> &[Decimal] {
            &self.bid_price
        }
        fn bid_volume(&self) -> &[i64] {
            &self.bid_volume
        }
        fn ask_price(&self) -> &[Decimal] {
            &self.ask_price
        }
        fn ask_volume(&self) -> &[i64] {
            &self.ask_volume
        }
        fn tick_type(&self) -> i32 {
            1
        }
        fn underlying_price(&self) -> Option<Decimal> {
            None
        }
        fn simtrade(&self) -> bool {
            false
        }
    }

    #[test]
    fn normalize_book_preserves_broker_level_ordering() {
        let payload = FakeStockBook {
            bid_price: vec![dec!(600), dec!(599.5)],
            bid_volume: vec![5, 3],
            ask_price: vec![dec!(600.5), dec!(601)],
            ask_volume: vec![2, 7],
        };

        let book = normalize_book(&payload).unwrap();
        assert_eq!(book.bid_prices[0], dec!(600));
        assert_eq!(book.ask_prices[0], dec!(600.5));
        assert_eq!(book.side, Side::Buy);
        assert_eq!(book.bid_total_vol, Some(8));
        assert_eq!(book.ask_total_vol, Some(9));
    }

    #[test]
    fn normalize_tick_maps_sell_tick_type() {
        struct FakeTick;
        impl BrokerPayload for FakeTick {
            fn code(&self) -> &str {
                "TXFR1"
            }
            fn exchange(&self) -> &str {
                "TAIFEX"
            }
            fn ts_ns(&self) -> i64 {
                1
            }
            fn asset_type(&self) -> AssetType {
                AssetType::Futures
            }
            fn close(&self) -> Option<Decimal> {
                Some(dec!(17000))
            }
            fn volume(&self) -> Option<i64> {
                Some(1)
            }
            fn total_volume(&self) -> Option<i64> {
                None
            }
            fn total_amount(&self) -> Option<Decimal> {
                None
            }
            fn bid_price(&self) -> &[Decimal] {
                &[]
            }
            fn bid_volume(&self) -> &[i64] {
                &[]
            }
            fn ask_price(&self) -> &[Decimal] {
                &[]
            }
            fn ask_volume(&self) -> &[i64] {
                &[]
            }
            fn tick_type(&self) -> i32 {
                2
            }
            fn underlying_price(&self) -> Option<Decimal> {
                None
            }
            fn simtrade(&self) -> bool {
                true
            }
        }

        let tick = normalize_tick(&FakeTick).unwrap();
        assert_eq!(tick.side, Side::Sell);
        assert_eq!(
            tick.extras.get("simtrade"),
            Some(&crate::extras::ExtraValue::Bool(true))
        );
    }
}

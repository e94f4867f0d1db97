//! Order Flow Imbalance, grounded on
//! `examples/original_source/shijim/features/ofi.py`'s `_calculate_python`
//! fallback path (this crate *is* the "Rust backend" that path exists to
//! wrap).

use crate::error::FeatureError;

#[derive(Debug, Clone, Copy, PartialEq)]
struct TopOfBook {
    bid: Option<(f64, f64)>,
    ask: Option<(f64, f64)>,
}

/// Per-symbol OFI calculator over consecutive top-of-book snapshots.
#[derive(Debug, Clone, Default)]
pub struct OfiCalculator {
    prev: Option<TopOfBook>,
}

impl OfiCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute OFI from the given level arrays relative to the last call.
    /// The first call for a symbol only seeds state and returns `None`.
    /// Mismatched price/volume array lengths are always an error, even on
    /// the seeding call.
    pub fn update_from_levels(
        &mut self,
        bid_prices: &[f64],
        bid_volumes: &[f64],
        ask_prices: &[f64],
        ask_volumes: &[f64],
    ) -> Result<Option<f64>, FeatureError> {
        if bid_prices.len() != bid_volumes.len() {
            return Err(FeatureError::BidLengthMismatch { prices: bid_prices.len(), volumes: bid_volumes.len() });
        }
        if ask_prices.len() != ask_volumes.len() {
            return Err(FeatureError::AskLengthMismatch { prices: ask_prices.len(), volumes: ask_volumes.len() });
        }

        let current = TopOfBook { bid: bid_prices.first().copied().zip(bid_volumes.first().copied()), ask: ask_prices.first().copied().zip(ask_volumes.first().copied()) };

        let prev = self.prev.replace(current);
        let Some(prev) = prev else {
            return Ok(None);
        };

        let (Some((b, q_b)), Some((a, q_a))) = (current.bid, current.ask) else {
            return Ok(Some(0.0));
        };
        let (Some((b_prev, q_b_prev)), Some((a_prev, q_a_prev))) = (prev.bid, prev.ask) else {
            return Ok(Some(0.0));
        };

        let bid_contrib = if b >= b_prev { q_b } else { 0.0 } - if b <= b_prev { q_b_prev } else { 0.0 };
        let ask_contrib = -(if a <= a_prev { q_a } else { 0.0 }) + if a >= a_prev { q_a_prev } else { 0.0 };

        Ok(Some(bid_contrib + ask_contrib))
    }
}

/// Accumulates OFI over a fixed time window, grounded on `ofi.py`'s
/// `OFIAccumulator`. The first event seeds the window's start time rather
/// than waiting for a clean boundary, so the first emitted window may
/// cover less than `interval_ns` — intentional, not a bug.
#[derive(Debug, Clone)]
pub struct OfiWindowAccumulator {
    interval_ns: i64,
    calculator: OfiCalculator,
    accumulated: f64,
    last_emit_ns: Option<i64>,
}

impl OfiWindowAccumulator {
    pub fn new(interval_ns: i64) -> Self {
        Self { interval_ns, calculator: OfiCalculator::new(), accumulated: 0.0, last_emit_ns: None }
    }

    pub fn process(
        &mut self,
        ts_ns: i64,
        bid_prices: &[f64],
        bid_volumes: &[f64],
        ask_prices: &[f64],
        ask_volumes: &[f64],
    ) -> Result<Option<f64>, FeatureError> {
        if self.last_emit_ns.is_none() {
            self.last_emit_ns = Some(ts_ns);
        }

        let Some(ofi) = self.calculator.update_from_levels(bid_prices, bid_volumes, ask_prices, ask_volumes)? else {
            return Ok(None);
        };
        self.accumulated += ofi;

        let last_emit = self.last_emit_ns.expect("set above");
        if ts_ns - last_emit >= self.interval_ns {
            let result = self.accumulated;
            self.accumulated = 0.0;
            self.last_emit_ns = Some(ts_ns);
            Ok(Some(result))
        } else {
            Ok(None)
        }
    }
}

//! Volume-Synchronized Probability of Informed Trading, grounded on
//! `examples/original_source/shijim/features/vpin.py` (again, wrapping
//! "the Rust backend" this crate provides) plus
//! `examples/original_source/tests/features/test_rust_vpin.py`, which is
//! the authoritative source for the fixed-volume-bucket/rolling-window
//! behavior the prose description only sketches.

use crate::error::FeatureError;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
struct CompletedBucket {
    buy: f64,
    sell: f64,
}

impl CompletedBucket {
    fn imbalance(&self) -> f64 {
        (self.buy - self.sell).abs()
    }

    fn volume(&self) -> f64 {
        self.buy + self.sell
    }
}

/// Per-symbol VPIN calculator over fixed-volume buckets.
///
/// A trade that straddles a bucket boundary is split: the portion needed
/// to fill the current bucket closes it, and the remainder seeds the
/// next bucket with the same sign, so every completed bucket holds
/// exactly `bucket_volume`.
#[derive(Debug, Clone)]
pub struct VpinCalculator {
    bucket_volume: f64,
    window_size: usize,
    buy: f64,
    sell: f64,
    window: VecDeque<CompletedBucket>,
    current_vpin: Option<f64>,
}

impl VpinCalculator {
    pub fn new(bucket_volume: f64, window_size: usize) -> Self {
        Self { bucket_volume, window_size, buy: 0.0, sell: 0.0, window: VecDeque::new(), current_vpin: None }
    }

    pub fn reset(&mut self) {
        self.buy = 0.0;
        self.sell = 0.0;
        self.window.clear();
        self.current_vpin = None;
    }

    /// Feed one trade's signed volume (positive buy, negative sell).
    /// Returns the current rolling VPIN estimate, recomputed whenever a
    /// bucket closes; `None` until the window has filled for the first
    /// time.
    pub fn update_signed_volume(&mut self, signed_volume: f64) -> Result<Option<f64>, FeatureError> {
        if !signed_volume.is_finite() {
            return Err(FeatureError::NonFiniteVolume(signed_volume));
        }

        let sign = if signed_volume >= 0.0 { 1.0 } else { -1.0 };
        let mut remaining = signed_volume.abs();

        while remaining > 0.0 {
            let filled = self.buy + self.sell;
            let capacity_left = self.bucket_volume - filled;
            let take = remaining.min(capacity_left);

            if sign > 0.0 {
                self.buy += take;
            } else {
                self.sell += take;
            }
            remaining -= take;

            if self.bucket_volume - (self.buy + self.sell) <= 1e-9 {
                self.window.push_back(CompletedBucket { buy: self.buy, sell: self.sell });
                while self.window.len() > self.window_size {
                    self.window.pop_front();
                }
                self.buy = 0.0;
                self.sell = 0.0;

                if self.window.len() >= self.window_size {
                    let total_imbalance: f64 = self.window.iter().map(CompletedBucket::imbalance).sum();
                    let total_volume: f64 = self.window.iter().map(CompletedBucket::volume).sum();
                    self.current_vpin = Some(total_imbalance / total_volume);
                }
            }
        }

        Ok(self.current_vpin)
    }

    /// Feed a batch of signed volumes, returning the per-trade results
    /// `update_signed_volume` would have produced sequentially.
    pub fn update_signed_series(&mut self, signed_volumes: &[f64]) -> Result<Vec<Option<f64>>, FeatureError> {
        signed_volumes.iter().map(|&v| self.update_signed_volume(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_rollover_matches_fixture() {
        let mut calc = VpinCalculator::new(50.0, 2);
        let volumes = [20.0, 30.0, -40.0, -20.0, 40.0, 10.0];
        let results = calc.update_signed_series(&volumes).unwrap();
        assert_eq!(results[0], None);
        assert_eq!(results[1], None);
        assert_eq!(results[2], None);
        assert!((results[3].unwrap() - 1.0).abs() < 1e-9);
        assert!((results[4].unwrap() - 0.8).abs() < 1e-9);
        assert!((results[5].unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn window_must_fill_before_first_emission() {
        let mut calc = VpinCalculator::new(100.0, 3);
        assert_eq!(calc.update_signed_volume(100.0).unwrap(), None);
        assert_eq!(calc.update_signed_volume(-100.0).unwrap(), None);
        let result = calc.update_signed_volume(100.0).unwrap();
        assert!((result.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_window_and_cached_value() {
        let mut calc = VpinCalculator::new(100.0, 3);
        calc.update_signed_volume(100.0).unwrap();
        calc.update_signed_volume(-100.0).unwrap();
        calc.update_signed_volume(100.0).unwrap();
        assert!(calc.update_signed_volume(1.0).unwrap().is_some());

        calc.reset();
        assert_eq!(calc.update_signed_volume(50.0).unwrap(), None);
        assert_eq!(calc.update_signed_volume(-50.0).unwrap(), None);
    }

    #[test]
    fn rejects_non_finite_volume() {
        let mut calc = VpinCalculator::new(100.0, 3);
        let err = calc.update_signed_volume(f64::NAN).unwrap_err();
        assert!(matches!(err, FeatureError::NonFiniteVolume(_)));
    }
}

//! Individual pre-trade guards, grounded on
//! `examples/original_source/shijim/risk/guards.py`.

use rust_decimal::Decimal;
use shijim_core::order::{OrderRequest, OrderRequestAction, OrderSide};
use std::time::{Duration, Instant};

/// The outcome of a single guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskResult {
    pub passed: bool,
    pub reason: Option<&'static str>,
}

impl RiskResult {
    pub fn pass() -> Self {
        Self { passed: true, reason: None }
    }

    pub fn reject(reason: &'static str) -> Self {
        Self { passed: false, reason: Some(reason) }
    }
}

/// Shared guard tuning (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskManagerConfig {
    pub max_order_qty: Decimal,
    pub max_position: Decimal,
    pub price_deviation: Decimal,
    pub max_orders_per_sec: u32,
}

/// Binary cutoff: when active, every non-`CANCEL` request is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct KillSwitch {
    active: bool,
}

impl KillSwitch {
    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn check(&self, order: &OrderRequest) -> RiskResult {
        if !self.active || order.action == OrderRequestAction::Cancel {
            RiskResult::pass()
        } else {
            RiskResult::reject("KillSwitch")
        }
    }
}

/// Rejects orders priced too far from a reference price, or oversized.
#[derive(Debug, Clone, Copy)]
pub struct FatFingerGuard {
    config: RiskManagerConfig,
    ref_price: Decimal,
}

impl FatFingerGuard {
    pub fn new(config: RiskManagerConfig, ref_price: Decimal) -> Self {
        Self { config, ref_price }
    }

    pub fn set_reference_price(&mut self, price: Decimal) {
        self.ref_price = price;
    }

    pub fn check(&self, order: &OrderRequest) -> RiskResult {
        if order.action == OrderRequestAction::Cancel {
            return RiskResult::pass();
        }
        let Some(price) = order.price else {
            return RiskResult::pass();
        };
        let deviation = (price - self.ref_price).abs() / self.ref_price;
        if deviation > self.config.price_deviation {
            return RiskResult::reject("PriceDeviation");
        }
        if order.quantity > self.config.max_order_qty {
            return RiskResult::reject("MaxOrderQty");
        }
        RiskResult::pass()
    }
}

/// Rejects orders that would push the net position outside
/// `[-max_position, +max_position]`.
#[derive(Debug, Clone, Copy)]
pub struct PositionGuard {
    config: RiskManagerConfig,
    position: Decimal,
}

impl PositionGuard {
    pub fn new(config: RiskManagerConfig, position: Decimal) -> Self {
        Self { config, position }
    }

    pub fn update_position(&mut self, filled_qty: Decimal, side: OrderSide) {
        self.position += if side == OrderSide::Buy { filled_qty } else { -filled_qty };
    }

    pub fn position(&self) -> Decimal {
        self.position
    }

    pub fn check(&self, order: &OrderRequest) -> RiskResult {
        if order.action == OrderRequestAction::Cancel {
            return RiskResult::pass();
        }
        let signed_qty = if order.side == OrderSide::Sell { -order.quantity } else { order.quantity };
        let next_position = self.position + signed_qty;
        if next_position.abs() > self.config.max_position {
            return RiskResult::reject("PositionLimit");
        }
        RiskResult::pass()
    }
}

/// Token-bucket rate limiter; each check costs one token.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    rate: f64,
    burst: u32,
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: u32) -> Self {
        Self { rate, burst, tokens: burst as f64, last_refill: Instant::now() }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed > Duration::ZERO {
            let new_tokens = elapsed.as_secs_f64() * self.rate;
            self.tokens = (self.tokens + new_tokens).min(self.burst as f64);
            self.last_refill = now;
        }
    }

    pub fn check(&mut self) -> RiskResult {
        self.refill();
        if self.tokens < 1.0 {
            return RiskResult::reject("RateLimit");
        }
        self.tokens -= 1.0;
        RiskResult::pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> RiskManagerConfig {
        RiskManagerConfig {
            max_order_qty: dec!(100),
            max_position: dec!(10),
            price_deviation: dec!(0.05),
            max_orders_per_sec: 5,
        }
    }

    fn order(action: OrderRequestAction, price: Option<Decimal>, quantity: Decimal, side: OrderSide) -> OrderRequest {
        OrderRequest::new(action, price, quantity, "test", "2330", side, "id-1")
    }

    #[test]
    fn kill_switch_blocks_everything_but_cancel() {
        let mut ks = KillSwitch::default();
        ks.activate();
        let cancel = order(OrderRequestAction::Cancel, None, dec!(1), OrderSide::Buy);
        let replace = order(OrderRequestAction::CancelReplace, Some(dec!(100)), dec!(1), OrderSide::Buy);
        assert_eq!(ks.check(&cancel), RiskResult::pass());
        assert_eq!(ks.check(&replace), RiskResult::reject("KillSwitch"));
    }

    #[test]
    fn fat_finger_rejects_large_price_deviation() {
        let guard = FatFingerGuard::new(config(), dec!(100));
        let req = order(OrderRequestAction::CancelReplace, Some(dec!(110)), dec!(1), OrderSide::Buy);
        assert_eq!(guard.check(&req), RiskResult::reject("PriceDeviation"));
    }

    #[test]
    fn fat_finger_rejects_oversized_quantity() {
        let guard = FatFingerGuard::new(config(), dec!(100));
        let req = order(OrderRequestAction::CancelReplace, Some(dec!(101)), dec!(150), OrderSide::Buy);
        assert_eq!(guard.check(&req), RiskResult::reject("MaxOrderQty"));
    }

    #[test]
    fn fat_finger_passes_cancel_and_priceless_orders() {
        let guard = FatFingerGuard::new(config(), dec!(100));
        let cancel = order(OrderRequestAction::Cancel, None, dec!(9999), OrderSide::Buy);
        assert_eq!(guard.check(&cancel), RiskResult::pass());
    }

    #[test]
    fn spec_scenario_position_limit_rejection() {
        let guard = PositionGuard::new(config(), dec!(8));
        let req = order(OrderRequestAction::CancelReplace, Some(dec!(101)), dec!(3), OrderSide::Buy);
        assert_eq!(guard.check(&req), RiskResult::reject("PositionLimit"));
    }

    #[test]
    fn position_guard_allows_within_limit() {
        let guard = PositionGuard::new(config(), dec!(8));
        let req = order(OrderRequestAction::CancelReplace, Some(dec!(101)), dec!(2), OrderSide::Buy);
        assert_eq!(guard.check(&req), RiskResult::pass());
    }

    #[test]
    fn rate_limiter_exhausts_burst_then_recovers() {
        let mut limiter = RateLimiter::new(1_000.0, 2);
        assert_eq!(limiter.check(), RiskResult::pass());
        assert_eq!(limiter.check(), RiskResult::pass());
        assert_eq!(limiter.check(), RiskResult::reject("RateLimit"));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(limiter.check(), RiskResult::pass());
    }
}

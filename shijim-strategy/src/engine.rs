//! Grounded on `examples/original_source/shijim/strategy/engine.py`'s
//! `SmartChasingEngine`/`OrderStateManager`: same state machine, same
//! decision order, same emitted reasons.

use rust_decimal::Decimal;
use shijim_core::order::{OrderRequest, OrderRequestAction, OrderSide};

/// Per-order lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Idle,
    Working,
    Chasing,
    Filled,
}

/// Chase-sensitivity tuning (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyConfig {
    pub chase_threshold: Decimal,
    pub max_chase_round: u32,
}

/// Tracks one order's state and how many times it has been chased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderStateManager {
    pub state: OrderState,
    pub chase_count: u32,
}

impl Default for OrderStateManager {
    fn default() -> Self {
        Self { state: OrderState::Idle, chase_count: 0 }
    }
}

impl OrderStateManager {
    pub fn transition(&mut self, new_state: OrderState) {
        self.state = new_state;
    }
}

/// Per-order decision engine. One instance tracks exactly one working
/// order: its current price, quantity, side, and chase history.
#[derive(Debug, Clone)]
pub struct SmartChasingEngine {
    config: StrategyConfig,
    symbol: String,
    side: OrderSide,
    order_price: Decimal,
    order_qty: Decimal,
    internal_id: String,
    order_manager: OrderStateManager,
}

impl SmartChasingEngine {
    pub fn new(
        config: StrategyConfig,
        symbol: impl Into<String>,
        side: OrderSide,
        order_price: Decimal,
        order_qty: Decimal,
        internal_id: impl Into<String>,
    ) -> Self {
        let mut order_manager = OrderStateManager::default();
        if order_manager.state == OrderState::Idle {
            order_manager.state = OrderState::Working;
        }
        Self {
            config,
            symbol: symbol.into(),
            side,
            order_price,
            order_qty,
            internal_id: internal_id.into(),
            order_manager,
        }
    }

    pub fn state(&self) -> OrderState {
        self.order_manager.state
    }

    pub fn chase_count(&self) -> u32 {
        self.order_manager.chase_count
    }

    pub fn order_price(&self) -> Decimal {
        self.order_price
    }

    /// Evaluate one tick: the current best bid and an OFI reading.
    /// Returns zero or one `OrderRequest`, per spec §4.8's decision order.
    pub fn on_tick(&mut self, market_bid: Decimal, ofi: f64) -> Vec<OrderRequest> {
        if matches!(self.order_manager.state, OrderState::Chasing | OrderState::Idle) {
            return Vec::new();
        }

        let price_diff = market_bid - self.order_price;

        if self.order_manager.chase_count >= self.config.max_chase_round && price_diff > Decimal::ZERO {
            self.order_manager.transition(OrderState::Idle);
            let req = OrderRequest::new(
                OrderRequestAction::Cancel,
                None,
                self.order_qty,
                "MaxChaseReached",
                self.symbol.clone(),
                self.side,
                self.internal_id.clone(),
            );
            return vec![req];
        }

        if price_diff <= Decimal::ZERO {
            return Vec::new();
        }

        let should_chase = price_diff > self.config.chase_threshold;
        let alpha_push = price_diff >= self.config.chase_threshold && ofi > 0.0;

        if !should_chase && !alpha_push {
            return Vec::new();
        }

        if ofi < 0.0 && should_chase {
            tracing::debug!(symbol = %self.symbol, "hold: negative-alpha protection");
            return Vec::new();
        }

        let reason = if alpha_push && ofi > 0.0 { "AlphaDriven" } else { "PriceDrift" };
        self.order_price = market_bid;
        self.order_manager.chase_count += 1;
        self.order_manager.transition(OrderState::Chasing);

        let req = OrderRequest::new(
            OrderRequestAction::CancelReplace,
            Some(market_bid),
            self.order_qty,
            reason,
            self.symbol.clone(),
            self.side,
            self.internal_id.clone(),
        );
        vec![req]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn engine(chase_threshold: Decimal, max_chase_round: u32, order_price: Decimal) -> SmartChasingEngine {
        SmartChasingEngine::new(
            StrategyConfig { chase_threshold, max_chase_round },
            "2330",
            OrderSide::Buy,
            order_price,
            dec!(10),
            "strategy-1",
        )
    }

    #[test]
    fn spec_scenario_chases_on_price_drift() {
        let mut e = engine(dec!(2), 3, dec!(100));
        let reqs = e.on_tick(dec!(103), 0.0);
        assert_eq!(reqs.len(), 1);
        let req = &reqs[0];
        assert_eq!(req.action, OrderRequestAction::CancelReplace);
        assert_eq!(req.price, Some(dec!(103)));
        assert_eq!(req.reason, "PriceDrift");
        assert_eq!(e.chase_count(), 1);
        assert_eq!(e.state(), OrderState::Chasing);
    }

    #[test]
    fn idle_and_chasing_states_emit_nothing() {
        let mut e = engine(dec!(2), 3, dec!(100));
        e.on_tick(dec!(103), 0.0); // transitions to Chasing
        assert!(e.on_tick(dec!(110), 0.0).is_empty());
    }

    #[test]
    fn non_positive_price_diff_emits_nothing() {
        let mut e = engine(dec!(2), 3, dec!(100));
        assert!(e.on_tick(dec!(100), 1.0).is_empty());
        assert!(e.on_tick(dec!(99), 1.0).is_empty());
    }

    #[test]
    fn max_chase_round_reached_cancels_and_goes_idle() {
        let mut e = engine(dec!(2), 0, dec!(100));
        let reqs = e.on_tick(dec!(103), 0.0);
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].action, OrderRequestAction::Cancel);
        assert_eq!(reqs[0].reason, "MaxChaseReached");
        assert_eq!(reqs[0].price, None);
        assert_eq!(e.state(), OrderState::Idle);
    }

    #[test]
    fn negative_ofi_holds_when_should_chase() {
        let mut e = engine(dec!(2), 3, dec!(100));
        // price_diff=3 > threshold=2 -> should_chase; ofi<0 -> hold.
        assert!(e.on_tick(dec!(103), -1.0).is_empty());
        assert_eq!(e.state(), OrderState::Working);
        assert_eq!(e.chase_count(), 0);
    }

    #[test]
    fn alpha_push_at_exact_threshold_emits_alpha_driven() {
        let mut e = engine(dec!(2), 3, dec!(100));
        // price_diff == threshold (2), ofi>0 -> alpha_push true, should_chase false.
        let reqs = e.on_tick(dec!(102), 1.0);
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].reason, "AlphaDriven");
    }

    #[test]
    fn below_threshold_with_no_alpha_emits_nothing() {
        let mut e = engine(dec!(2), 3, dec!(100));
        // price_diff=1 < threshold=2, ofi=0 -> neither should_chase nor alpha_push.
        assert!(e.on_tick(dec!(101), 0.0).is_empty());
    }
}

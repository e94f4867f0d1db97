//! Risk-aware gateway, grounded on
//! `examples/original_source/shijim/risk/manager.py`'s `RiskManager`:
//! runs every incoming order through the guard chain in a fixed order
//! and only forwards survivors to the execution adapter.

use crate::guards::{FatFingerGuard, KillSwitch, PositionGuard, RateLimiter, RiskResult};
use shijim_core::order::{OrderRequest, OrderSide};

/// Sink the gateway forwards accepted orders to. Implemented once per
/// execution backend.
pub trait OrderSink: Send + Sync {
    fn send(&self, order: &OrderRequest);
}

/// A rejected order paired with the guard that rejected it.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOrder {
    pub order: OrderRequest,
    pub reason: &'static str,
}

/// Evaluates every order against the guard chain — kill switch, fat
/// finger, position, rate limit, in that order — and forwards only
/// accepted orders to the inner `OrderSink`. Rejections are recorded
/// rather than silently dropped.
pub struct RiskAwareGateway<'a> {
    inner: &'a dyn OrderSink,
    kill_switch: KillSwitch,
    fat_finger: FatFingerGuard,
    position: PositionGuard,
    rate_limiter: RateLimiter,
    rejections: Vec<RejectedOrder>,
}

impl<'a> std::fmt::Debug for RiskAwareGateway<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskAwareGateway")
            .field("kill_switch_active", &self.kill_switch.is_active())
            .field("position", &self.position.position())
            .field("rejections", &self.rejections.len())
            .finish()
    }
}

impl<'a> RiskAwareGateway<'a> {
    pub fn new(
        inner: &'a dyn OrderSink,
        fat_finger: FatFingerGuard,
        position: PositionGuard,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            inner,
            kill_switch: KillSwitch::default(),
            fat_finger,
            position,
            rate_limiter,
            rejections: Vec::new(),
        }
    }

    pub fn activate_kill_switch(&mut self) {
        self.kill_switch.activate();
    }

    pub fn deactivate_kill_switch(&mut self) {
        self.kill_switch.deactivate();
    }

    pub fn rejections(&self) -> &[RejectedOrder] {
        &self.rejections
    }

    pub fn record_fill(&mut self, filled_qty: rust_decimal::Decimal, side: OrderSide) {
        self.position.update_position(filled_qty, side);
    }

    /// Evaluate one order. Returns `true` if it was forwarded to the
    /// inner sink, `false` if a guard rejected it.
    pub fn send(&mut self, order: OrderRequest) -> bool {
        let checks: [RiskResult; 4] = [
            self.kill_switch.check(&order),
            self.fat_finger.check(&order),
            self.position.check(&order),
            self.rate_limiter.check(),
        ];

        if let Some(failed) = checks.into_iter().find(|r| !r.passed) {
            let reason = failed.reason.unwrap_or("Rejected");
            tracing::warn!(symbol = %order.symbol, %reason, "order rejected by risk gate");
            self.rejections.push(RejectedOrder { order, reason });
            return false;
        }

        self.inner.send(&order);
        true
    }
}

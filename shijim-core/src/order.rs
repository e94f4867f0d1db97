//! Order intent flowing strategy → risk → execution (spec §3 "Order
//! intent").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of an order. Distinct from [`crate::event::Side`] (which
/// also carries a `None` variant for unknown trade aggressor side) since
/// an order always has a definite direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// What an [`OrderRequest`] asks the broker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRequestAction {
    Cancel,
    CancelReplace,
}

/// A single order intent emitted by a strategy, evaluated by the risk
/// gate, and resolved to a broker call by the execution adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub action: OrderRequestAction,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub reason: String,
    pub symbol: String,
    pub side: OrderSide,
    pub internal_id: String,
    pub broker_order_id: Option<String>,
}

impl OrderRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        action: OrderRequestAction,
        price: Option<Decimal>,
        quantity: Decimal,
        reason: impl Into<String>,
        symbol: impl Into<String>,
        side: OrderSide,
        internal_id: impl Into<String>,
    ) -> Self {
        Self {
            action,
            price,
            quantity,
            reason: reason.into(),
            symbol: symbol.into(),
            side,
            internal_id: internal_id.into(),
            broker_order_id: None,
        }
    }

    pub fn with_broker_order_id(mut self, broker_order_id: impl Into<String>) -> Self {
        self.broker_order_id = Some(broker_order_id.into());
        self
    }
}

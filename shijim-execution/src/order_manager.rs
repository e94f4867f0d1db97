//! Non-blocking order manager, grounded on
//! `examples/original_source/shijim/execution/order_manager.py`'s
//! `NonBlockingOrderManager`: fire-and-forget submit, bidirectional
//! internal/broker id mapping, callback-driven state reconciliation.

use crate::error::ExecutionError;
use fnv::FnvHashMap;
use rust_decimal::Decimal;
use shijim_core::order::{OrderRequest, OrderRequestAction};

/// Broker-side lifecycle of one order (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Submitted,
    Partial,
    Filled,
    Cancelled,
    Rejected,
}

/// Local view of one order's broker-side progress.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderState {
    pub internal_id: String,
    pub status: OrderStatus,
    pub broker_order_id: Option<String>,
    pub filled_qty: Decimal,
    pub avg_price: Decimal,
    pub last_error: Option<String>,
}

impl OrderState {
    fn new(internal_id: String) -> Self {
        Self {
            internal_id,
            status: OrderStatus::Pending,
            broker_order_id: None,
            filled_qty: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            last_error: None,
        }
    }
}

/// Resolves the broker-native order placement and cancellation calls.
/// `place_order` returns the broker-assigned id immediately when the
/// broker SDK hands one back synchronously, or `None` when it arrives
/// later via [`NonBlockingOrderManager::assign_broker_order_id`].
pub trait BrokerClient: Send + Sync {
    fn place_order(&self, req: &OrderRequest) -> Result<Option<String>, ExecutionError>;
    fn cancel_order(&self, broker_order_id: &str) -> Result<(), ExecutionError>;
}

/// Tracks every order's state via `internal_id`, submitting
/// non-blocking requests to a `BrokerClient` and reconciling state from
/// broker callbacks.
pub struct NonBlockingOrderManager<'a> {
    broker: &'a dyn BrokerClient,
    orders: FnvHashMap<String, OrderState>,
    broker_to_internal: FnvHashMap<String, String>,
}

impl<'a> std::fmt::Debug for NonBlockingOrderManager<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonBlockingOrderManager").field("orders", &self.orders.len()).finish()
    }
}

impl<'a> NonBlockingOrderManager<'a> {
    pub fn new(broker: &'a dyn BrokerClient) -> Self {
        Self { broker, orders: FnvHashMap::default(), broker_to_internal: FnvHashMap::default() }
    }

    pub fn order_state(&self, internal_id: &str) -> Option<&OrderState> {
        self.orders.get(internal_id)
    }

    /// Submit one order request non-blocking. `CANCEL` is routed to
    /// [`Self::cancel_order`]; everything else is placed.
    pub fn send_order(&mut self, req: OrderRequest) -> Result<(), ExecutionError> {
        if req.internal_id.is_empty() {
            tracing::warn!("order request missing internal_id");
            return Err(ExecutionError::MissingInternalId);
        }

        self.orders
            .entry(req.internal_id.clone())
            .or_insert_with(|| OrderState::new(req.internal_id.clone()));

        if req.action == OrderRequestAction::Cancel {
            self.cancel_order(&req)
        } else {
            self.place_order(req)
        }
    }

    fn place_order(&mut self, req: OrderRequest) -> Result<(), ExecutionError> {
        match self.broker.place_order(&req) {
            Ok(Some(broker_order_id)) => {
                tracing::info!(internal_id = %req.internal_id, %broker_order_id, "order submitted");
                self.broker_to_internal.insert(broker_order_id.clone(), req.internal_id.clone());
                let state = self.orders.get_mut(&req.internal_id).expect("inserted above");
                state.broker_order_id = Some(broker_order_id);
                state.status = OrderStatus::Submitted;
                Ok(())
            }
            Ok(None) => {
                tracing::debug!(internal_id = %req.internal_id, "order submitted, broker id pending");
                Ok(())
            }
            Err(err) => {
                tracing::error!(internal_id = %req.internal_id, %err, "failed to place order");
                let state = self.orders.get_mut(&req.internal_id).expect("inserted above");
                state.status = OrderStatus::Rejected;
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn cancel_order(&mut self, req: &OrderRequest) -> Result<(), ExecutionError> {
        let broker_order_id = self
            .orders
            .get(&req.internal_id)
            .and_then(|state| state.broker_order_id.clone());

        let Some(broker_order_id) = broker_order_id else {
            tracing::warn!(internal_id = %req.internal_id, "cannot cancel order: no broker_order_id known");
            return Ok(());
        };

        match self.broker.cancel_order(&broker_order_id) {
            Ok(()) => {
                tracing::info!(internal_id = %req.internal_id, %broker_order_id, "cancel sent");
                Ok(())
            }
            Err(err) => {
                tracing::error!(internal_id = %req.internal_id, %err, "failed to cancel order");
                Err(err)
            }
        }
    }

    /// Record a broker-assigned id that arrived asynchronously, after
    /// [`Self::place_order`] returned `Ok(None)`.
    pub fn assign_broker_order_id(&mut self, internal_id: &str, broker_order_id: &str) -> Result<(), ExecutionError> {
        let state = self
            .orders
            .get_mut(internal_id)
            .ok_or_else(|| ExecutionError::UnknownInternalId(internal_id.to_string()))?;
        state.broker_order_id = Some(broker_order_id.to_string());
        state.status = OrderStatus::Submitted;
        self.broker_to_internal.insert(broker_order_id.to_string(), internal_id.to_string());
        Ok(())
    }

    /// Reconcile order state from a broker callback, keyed by
    /// broker-assigned id.
    pub fn update_from_callback(
        &mut self,
        broker_order_id: &str,
        status: OrderStatus,
        filled_qty: Decimal,
        avg_price: Decimal,
    ) -> Result<(), ExecutionError> {
        let internal_id = self
            .broker_to_internal
            .get(broker_order_id)
            .ok_or_else(|| ExecutionError::UnknownBrokerOrderId(broker_order_id.to_string()))?
            .clone();
        let state = self
            .orders
            .get_mut(&internal_id)
            .ok_or_else(|| ExecutionError::UnknownInternalId(internal_id.clone()))?;
        state.status = status;
        state.filled_qty = filled_qty;
        state.avg_price = avg_price;
        tracing::debug!(internal_id = %internal_id, ?status, "order state updated");
        Ok(())
    }
}

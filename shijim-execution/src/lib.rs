#![forbid(unsafe_code)]
//! Non-blocking execution adapter (spec §4.10): resolves order
//! requests to broker calls, maintains the bidirectional
//! internal/broker id map, and reconciles order state from broker
//! callbacks.

pub mod error;
pub mod order_manager;

pub use error::ExecutionError;
pub use order_manager::{BrokerClient, NonBlockingOrderManager, OrderState, OrderStatus};

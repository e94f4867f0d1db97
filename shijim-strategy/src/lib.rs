#![forbid(unsafe_code)]
//! Smart-chasing strategy engine (spec §4.8): a per-order state machine
//! that decides whether a working order should be cancelled, chased, or
//! left alone, given the current top-of-book and an OFI reading.

pub mod engine;

pub use engine::{OrderState, OrderStateManager, SmartChasingEngine, StrategyConfig};
pub use shijim_core::order::{OrderRequest, OrderRequestAction, OrderSide};

//! Error type reserved for bus shutdown races. `publish`/`subscribe`
//! themselves never fail in steady state (spec §4.1: "never blocks the
//! publisher").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("event bus lock was poisoned by a panicking thread")]
    LockPoisoned,
}

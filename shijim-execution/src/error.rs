use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("order request missing internal_id")]
    MissingInternalId,
    #[error("no broker mapping for internal_id {0}")]
    UnknownInternalId(String),
    #[error("no broker mapping for broker_order_id {0}")]
    UnknownBrokerOrderId(String),
    #[error("contract resolution failed for symbol {symbol}: {reason}")]
    ContractResolution { symbol: String, reason: String },
    #[error("broker rejected order {internal_id}: {reason}")]
    BrokerRejected { internal_id: String, reason: String },
}

use thiserror::Error;
use crate::types::ids::{AccountKeyId, ExchangeOrderId, PositionId};
use crate::types::position::PositionSide;
use crate::types::symbol::Symbol;

#[derive(Error, Debug)]
pub enum Error {
    // Boundary errors: the fill never enters the engine
    #[error("Malformed order: {reason}")]
    MalformedOrder { reason: String },

    // Store errors: the order stays unmapped and is retried by recovery
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Position not found: {0}")]
    PositionNotFound(PositionId),

    #[error("Duplicate open position for {symbol} on account key {account_key_id}")]
    DuplicateOpenPosition {
        account_key_id: AccountKeyId,
        symbol: Symbol,
    },

    // A close fill arrived before its open fill; retried by the sweep
    #[error("No open position for {symbol} (side {side:?}) on account key {account_key_id}")]
    NoOpenPosition {
        account_key_id: AccountKeyId,
        symbol: Symbol,
        side: Option<PositionSide>,
    },

    // One-way invariant: a flip's open fragment found a second open position
    #[error(
        "One-way invariant violated for {symbol} on account key {account_key_id}: \
         flip of order {exchange_order_id} collides with an existing open position"
    )]
    OneWayInvariantViolated {
        account_key_id: AccountKeyId,
        symbol: Symbol,
        exchange_order_id: ExchangeOrderId,
    },

    // Event publishing
    #[error("Publish error: {0}")]
    PublishError(String),

    #[error("Journal error: {0}")]
    JournalError(String),

    // System errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors that leave the order unmapped for a later sweep, as opposed to
    /// integration errors that should surface immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::StoreError(_)
                | Error::PositionNotFound(_)
                | Error::DuplicateOpenPosition { .. }
                | Error::NoOpenPosition { .. }
                | Error::OneWayInvariantViolated { .. }
        )
    }
}

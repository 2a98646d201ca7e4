use tracing::Span;
use crate::types::ids::{AccountKeyId, ExchangeOrderId};
use crate::types::symbol::Symbol;

pub fn trace_order_processing(order_id: &ExchangeOrderId, symbol: &Symbol) -> Span {
    tracing::info_span!(
        "order_processing",
        order_id = %order_id,
        symbol = %symbol,
    )
}

pub fn trace_reconstruction(account_key_id: &AccountKeyId) -> Span {
    tracing::info_span!(
        "full_reconstruction",
        account_key_id = %account_key_id,
    )
}

pub fn trace_recovery_sweep() -> Span {
    tracing::info_span!("recovery_sweep")
}

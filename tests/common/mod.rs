use std::sync::Arc;

use PositionRecon::recon::engine::PositionReconstructionEngine;
use PositionRecon::store::memory::{
    in_memory_stack, InMemoryReconStore, RecordingJournalStore, RecordingPublisher,
};
use PositionRecon::types::balance::Balance;
use PositionRecon::types::ids::{AccountKeyId, ExchangeOrderId, OrderRecordId, UserId};
use PositionRecon::types::order::{OrderFill, PositionEffect, PositionIdx, Side};
use PositionRecon::types::price::Price;
use PositionRecon::types::quantity::Quantity;
use PositionRecon::types::ratio::Ratio;
use PositionRecon::types::symbol::Symbol;
use PositionRecon::types::timestamp::Timestamp;

pub struct Stack {
    pub store: Arc<InMemoryReconStore>,
    pub publisher: Arc<RecordingPublisher>,
    pub journal: Arc<RecordingJournalStore>,
    pub engine: Arc<PositionReconstructionEngine>,
}

pub fn stack() -> Stack {
    let (store, publisher, journal) = in_memory_stack();
    let engine = Arc::new(PositionReconstructionEngine::new(
        store.clone(),
        publisher.clone(),
        journal.clone(),
    ));
    Stack {
        store,
        publisher,
        journal,
        engine,
    }
}

pub struct FillBuilder {
    account_key_id: AccountKeyId,
    user_id: UserId,
    symbol: Symbol,
}

impl FillBuilder {
    pub fn new(account_key_id: AccountKeyId, user_id: UserId, symbol: &str) -> Self {
        FillBuilder {
            account_key_id,
            user_id,
            symbol: Symbol::new(symbol),
        }
    }

    pub fn fill(
        &self,
        order_id: &str,
        side: Side,
        effect: PositionEffect,
        idx: PositionIdx,
        qty: f64,
        price: f64,
        at_millis: u64,
    ) -> OrderFill {
        OrderFill {
            record_id: OrderRecordId::new(),
            exchange_order_id: ExchangeOrderId::new(order_id),
            account_key_id: self.account_key_id,
            user_id: self.user_id,
            symbol: self.symbol.clone(),
            side,
            position_effect: effect,
            position_idx: idx,
            filled_quantity: Quantity::from_f64(qty),
            filled_price: Price::from_f64(price),
            cum_exec_fee: Balance::from_f64(0.1),
            realized_pnl: (effect == PositionEffect::Close).then(|| Balance::from_f64(1.0)),
            leverage: Ratio::from_f64(10.0),
            fill_time: Some(Timestamp::from_millis(at_millis)),
            position_id: None,
            split_from: None,
        }
    }
}

use serde::{Deserialize, Serialize};
use crate::events::base::{BaseEvent, EventType};
use crate::types::balance::Balance;
use crate::types::ids::{PositionId, UserId};
use crate::types::position::{Position, PositionSide};
use crate::types::price::Price;
use crate::types::ratio::Ratio;
use crate::types::symbol::Symbol;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PositionEvent {
    Opened(PositionOpened),
    Closed(PositionClosed),
}

impl PositionEvent {
    pub fn position_id(&self) -> PositionId {
        match self {
            PositionEvent::Opened(e) => e.position_id,
            PositionEvent::Closed(e) => e.position_id,
        }
    }

    pub fn base(&self) -> &BaseEvent {
        match self {
            PositionEvent::Opened(e) => &e.base,
            PositionEvent::Closed(e) => &e.base,
        }
    }

    /// Stamps the transport-assigned sequence into the envelope.
    pub fn set_sequence(&mut self, sequence: u64) {
        match self {
            PositionEvent::Opened(e) => e.base.set_sequence(sequence),
            PositionEvent::Closed(e) => e.base.set_sequence(sequence),
        }
    }
}

/// Emitted once per newly created position, after the transition committed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionOpened {
    pub base: BaseEvent,
    pub position_id: PositionId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: PositionSide,
    pub avg_entry_price: Price,
    pub leverage: Ratio,
}

impl PositionOpened {
    pub fn from_position(position: &Position) -> Self {
        PositionOpened {
            base: BaseEvent::new(EventType::PositionOpened),
            position_id: position.position_id,
            user_id: position.user_id,
            symbol: position.symbol.clone(),
            side: position.side,
            avg_entry_price: position.avg_entry_price,
            leverage: position.leverage,
        }
    }
}

/// Emitted once per fully closed and mapped position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionClosed {
    pub base: BaseEvent,
    pub position_id: PositionId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: PositionSide,
    pub realized_pnl: Balance,
}

impl PositionClosed {
    pub fn from_position(position: &Position) -> Self {
        PositionClosed {
            base: BaseEvent::new(EventType::PositionClosed),
            position_id: position.position_id,
            user_id: position.user_id,
            symbol: position.symbol.clone(),
            side: position.side,
            realized_pnl: position.realized_pnl,
        }
    }
}

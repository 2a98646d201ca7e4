use serde::{Deserialize, Serialize};
use crate::types::balance::Balance;
use crate::types::ids::{AccountKeyId, PositionId, UserId};
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::ratio::Ratio;
use crate::types::symbol::Symbol;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn opposite(&self) -> PositionSide {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionMode {
    OneWay,
    Hedge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PositionStatus {
    /// Remaining open quantity is non-zero.
    Open,
    /// Fully filled; order mapping not yet resolved.
    Closing,
    /// Closed with all contributing orders mapped, fees and PnL final.
    ClosedMapped,
    /// Closed quantity detected but contributing orders not yet found.
    ClosedUnmapped,
}

impl PositionStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, PositionStatus::ClosedMapped | PositionStatus::ClosedUnmapped)
    }
}

/// A logical trading position reconstructed from order fills.
///
/// At most one Open position exists per (account key, symbol, side) in hedge
/// mode, and per (account key, symbol) in one-way mode. Once fully closed and
/// mapped the record is immutable; later corrections re-run the mapping
/// instead of editing history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub position_id: PositionId,
    pub account_key_id: AccountKeyId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: PositionSide,
    pub mode: PositionMode,
    pub current_size: Quantity,
    pub closed_size: Quantity,
    pub avg_entry_price: Price,
    pub avg_exit_price: Price,
    pub realized_pnl: Balance,
    pub open_fee: Balance,
    pub closed_fee: Balance,
    pub leverage: Ratio,
    pub entry_time: Timestamp,
    pub exit_time: Option<Timestamp>,
    pub status: PositionStatus,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// current_size >= 0, and current_size == 0 iff the position left the
    /// Open state (Closing counts: it is fully filled, mapping pending).
    pub fn size_status_consistent(&self) -> bool {
        let fully_filled = self.status.is_closed() || self.status == PositionStatus::Closing;
        self.current_size >= Quantity::zero() && (self.current_size.is_zero() == fully_filled)
    }
}

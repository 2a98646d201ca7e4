use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::types::balance::Balance;
use crate::types::ids::{AccountKeyId, ExchangeOrderId, OrderRecordId, PositionId, UserId};
use crate::types::position::PositionSide;
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::ratio::Ratio;
use crate::types::symbol::Symbol;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Entry direction implied by this side: a Buy entry opens a long,
    /// a Sell entry opens a short.
    pub fn entry_side(&self) -> PositionSide {
        match self {
            Side::Buy => PositionSide::Long,
            Side::Sell => PositionSide::Short,
        }
    }
}

/// Whether a fill opens (grows) or closes (shrinks) a position. The engine
/// may correct this on a flip, where one fill does both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionEffect {
    Open,
    Close,
}

/// Exchange position-mode slot. Raw wire values: 0 = one-way, 1 = hedge long,
/// 2 = hedge short.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionIdx {
    OneWay,
    HedgeLong,
    HedgeShort,
}

impl PositionIdx {
    pub fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(PositionIdx::OneWay),
            1 => Ok(PositionIdx::HedgeLong),
            2 => Ok(PositionIdx::HedgeShort),
            other => Err(Error::MalformedOrder {
                reason: format!("unknown position_idx {}", other),
            }),
        }
    }

    pub fn is_hedge(&self) -> bool {
        !matches!(self, PositionIdx::OneWay)
    }

    /// Position side addressed by a hedge-mode slot. None in one-way mode,
    /// where the side is derived from the open position instead.
    pub fn hedge_side(&self) -> Option<PositionSide> {
        match self {
            PositionIdx::OneWay => None,
            PositionIdx::HedgeLong => Some(PositionSide::Long),
            PositionIdx::HedgeShort => Some(PositionSide::Short),
        }
    }
}

/// A single exchange order fill, as delivered by the WebSocket stream or a
/// REST backfill. `position_id == None` means the fill has not been mapped
/// to a logical position yet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderFill {
    pub record_id: OrderRecordId,
    pub exchange_order_id: ExchangeOrderId,
    pub account_key_id: AccountKeyId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub position_effect: PositionEffect,
    pub position_idx: PositionIdx,
    pub filled_quantity: Quantity,
    pub filled_price: Price,
    pub cum_exec_fee: Balance,
    /// Exchange-reported realized PnL; present on Close fills.
    pub realized_pnl: Option<Balance>,
    pub leverage: Ratio,
    pub fill_time: Option<Timestamp>,
    pub position_id: Option<PositionId>,
    /// Set on the synthetic Open fragment produced by a flip, pointing back
    /// at the exchange order the fragment was split from.
    pub split_from: Option<ExchangeOrderId>,
}

impl OrderFill {
    pub fn is_mapped(&self) -> bool {
        self.position_id.is_some()
    }

    /// Boundary validation: malformed fills never enter the engine.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(Error::MalformedOrder {
                reason: format!("order {} has no symbol", self.exchange_order_id),
            });
        }
        if self.filled_quantity.is_zero() {
            return Err(Error::MalformedOrder {
                reason: format!("order {} has zero filled quantity", self.exchange_order_id),
            });
        }
        Ok(())
    }
}

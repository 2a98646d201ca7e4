use crate::types::balance::Balance;
use crate::types::order::{OrderFill, PositionEffect};
use crate::types::price::Price;
use crate::types::quantity::Quantity;

/// Derived position fields recomputed from a full set of mapped fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recalculation {
    pub closed_size: Quantity,
    pub avg_exit_price: Price,
    pub realized_pnl: Balance,
    pub closed_fee: Balance,
    pub open_fee: Balance,
}

/// Pure recomputation of aggregate position fields. Used by the engine for
/// close-side aggregates and invoked standalone when a user manually edits,
/// adds, or deletes an order on a position that is no longer open.
pub struct PositionCalculationService;

impl PositionCalculationService {
    /// Total and side-effect-free; callers persist the result themselves.
    pub fn recalculate(orders: &[OrderFill]) -> Recalculation {
        let (open_fills, close_fills): (Vec<&OrderFill>, Vec<&OrderFill>) = orders
            .iter()
            .partition(|o| o.position_effect == PositionEffect::Open);

        let closed_size: Quantity = close_fills.iter().map(|o| o.filled_quantity).sum();
        let closed_fee: Balance = close_fills.iter().map(|o| o.cum_exec_fee).sum();
        let open_fee: Balance = open_fills.iter().map(|o| o.cum_exec_fee).sum();
        let realized_pnl: Balance = close_fills
            .iter()
            .map(|o| o.realized_pnl.unwrap_or_else(Balance::zero))
            .sum();

        let avg_exit_price = weighted_average(
            close_fills.iter().map(|o| (o.filled_price, o.filled_quantity)),
        );

        Recalculation {
            closed_size,
            avg_exit_price,
            realized_pnl,
            closed_fee,
            open_fee,
        }
    }
}

/// Notional-weighted average price over (price, quantity) fills, at 8 decimal
/// places with half-up rounding. Zero when the fill set is empty.
pub fn weighted_average(fills: impl Iterator<Item = (Price, Quantity)>) -> Price {
    let mut notional: i128 = 0;
    let mut quantity: i128 = 0;
    for (price, qty) in fills {
        notional += qty.notional(price);
        quantity += qty.to_i64() as i128;
    }
    if quantity == 0 {
        return Price::zero();
    }
    // Half-up at the 8th decimal: bias the numerator by half the divisor.
    let avg = (notional + quantity / 2) / quantity;
    Price::from_i64(avg as i64)
}

/// Re-average an existing running average against one new fill.
pub fn reaverage(
    current_avg: Price,
    current_qty: Quantity,
    fill_price: Price,
    fill_qty: Quantity,
) -> Price {
    weighted_average([(current_avg, current_qty), (fill_price, fill_qty)].into_iter())
}

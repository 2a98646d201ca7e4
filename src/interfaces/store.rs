use async_trait::async_trait;
use crate::error::Result;
use crate::types::ids::{AccountKeyId, PositionId};
use crate::types::order::{OrderFill, PositionEffect};
use crate::types::position::{Position, PositionSide, PositionStatus};
use crate::types::symbol::Symbol;

/// One order row mutation produced by a transition: the row (possibly a new
/// fragment from a flip), its resolved effect, and the position it now
/// belongs to.
#[derive(Clone, Debug)]
pub struct OrderAssignment {
    pub order: OrderFill,
    pub resolved_effect: PositionEffect,
    pub position_id: PositionId,
}

/// Everything a single transition wants persisted. Applied atomically:
/// either all rows land or none do, so a store failure leaves the original
/// fill unmapped and retryable.
#[derive(Clone, Debug, Default)]
pub struct TransitionWrites {
    pub positions: Vec<Position>,
    pub orders: Vec<OrderAssignment>,
}

/// The transactional relational store backing Position and Order rows.
/// External collaborator; implementations must provide per-commit atomicity.
#[async_trait]
pub trait ReconStore: Send + Sync {
    /// Open positions for a partition, optionally narrowed to one side
    /// (hedge-mode lookups pass the side, one-way lookups pass None).
    async fn find_open_positions(
        &self,
        account_key_id: AccountKeyId,
        symbol: &Symbol,
        side: Option<PositionSide>,
    ) -> Result<Vec<Position>>;

    async fn find_positions_by_status(&self, status: PositionStatus) -> Result<Vec<Position>>;

    async fn find_position(&self, position_id: PositionId) -> Result<Option<Position>>;

    /// Fills for the account key with no position assignment, ascending by
    /// fill time (nulls last).
    async fn find_unmapped_orders(&self, account_key_id: AccountKeyId) -> Result<Vec<OrderFill>>;

    async fn find_orders_for_position(&self, position_id: PositionId) -> Result<Vec<OrderFill>>;

    async fn commit_transition(&self, writes: &TransitionWrites) -> Result<()>;
}

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::events::position::PositionEvent;
use crate::interfaces::event_publisher::PositionEventPublisher;
use crate::interfaces::journal::JournalStore;
use crate::interfaces::store::{ReconStore, TransitionWrites};
use crate::types::ids::{AccountKeyId, JournalId, OrderRecordId, PositionId, UserId};
use crate::types::order::OrderFill;
use crate::types::position::{Position, PositionSide, PositionStatus};
use crate::types::symbol::Symbol;

#[derive(Default)]
struct Tables {
    positions: HashMap<PositionId, Position>,
    orders: HashMap<OrderRecordId, OrderFill>,
}

/// Reference `ReconStore` over tokio-RwLock-guarded maps. A commit takes the
/// write lock once, giving the same all-or-nothing visibility a relational
/// transaction would. Used by the test suite and the demo binary.
#[derive(Default)]
pub struct InMemoryReconStore {
    tables: RwLock<Tables>,
}

impl InMemoryReconStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a fill as the external order source would: persisted, unmapped.
    pub async fn insert_order(&self, order: OrderFill) {
        let mut tables = self.tables.write().await;
        tables.orders.insert(order.record_id, order);
    }

    pub async fn position(&self, position_id: PositionId) -> Option<Position> {
        self.tables.read().await.positions.get(&position_id).cloned()
    }

    pub async fn all_positions(&self) -> Vec<Position> {
        self.tables.read().await.positions.values().cloned().collect()
    }

    pub async fn all_orders(&self) -> Vec<OrderFill> {
        self.tables.read().await.orders.values().cloned().collect()
    }
}

#[async_trait]
impl ReconStore for InMemoryReconStore {
    async fn find_open_positions(
        &self,
        account_key_id: AccountKeyId,
        symbol: &Symbol,
        side: Option<PositionSide>,
    ) -> Result<Vec<Position>> {
        let tables = self.tables.read().await;
        Ok(tables
            .positions
            .values()
            .filter(|p| {
                p.account_key_id == account_key_id
                    && p.symbol == *symbol
                    && p.status == PositionStatus::Open
                    && side.is_none_or(|s| p.side == s)
            })
            .cloned()
            .collect())
    }

    async fn find_positions_by_status(&self, status: PositionStatus) -> Result<Vec<Position>> {
        let tables = self.tables.read().await;
        Ok(tables
            .positions
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect())
    }

    async fn find_position(&self, position_id: PositionId) -> Result<Option<Position>> {
        Ok(self.tables.read().await.positions.get(&position_id).cloned())
    }

    async fn find_unmapped_orders(&self, account_key_id: AccountKeyId) -> Result<Vec<OrderFill>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<OrderFill> = tables
            .orders
            .values()
            .filter(|o| o.account_key_id == account_key_id && !o.is_mapped())
            .cloned()
            .collect();
        orders.sort_by(|a, b| match (a.fill_time, b.fill_time) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Ok(orders)
    }

    async fn find_orders_for_position(&self, position_id: PositionId) -> Result<Vec<OrderFill>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.position_id == Some(position_id))
            .cloned()
            .collect())
    }

    async fn commit_transition(&self, writes: &TransitionWrites) -> Result<()> {
        let mut tables = self.tables.write().await;
        for position in &writes.positions {
            tables.positions.insert(position.position_id, position.clone());
        }
        for assignment in &writes.orders {
            let mut order = assignment.order.clone();
            order.position_effect = assignment.resolved_effect;
            order.position_id = Some(assignment.position_id);
            tables.orders.insert(order.record_id, order);
        }
        Ok(())
    }
}

/// Publisher that buffers events for assertions; sequences monotonically
/// like a real transport would.
#[derive(Default)]
pub struct RecordingPublisher {
    sequence: AtomicU64,
    events: RwLock<Vec<PositionEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<PositionEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl PositionEventPublisher for RecordingPublisher {
    async fn publish(&self, mut event: PositionEvent) -> Result<u64> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        event.set_sequence(sequence);
        self.events.write().await.push(event);
        Ok(sequence)
    }
}

/// Journal collaborator that records which positions got an empty journal.
#[derive(Default)]
pub struct RecordingJournalStore {
    created: RwLock<Vec<(PositionId, UserId)>>,
}

impl RecordingJournalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn created(&self) -> Vec<(PositionId, UserId)> {
        self.created.read().await.clone()
    }
}

#[async_trait]
impl JournalStore for RecordingJournalStore {
    async fn create_empty(&self, position_id: PositionId, user_id: UserId) -> Result<JournalId> {
        self.created.write().await.push((position_id, user_id));
        Ok(JournalId::new())
    }
}

/// Helper for wiring an engine against in-memory collaborators.
pub fn in_memory_stack() -> (
    Arc<InMemoryReconStore>,
    Arc<RecordingPublisher>,
    Arc<RecordingJournalStore>,
) {
    (
        Arc::new(InMemoryReconStore::new()),
        Arc::new(RecordingPublisher::new()),
        Arc::new(RecordingJournalStore::new()),
    )
}

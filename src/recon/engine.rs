use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

use crate::error::{Error, Result};
use crate::events::position::PositionEvent;
use crate::interfaces::event_publisher::PositionEventPublisher;
use crate::interfaces::journal::JournalStore;
use crate::interfaces::store::{ReconStore, TransitionWrites};
use crate::observability::metrics;
use crate::observability::tracing::{trace_order_processing, trace_reconstruction};
use crate::recon::calculator::PositionCalculationService;
use crate::recon::lock_table::LockTable;
use crate::recon::transition::{self, PositionState, TransitionOutcome};
use crate::types::ids::{AccountKeyId, PositionId};
use crate::types::order::OrderFill;
use crate::types::position::{PositionMode, PositionStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The fill drove a transition; rows were committed.
    Applied,
    /// The fill was already mapped; nothing was touched.
    AlreadyMapped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Assigns incoming order fills to logical positions: open, add, partial
/// close, full close, flip. Idempotent under redelivery from any of its
/// entry points (live stream, gap-fill batch, startup recovery).
pub struct PositionReconstructionEngine {
    store: Arc<dyn ReconStore>,
    publisher: Arc<dyn PositionEventPublisher>,
    journal: Arc<dyn JournalStore>,
    locks: Arc<LockTable>,
}

impl PositionReconstructionEngine {
    pub fn new(
        store: Arc<dyn ReconStore>,
        publisher: Arc<dyn PositionEventPublisher>,
        journal: Arc<dyn JournalStore>,
    ) -> Self {
        PositionReconstructionEngine {
            store,
            publisher,
            journal,
            locks: Arc::new(LockTable::new()),
        }
    }

    pub fn lock_table(&self) -> &Arc<LockTable> {
        &self.locks
    }

    /// Single-fill path for live stream delivery.
    pub async fn process_order(&self, order: OrderFill) -> Result<ProcessOutcome> {
        let span = trace_order_processing(&order.exchange_order_id, &order.symbol);
        self.process_order_inner(order).instrument(span).await
    }

    async fn process_order_inner(&self, order: OrderFill) -> Result<ProcessOutcome> {
        order.validate()?;

        // The single authoritative duplicate guard, whichever entry point
        // redelivered the fill.
        if order.is_mapped() {
            debug!(order_id = %order.exchange_order_id, "fill already mapped, skipping");
            metrics::ORDERS_SKIPPED_MAPPED.inc();
            return Ok(ProcessOutcome::AlreadyMapped);
        }

        let started = Instant::now();
        let outcome = {
            let _guard = self
                .locks
                .acquire(order.account_key_id, &order.symbol)
                .await;

            let state = self.load_state(&order).await?;
            let outcome = transition::apply(state, &order)?;
            // Commit inside the lock so a concurrent fill for the same
            // partition observes the new state or none of it.
            self.store.commit_transition(&outcome.writes).await?;
            outcome
        };
        metrics::ORDER_PROCESSING_LATENCY.observe(started.elapsed().as_secs_f64());
        metrics::ORDERS_PROCESSED.inc();
        if outcome.writes.orders.len() > 1 {
            metrics::POSITION_FLIPS.inc();
        }

        self.post_commit(&outcome).await;
        Ok(ProcessOutcome::Applied)
    }

    /// Gap-fill path. Fills are re-sorted ascending by fill time (nulls
    /// last) before replay: averaging and flips are path-dependent, so the
    /// input permutation must not matter. Per-fill errors are logged and
    /// counted, never propagated — failed fills stay unmapped for recovery.
    pub async fn process_orders_batch(&self, mut orders: Vec<OrderFill>) -> Result<BatchOutcome> {
        orders.sort_by(|a, b| match (a.fill_time, b.fill_time) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let mut outcome = BatchOutcome::default();
        for order in orders {
            let order_id = order.exchange_order_id.clone();
            match self.process_order(order).await {
                Ok(ProcessOutcome::Applied) => outcome.applied += 1,
                Ok(ProcessOutcome::AlreadyMapped) => outcome.skipped += 1,
                Err(e) => {
                    warn!(order_id = %order_id, error = %e, "fill left unmapped");
                    metrics::ORDERS_FAILED.inc();
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }

    /// Recovery path: replays every unmapped fill for the account key. The
    /// store returns them ascending by fill time; the batch path re-sorts
    /// anyway, so a store that cannot order nulls-last is still safe.
    pub async fn full_reconstruction(&self, account_key_id: AccountKeyId) -> Result<BatchOutcome> {
        let span = trace_reconstruction(&account_key_id);
        async {
            let orders = self.store.find_unmapped_orders(account_key_id).await?;
            if orders.is_empty() {
                return Ok(BatchOutcome::default());
            }
            info!(count = orders.len(), "replaying unmapped fills");
            self.process_orders_batch(orders).await
        }
        .instrument(span)
        .await
    }

    /// Re-attempts mapping for one ClosedUnmapped position: replay the
    /// account's unmapped fills, then recompute the position's aggregates
    /// from whatever fills now reference it. Resolves to ClosedMapped once
    /// the mapped close quantity covers the detected closed size.
    pub async fn remap_position(&self, position_id: PositionId) -> Result<bool> {
        let Some(position) = self.store.find_position(position_id).await? else {
            return Err(Error::PositionNotFound(position_id));
        };
        if position.status != PositionStatus::ClosedUnmapped {
            return Ok(false);
        }

        // Replay first, outside the partition lock: each fill takes the lock
        // itself, and nesting would deadlock.
        self.full_reconstruction(position.account_key_id).await?;

        let _guard = self
            .locks
            .acquire(position.account_key_id, &position.symbol)
            .await;

        let orders = self.store.find_orders_for_position(position_id).await?;
        if orders.is_empty() {
            return Ok(false);
        }

        let recalc = PositionCalculationService::recalculate(&orders);
        if recalc.closed_size < position.closed_size {
            // Still missing close fills; leave it for the next sweep.
            return Ok(false);
        }

        let mut resolved = position;
        resolved.closed_size = recalc.closed_size;
        resolved.avg_exit_price = recalc.avg_exit_price;
        resolved.realized_pnl = recalc.realized_pnl;
        resolved.closed_fee = recalc.closed_fee;
        resolved.open_fee = recalc.open_fee;
        resolved.status = PositionStatus::ClosedMapped;

        self.store
            .commit_transition(&TransitionWrites {
                positions: vec![resolved],
                orders: Vec::new(),
            })
            .await?;
        Ok(true)
    }

    /// Loads the partition state for a fill. Hedge fills address exactly one
    /// side; one-way fills address the symbol's single open position.
    async fn load_state(&self, order: &OrderFill) -> Result<PositionState> {
        let side = order.position_idx.hedge_side();
        let mut open = self
            .store
            .find_open_positions(order.account_key_id, &order.symbol, side)
            .await?;

        // Rows from the other account mode are never legal counterparties:
        // a one-way fill must not land on a hedge slot and vice versa.
        let mode = if side.is_some() {
            PositionMode::Hedge
        } else {
            PositionMode::OneWay
        };
        open.retain(|p| p.mode == mode);

        match open.len() {
            0 => Ok(PositionState::Flat),
            1 => Ok(PositionState::Open(open.into_iter().next().unwrap())),
            _ => {
                // Corrupt store state; refuse to guess which row to mutate.
                if side.is_none() {
                    Err(Error::OneWayInvariantViolated {
                        account_key_id: order.account_key_id,
                        symbol: order.symbol.clone(),
                        exchange_order_id: order.exchange_order_id.clone(),
                    })
                } else {
                    Err(Error::DuplicateOpenPosition {
                        account_key_id: order.account_key_id,
                        symbol: order.symbol.clone(),
                    })
                }
            }
        }
    }

    /// Post-commit side channel: journal rows for new positions, then the
    /// open/close events. Both are fire-and-forget; a failure here never
    /// rolls back the committed transition.
    async fn post_commit(&self, outcome: &TransitionOutcome) {
        for event in &outcome.events {
            if let PositionEvent::Opened(opened) = event {
                metrics::POSITIONS_OPENED.inc();
                if let Err(e) = self
                    .journal
                    .create_empty(opened.position_id, opened.user_id)
                    .await
                {
                    warn!(position_id = %opened.position_id, error = %e, "journal creation failed");
                }
            }
            if matches!(event, PositionEvent::Closed(_)) {
                metrics::POSITIONS_CLOSED.inc();
            }
            if let Err(e) = self.publisher.publish(event.clone()).await {
                warn!(position_id = %event.position_id(), error = %e, "event publish failed");
            }
        }
    }
}

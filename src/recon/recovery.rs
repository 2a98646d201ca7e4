use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn, Instrument};

use crate::error::Result;
use crate::interfaces::store::ReconStore;
use crate::observability::metrics;
use crate::observability::tracing::trace_recovery_sweep;
use crate::recon::engine::PositionReconstructionEngine;
use crate::types::position::PositionStatus;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub scanned: usize,
    pub resolved: usize,
    pub skipped: usize,
}

/// Periodic sweep over ClosedUnmapped positions. Each tick retries order
/// mapping through the engine's own primitives; one bad position is logged
/// and skipped so it cannot block the rest of the sweep.
pub struct UnmappedRecoveryScheduler {
    engine: Arc<PositionReconstructionEngine>,
    store: Arc<dyn ReconStore>,
    interval: Duration,
    lock_idle_ttl: Duration,
}

impl UnmappedRecoveryScheduler {
    pub fn new(
        engine: Arc<PositionReconstructionEngine>,
        store: Arc<dyn ReconStore>,
        interval: Duration,
        lock_idle_ttl: Duration,
    ) -> Self {
        UnmappedRecoveryScheduler {
            engine,
            store,
            interval,
            lock_idle_ttl,
        }
    }

    pub async fn run(&self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.sweep().await {
                Ok(outcome) => {
                    if outcome.scanned > 0 {
                        info!(
                            scanned = outcome.scanned,
                            resolved = outcome.resolved,
                            skipped = outcome.skipped,
                            "recovery sweep finished"
                        );
                    }
                }
                Err(e) => warn!(error = %e, "recovery sweep failed to scan"),
            }
            // The sweep doubles as the lock-table janitor: reap partitions
            // nobody has touched since well before the previous tick.
            self.engine.lock_table().gc(self.lock_idle_ttl);
        }
    }

    pub async fn sweep(&self) -> Result<SweepOutcome> {
        let span = trace_recovery_sweep();
        async {
            metrics::RECOVERY_SWEEPS.inc();
            let unmapped = self
                .store
                .find_positions_by_status(PositionStatus::ClosedUnmapped)
                .await?;
            metrics::UNMAPPED_POSITIONS.set(unmapped.len() as i64);

            let mut outcome = SweepOutcome {
                scanned: unmapped.len(),
                ..Default::default()
            };
            for position in unmapped {
                match self.engine.remap_position(position.position_id).await {
                    Ok(true) => outcome.resolved += 1,
                    Ok(false) => outcome.skipped += 1,
                    Err(e) => {
                        warn!(
                            position_id = %position.position_id,
                            symbol = %position.symbol,
                            error = %e,
                            "remap failed, skipping position"
                        );
                        outcome.skipped += 1;
                    }
                }
            }
            Ok(outcome)
        }
        .instrument(span)
        .await
    }
}

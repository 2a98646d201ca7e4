use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::types::ids::AccountKeyId;
use crate::types::symbol::Symbol;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct LockKey {
    account_key_id: AccountKeyId,
    symbol: Symbol,
}

struct LockEntry {
    mutex: Arc<Mutex<()>>,
    last_acquired: Instant,
}

/// Exclusive async lock per (account key, symbol) partition. All conflicting
/// mutations — live stream, gap-fill replay, startup recovery — serialize
/// through the same entry, while unrelated partitions proceed in parallel.
///
/// Entries are created lazily and reaped by `gc` once idle and unheld, which
/// bounds growth across many symbols and rotated account keys.
pub struct LockTable {
    locks: DashMap<LockKey, LockEntry>,
}

impl LockTable {
    pub fn new() -> Self {
        LockTable { locks: DashMap::new() }
    }

    /// Acquires the partition lock, waiting if another task holds it. The
    /// returned guard is owned so it can cross await points in the engine.
    pub async fn acquire(
        &self,
        account_key_id: AccountKeyId,
        symbol: &Symbol,
    ) -> OwnedMutexGuard<()> {
        let key = LockKey {
            account_key_id,
            symbol: symbol.clone(),
        };
        let mutex = {
            let mut entry = self.locks.entry(key).or_insert_with(|| LockEntry {
                mutex: Arc::new(Mutex::new(())),
                last_acquired: Instant::now(),
            });
            entry.last_acquired = Instant::now();
            Arc::clone(&entry.mutex)
        };
        mutex.lock_owned().await
    }

    /// Drops entries idle for longer than `idle_ttl` and not currently held.
    /// Holding tasks keep their own Arc, so `strong_count == 1` means nobody
    /// is inside or waiting on the lock.
    pub fn gc(&self, idle_ttl: Duration) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, entry| {
            Arc::strong_count(&entry.mutex) > 1 || entry.last_acquired.elapsed() < idle_ttl
        });
        let reaped = before - self.locks.len();
        if reaped > 0 {
            debug!(reaped, remaining = self.locks.len(), "lock table gc");
        }
        reaped
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_partition_serializes() {
        let table = Arc::new(LockTable::new());
        let key = AccountKeyId::new();
        let symbol = Symbol::new("BTCUSDT");

        let guard = table.acquire(key, &symbol).await;
        let table2 = Arc::clone(&table);
        let symbol2 = symbol.clone();
        let contender = tokio::spawn(async move {
            let _g = table2.acquire(key, &symbol2).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_symbols_do_not_block() {
        let table = LockTable::new();
        let key = AccountKeyId::new();

        let _g1 = table.acquire(key, &Symbol::new("BTCUSDT")).await;
        // Would deadlock if partitions shared a lock
        let _g2 = table.acquire(key, &Symbol::new("ETHUSDT")).await;
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn gc_reaps_idle_but_not_held_entries() {
        let table = LockTable::new();
        let key = AccountKeyId::new();

        let held = table.acquire(key, &Symbol::new("BTCUSDT")).await;
        let released = table.acquire(key, &Symbol::new("ETHUSDT")).await;
        drop(released);

        // Zero TTL: everything idle is eligible immediately
        let reaped = table.gc(Duration::ZERO);
        assert_eq!(reaped, 1);
        assert_eq!(table.len(), 1);
        drop(held);
    }
}

//! In-memory counter store.

use std::collections::{BTreeMap, HashMap, btree_map::Entry};

use async_trait::async_trait;
use parking_lot::Mutex;
use tollgate_primitives::AccountId;

use crate::{
    BinUsage, CounterKey, CounterStore, Insertion, LedgerKey, PaymentBound, PaymentRecord,
    SortOrder, StoreResult,
};

/// Process-local [`CounterStore`].
///
/// Counters and the ledger are guarded by separate locks; every trait method
/// takes exactly one of them, so each call is atomic on its own.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<CounterKey, u64>>,
    ledger: Mutex<BTreeMap<(AccountId, u64), u64>>,
}

impl MemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live counters.
    pub fn counter_count(&self) -> usize {
        self.counters.lock().len()
    }

    /// Number of ledger entries across all accounts.
    pub fn payment_count(&self) -> usize {
        self.ledger.lock().len()
    }

    /// Drop reservation counters with a bin index below `before`.
    ///
    /// Returns the number of counters removed.
    pub fn prune_reservation_bins(&self, before: u64) -> usize {
        self.prune(|key| matches!(key, CounterKey::Reservation { bin, .. } if *bin < before))
    }

    /// Drop global counters with a bin index below `before`.
    pub fn prune_global_bins(&self, before: u64) -> usize {
        self.prune(|key| matches!(key, CounterKey::Global { bin } if *bin < before))
    }

    fn prune(&self, stale: impl Fn(&CounterKey) -> bool) -> usize {
        let mut counters = self.counters.lock();
        let len = counters.len();
        counters.retain(|key, _| !stale(key));
        len - counters.len()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: CounterKey, delta: u64) -> StoreResult<u64> {
        let mut counters = self.counters.lock();
        let value = counters.entry(key).or_default();
        *value = value.saturating_add(delta);
        Ok(*value)
    }

    async fn decrement(&self, key: CounterKey, delta: u64) -> StoreResult<u64> {
        let mut counters = self.counters.lock();
        let value = counters.entry(key).or_default();
        *value = value.saturating_sub(delta);
        Ok(*value)
    }

    async fn get(&self, key: CounterKey) -> StoreResult<Option<u64>> {
        Ok(self.counters.lock().get(&key).copied())
    }

    async fn reservation_bins(&self, account: AccountId) -> StoreResult<Vec<BinUsage>> {
        let mut bins: Vec<_> = self
            .counters
            .lock()
            .iter()
            .filter_map(|(key, &usage)| match *key {
                CounterKey::Reservation { account: a, bin } if a == account => {
                    Some(BinUsage { bin, usage })
                }
                _ => None,
            })
            .collect();
        bins.sort_unstable_by_key(|b| b.bin);
        Ok(bins)
    }

    async fn insert_payment(&self, key: LedgerKey, data_length: u64) -> StoreResult<Insertion> {
        let mut ledger = self.ledger.lock();
        match ledger.entry((key.account, key.cumulative_payment)) {
            Entry::Occupied(_) => Ok(Insertion::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(data_length);
                Ok(Insertion::Inserted)
            }
        }
    }

    async fn payment(&self, key: LedgerKey) -> StoreResult<Option<u64>> {
        let ledger = self.ledger.lock();
        Ok(ledger.get(&(key.account, key.cumulative_payment)).copied())
    }

    async fn remove_payment(&self, key: LedgerKey) -> StoreResult<()> {
        self.ledger
            .lock()
            .remove(&(key.account, key.cumulative_payment));
        Ok(())
    }

    async fn query_payments(
        &self,
        account: AccountId,
        bound: PaymentBound,
        order: SortOrder,
        limit: usize,
    ) -> StoreResult<Vec<PaymentRecord>> {
        let ledger = self.ledger.lock();
        let range = match bound {
            PaymentBound::LessThan(b) => ledger.range((account, 0)..(account, b)),
            PaymentBound::GreaterThan(u64::MAX) => return Ok(Vec::new()),
            PaymentBound::GreaterThan(b) => ledger.range((account, b + 1)..=(account, u64::MAX)),
        };

        let to_record = |(&(_, cumulative_payment), &data_length): (&(AccountId, u64), &u64)| {
            PaymentRecord {
                cumulative_payment,
                data_length,
            }
        };

        Ok(match order {
            SortOrder::Ascending => range.take(limit).map(to_record).collect(),
            SortOrder::Descending => range.rev().take(limit).map(to_record).collect(),
        })
    }
}

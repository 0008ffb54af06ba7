//! Counter store backend trait.
//!
//! The [`CounterStore`] trait abstracts over storage backends. Correctness of
//! admission control rests entirely on its atomicity: an increment returns the
//! total including that increment and no other, and a ledger insert either
//! creates the entry or reports that it already exists.

use async_trait::async_trait;
use tollgate_primitives::AccountId;

use crate::{CounterKey, LedgerKey, StoreResult};

/// Outcome of a conditional ledger insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The entry was created.
    Inserted,
    /// An entry with the same key was already present; nothing was written.
    AlreadyExists,
}

/// Strict bound for a ledger range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentBound {
    /// Entries with `cumulative_payment < bound`.
    LessThan(u64),
    /// Entries with `cumulative_payment > bound`.
    GreaterThan(u64),
}

/// Order of ledger query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRecord {
    /// Cumulative payment the entry was recorded at.
    pub cumulative_payment: u64,
    /// Bytes charged for that payment.
    pub data_length: u64,
}

/// Usage recorded in one reservation bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinUsage {
    pub bin: u64,
    /// Bytes charged to the bin.
    pub usage: u64,
}

/// Ledger entries adjacent to a candidate payment.
///
/// Missing neighbors are reported as zero, matching an empty ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaymentNeighbors {
    /// Largest recorded payment strictly below the candidate, or 0.
    pub prev_payment: u64,
    /// Smallest recorded entry strictly above the candidate, if any.
    pub next: Option<PaymentRecord>,
}

/// Storage backend for usage counters and the on-demand ledger.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and atomic per operation.
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    /// Add `delta` to the counter and return the new total.
    ///
    /// An absent counter starts at zero. Totals saturate at `u64::MAX`.
    async fn increment(&self, key: CounterKey, delta: u64) -> StoreResult<u64>;

    /// Subtract `delta` from the counter and return the new total.
    ///
    /// Saturates at zero. Only used for compensating rollbacks.
    async fn decrement(&self, key: CounterKey, delta: u64) -> StoreResult<u64>;

    /// Current counter value, or `None` if it was never written.
    async fn get(&self, key: CounterKey) -> StoreResult<Option<u64>>;

    /// Every reservation bin `account` has been charged in, ascending by bin.
    async fn reservation_bins(&self, account: AccountId) -> StoreResult<Vec<BinUsage>>;

    /// Record `data_length` for a ledger key unless the key already exists.
    async fn insert_payment(&self, key: LedgerKey, data_length: u64) -> StoreResult<Insertion>;

    /// Data length recorded for a ledger key, or `None` if absent.
    async fn payment(&self, key: LedgerKey) -> StoreResult<Option<u64>>;

    /// Delete a ledger entry.
    ///
    /// Returns `Ok(())` even if the entry didn't exist.
    async fn remove_payment(&self, key: LedgerKey) -> StoreResult<()>;

    /// Up to `limit` ledger entries of `account` satisfying `bound`, in `order`.
    async fn query_payments(
        &self,
        account: AccountId,
        bound: PaymentBound,
        order: SortOrder,
        limit: usize,
    ) -> StoreResult<Vec<PaymentRecord>>;

    /// Entries immediately below and above `cumulative_payment`.
    async fn payment_neighbors(
        &self,
        account: AccountId,
        cumulative_payment: u64,
    ) -> StoreResult<PaymentNeighbors> {
        let prev = self
            .query_payments(
                account,
                PaymentBound::LessThan(cumulative_payment),
                SortOrder::Descending,
                1,
            )
            .await?;
        let next = self
            .query_payments(
                account,
                PaymentBound::GreaterThan(cumulative_payment),
                SortOrder::Ascending,
                1,
            )
            .await?;

        Ok(PaymentNeighbors {
            prev_payment: prev.first().map_or(0, |r| r.cumulative_payment),
            next: next.first().copied(),
        })
    }
}

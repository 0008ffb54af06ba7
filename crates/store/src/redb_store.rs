//! redb-based counter store backend.
//!
//! This module provides [`RedbCounterStore`], a persistent counter store
//! backed by the redb embedded database. redb serializes write transactions,
//! so each read-modify-write below is atomic without further locking.
//! Transactions run on the tokio blocking pool.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use tollgate_primitives::AccountId;
use tracing::debug;

use crate::{
    BinUsage, CounterKey, CounterStore, Insertion, LedgerKey, PaymentBound, PaymentRecord,
    SortOrder, StoreError, StoreResult,
    keys::{ACCOUNT_KEY_LEN, decode_suffix, encode_account_key},
};

/// Per-account reservation usage.
/// Key: account || bin (big-endian)
/// Value: bytes charged
const RESERVATION_BINS: TableDefinition<&[u8; ACCOUNT_KEY_LEN], u64> =
    TableDefinition::new("reservation_bins");

/// Global on-demand usage.
/// Key: bin
/// Value: bytes charged
const GLOBAL_BINS: TableDefinition<u64, u64> = TableDefinition::new("global_bins");

/// On-demand payment ledger.
/// Key: account || cumulative payment (big-endian)
/// Value: data length
const PAYMENTS: TableDefinition<&[u8; ACCOUNT_KEY_LEN], u64> = TableDefinition::new("payments");

/// redb-based counter store.
///
/// redb transactions block on I/O (every commit is an fsync), so each trait
/// method runs its transaction on tokio's blocking pool. The async methods
/// must therefore be called from within a tokio runtime.
#[derive(Clone)]
pub struct RedbCounterStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCounterStore").finish_non_exhaustive()
    }
}

impl RedbCounterStore {
    /// Open or create a counter store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RESERVATION_BINS)?;
            let _ = write_txn.open_table(GLOBAL_BINS)?;
            let _ = write_txn.open_table(PAYMENTS)?;
        }
        write_txn.commit()?;

        debug!("Opened redb counter store");
        Ok(Self { db: Arc::new(db) })
    }

    /// Drop reservation counters with a bin index below `before`.
    ///
    /// Blocks the calling thread.
    pub fn prune_reservation_bins(&self, before: u64) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RESERVATION_BINS)?;
            table.retain(|key, _| decode_suffix(key) >= before)?;
        }
        write_txn.commit()?;
        debug!(before, "Pruned reservation bins");
        Ok(())
    }

    /// Drop global counters with a bin index below `before`.
    ///
    /// Blocks the calling thread.
    pub fn prune_global_bins(&self, before: u64) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(GLOBAL_BINS)?;
            table.retain(|bin, _| bin >= before)?;
        }
        write_txn.commit()?;
        debug!(before, "Pruned global bins");
        Ok(())
    }

    /// Run `op` against the database on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {e}")))?
    }
}

/// Apply `update` to a counter inside one write transaction.
fn update_counter(
    db: &Database,
    key: CounterKey,
    update: impl FnOnce(u64) -> u64,
) -> StoreResult<u64> {
    let write_txn = db.begin_write()?;
    let value = match key {
        CounterKey::Reservation { account, bin } => {
            let mut table = write_txn.open_table(RESERVATION_BINS)?;
            let key = encode_account_key(&account, bin);
            let current = table.get(&key)?.map(|v| v.value()).unwrap_or_default();
            let value = update(current);
            table.insert(&key, value)?;
            value
        }
        CounterKey::Global { bin } => {
            let mut table = write_txn.open_table(GLOBAL_BINS)?;
            let current = table.get(bin)?.map(|v| v.value()).unwrap_or_default();
            let value = update(current);
            table.insert(bin, value)?;
            value
        }
    };
    write_txn.commit()?;
    Ok(value)
}

fn read_counter(db: &Database, key: CounterKey) -> StoreResult<Option<u64>> {
    let read_txn = db.begin_read()?;
    let value = match key {
        CounterKey::Reservation { account, bin } => {
            let table = read_txn.open_table(RESERVATION_BINS)?;
            table.get(&encode_account_key(&account, bin))?.map(|v| v.value())
        }
        CounterKey::Global { bin } => {
            let table = read_txn.open_table(GLOBAL_BINS)?;
            table.get(bin)?.map(|v| v.value())
        }
    };
    Ok(value)
}

fn insert_payment(db: &Database, key: LedgerKey, data_length: u64) -> StoreResult<Insertion> {
    let write_txn = db.begin_write()?;
    let outcome = {
        let mut table = write_txn.open_table(PAYMENTS)?;
        let key = encode_account_key(&key.account, key.cumulative_payment);
        if table.get(&key)?.is_some() {
            Insertion::AlreadyExists
        } else {
            table.insert(&key, data_length)?;
            Insertion::Inserted
        }
    };
    match outcome {
        Insertion::Inserted => write_txn.commit()?,
        Insertion::AlreadyExists => write_txn.abort()?,
    }
    Ok(outcome)
}

fn read_payment(db: &Database, key: LedgerKey) -> StoreResult<Option<u64>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(PAYMENTS)?;
    let key = encode_account_key(&key.account, key.cumulative_payment);
    Ok(table.get(&key)?.map(|v| v.value()))
}

fn remove_payment(db: &Database, key: LedgerKey) -> StoreResult<()> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(PAYMENTS)?;
        table.remove(&encode_account_key(&key.account, key.cumulative_payment))?;
    }
    write_txn.commit()?;
    Ok(())
}

fn query_payments(
    db: &Database,
    account: AccountId,
    bound: PaymentBound,
    order: SortOrder,
    limit: usize,
) -> StoreResult<Vec<PaymentRecord>> {
    let (lo, hi) = match bound {
        PaymentBound::LessThan(0) | PaymentBound::GreaterThan(u64::MAX) => {
            return Ok(Vec::new());
        }
        PaymentBound::LessThan(b) => (0, b - 1),
        PaymentBound::GreaterThan(b) => (b + 1, u64::MAX),
    };
    let lo = encode_account_key(&account, lo);
    let hi = encode_account_key(&account, hi);

    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(PAYMENTS)?;
    let range = table.range::<&[u8; ACCOUNT_KEY_LEN]>(&lo..=&hi)?;

    let mut records = Vec::with_capacity(limit.min(16));
    let entries: Box<dyn Iterator<Item = _> + '_> = match order {
        SortOrder::Ascending => Box::new(range),
        SortOrder::Descending => Box::new(range.rev()),
    };
    for entry in entries.take(limit) {
        let (key, value) = entry?;
        records.push(PaymentRecord {
            cumulative_payment: decode_suffix(key.value()),
            data_length: value.value(),
        });
    }
    Ok(records)
}

fn reservation_bins(db: &Database, account: AccountId) -> StoreResult<Vec<BinUsage>> {
    let lo = encode_account_key(&account, 0);
    let hi = encode_account_key(&account, u64::MAX);

    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(RESERVATION_BINS)?;
    let mut bins = Vec::new();
    for entry in table.range::<&[u8; ACCOUNT_KEY_LEN]>(&lo..=&hi)? {
        let (key, value) = entry?;
        bins.push(BinUsage {
            bin: decode_suffix(key.value()),
            usage: value.value(),
        });
    }
    Ok(bins)
}

#[async_trait]
impl CounterStore for RedbCounterStore {
    async fn increment(&self, key: CounterKey, delta: u64) -> StoreResult<u64> {
        self.blocking(move |db| update_counter(db, key, |v| v.saturating_add(delta))).await
    }

    async fn decrement(&self, key: CounterKey, delta: u64) -> StoreResult<u64> {
        self.blocking(move |db| update_counter(db, key, |v| v.saturating_sub(delta))).await
    }

    async fn get(&self, key: CounterKey) -> StoreResult<Option<u64>> {
        self.blocking(move |db| read_counter(db, key)).await
    }

    async fn reservation_bins(&self, account: AccountId) -> StoreResult<Vec<BinUsage>> {
        self.blocking(move |db| reservation_bins(db, account)).await
    }

    async fn insert_payment(&self, key: LedgerKey, data_length: u64) -> StoreResult<Insertion> {
        self.blocking(move |db| insert_payment(db, key, data_length)).await
    }

    async fn payment(&self, key: LedgerKey) -> StoreResult<Option<u64>> {
        self.blocking(move |db| read_payment(db, key)).await
    }

    async fn remove_payment(&self, key: LedgerKey) -> StoreResult<()> {
        self.blocking(move |db| remove_payment(db, key)).await
    }

    async fn query_payments(
        &self,
        account: AccountId,
        bound: PaymentBound,
        order: SortOrder,
        limit: usize,
    ) -> StoreResult<Vec<PaymentRecord>> {
        self.blocking(move |db| query_payments(db, account, bound, order, limit)).await
    }
}

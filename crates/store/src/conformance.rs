//! Behaviour every [`CounterStore`] backend must share.
//!
//! Each check is a plain async function over `Arc<S>`, run below once per
//! backend.

use std::sync::Arc;

use tempfile::TempDir;
use tollgate_primitives::AccountId;

use crate::{
    BinUsage, CounterKey, CounterStore, Insertion, LedgerKey, MemoryCounterStore, PaymentBound,
    PaymentNeighbors, PaymentRecord, RedbCounterStore, SortOrder,
};

fn account(n: u8) -> AccountId {
    AccountId::repeat_byte(n)
}

fn record(cumulative_payment: u64, data_length: u64) -> PaymentRecord {
    PaymentRecord {
        cumulative_payment,
        data_length,
    }
}

async fn increment_returns_running_total<S: CounterStore>(store: Arc<S>) {
    let key = CounterKey::reservation(account(1), 7);

    assert_eq!(store.get(key).await.unwrap(), None);
    assert_eq!(store.increment(key, 30).await.unwrap(), 30);
    assert_eq!(store.increment(key, 12).await.unwrap(), 42);
    assert_eq!(store.get(key).await.unwrap(), Some(42));

    // Other accounts, other bins and the global counter are independent.
    assert_eq!(
        store
            .get(CounterKey::reservation(account(2), 7))
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        store
            .get(CounterKey::reservation(account(1), 8))
            .await
            .unwrap(),
        None
    );
    assert_eq!(store.get(CounterKey::global(7)).await.unwrap(), None);
}

async fn counters_saturate<S: CounterStore>(store: Arc<S>) {
    let key = CounterKey::global(1);

    store.increment(key, u64::MAX - 1).await.unwrap();
    assert_eq!(store.increment(key, 10).await.unwrap(), u64::MAX);

    assert_eq!(store.decrement(CounterKey::global(2), 5).await.unwrap(), 0);
    store.increment(CounterKey::global(3), 5).await.unwrap();
    assert_eq!(store.decrement(CounterKey::global(3), 2).await.unwrap(), 3);
}

async fn concurrent_increments_are_not_lost<S: CounterStore>(store: Arc<S>) {
    let key = CounterKey::global(100);
    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..25 {
                store.increment(key, 2).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.get(key).await.unwrap(), Some(16 * 25 * 2));
}

async fn insert_payment_is_conditional<S: CounterStore>(store: Arc<S>) {
    let key = LedgerKey::new(account(3), 50);

    assert_eq!(
        store.insert_payment(key, 5).await.unwrap(),
        Insertion::Inserted
    );
    assert_eq!(
        store.insert_payment(key, 9).await.unwrap(),
        Insertion::AlreadyExists
    );
    assert_eq!(store.payment(key).await.unwrap(), Some(5));

    // Same payment value under another account is a distinct entry.
    let other = LedgerKey::new(account(4), 50);
    assert_eq!(
        store.insert_payment(other, 1).await.unwrap(),
        Insertion::Inserted
    );
}

async fn concurrent_inserts_have_one_winner<S: CounterStore>(store: Arc<S>) {
    let key = LedgerKey::new(account(5), 1_000);
    let mut handles = Vec::new();
    for len in 0..12u64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.insert_payment(key, len).await.unwrap() }));
    }

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap() == Insertion::Inserted {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
}

async fn remove_payment_is_idempotent<S: CounterStore>(store: Arc<S>) {
    let key = LedgerKey::new(account(6), 10);

    store.remove_payment(key).await.unwrap();
    store.insert_payment(key, 3).await.unwrap();
    store.remove_payment(key).await.unwrap();
    assert_eq!(store.payment(key).await.unwrap(), None);
    store.remove_payment(key).await.unwrap();

    assert_eq!(
        store.insert_payment(key, 4).await.unwrap(),
        Insertion::Inserted
    );
}

async fn query_payments_orders_and_bounds<S: CounterStore>(store: Arc<S>) {
    let a = account(7);
    for (payment, len) in [(10, 1), (20, 2), (30, 3), (40, 4)] {
        store
            .insert_payment(LedgerKey::new(a, payment), len)
            .await
            .unwrap();
    }
    // Neighbouring accounts must never leak into the range.
    store
        .insert_payment(LedgerKey::new(account(6), 25), 9)
        .await
        .unwrap();
    store
        .insert_payment(LedgerKey::new(account(8), 25), 9)
        .await
        .unwrap();

    let below = store
        .query_payments(a, PaymentBound::LessThan(30), SortOrder::Descending, 10)
        .await
        .unwrap();
    assert_eq!(below, vec![record(20, 2), record(10, 1)]);

    let above = store
        .query_payments(a, PaymentBound::GreaterThan(10), SortOrder::Ascending, 2)
        .await
        .unwrap();
    assert_eq!(above, vec![record(20, 2), record(30, 3)]);

    let none = store
        .query_payments(a, PaymentBound::LessThan(10), SortOrder::Descending, 1)
        .await
        .unwrap();
    assert!(none.is_empty());

    let edge = store
        .query_payments(a, PaymentBound::GreaterThan(u64::MAX), SortOrder::Ascending, 1)
        .await
        .unwrap();
    assert!(edge.is_empty());

    let empty = store
        .query_payments(a, PaymentBound::LessThan(0), SortOrder::Ascending, 1)
        .await
        .unwrap();
    assert!(empty.is_empty());
}

async fn payment_neighbors_reports_adjacent_entries<S: CounterStore>(store: Arc<S>) {
    let a = account(9);

    assert_eq!(
        store.payment_neighbors(a, 15).await.unwrap(),
        PaymentNeighbors::default()
    );

    store
        .insert_payment(LedgerKey::new(a, 10), 5)
        .await
        .unwrap();
    store
        .insert_payment(LedgerKey::new(a, 30), 8)
        .await
        .unwrap();

    let mid = store.payment_neighbors(a, 20).await.unwrap();
    assert_eq!(
        mid,
        PaymentNeighbors {
            prev_payment: 10,
            next: Some(record(30, 8)),
        }
    );

    let last = store.payment_neighbors(a, 31).await.unwrap();
    assert_eq!(
        last,
        PaymentNeighbors {
            prev_payment: 30,
            next: None,
        }
    );

    let first = store.payment_neighbors(a, 5).await.unwrap();
    assert_eq!(
        first,
        PaymentNeighbors {
            prev_payment: 0,
            next: Some(record(10, 5)),
        }
    );
}

async fn reservation_bins_lists_one_account<S: CounterStore>(store: Arc<S>) {
    let a = account(10);
    let b = account(11);

    assert!(store.reservation_bins(a).await.unwrap().is_empty());

    store
        .increment(CounterKey::reservation(a, 7), 30)
        .await
        .unwrap();
    store
        .increment(CounterKey::reservation(a, 2), 10)
        .await
        .unwrap();
    store
        .increment(CounterKey::reservation(a, 7), 5)
        .await
        .unwrap();
    store
        .increment(CounterKey::reservation(b, 3), 99)
        .await
        .unwrap();
    store.increment(CounterKey::global(2), 1).await.unwrap();

    assert_eq!(
        store.reservation_bins(a).await.unwrap(),
        vec![
            BinUsage { bin: 2, usage: 10 },
            BinUsage { bin: 7, usage: 35 },
        ]
    );
    assert_eq!(
        store.reservation_bins(b).await.unwrap(),
        vec![BinUsage { bin: 3, usage: 99 }]
    );
}

macro_rules! conformance_suite {
    ($backend:ident, $make:expr) => {
        mod $backend {
            use super::*;

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn increment_returns_running_total() {
                let (store, _guard) = $make;
                super::increment_returns_running_total(store).await;
            }

            #[tokio::test]
            async fn counters_saturate() {
                let (store, _guard) = $make;
                super::counters_saturate(store).await;
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn concurrent_increments_are_not_lost() {
                let (store, _guard) = $make;
                super::concurrent_increments_are_not_lost(store).await;
            }

            #[tokio::test]
            async fn insert_payment_is_conditional() {
                let (store, _guard) = $make;
                super::insert_payment_is_conditional(store).await;
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn concurrent_inserts_have_one_winner() {
                let (store, _guard) = $make;
                super::concurrent_inserts_have_one_winner(store).await;
            }

            #[tokio::test]
            async fn remove_payment_is_idempotent() {
                let (store, _guard) = $make;
                super::remove_payment_is_idempotent(store).await;
            }

            #[tokio::test]
            async fn query_payments_orders_and_bounds() {
                let (store, _guard) = $make;
                super::query_payments_orders_and_bounds(store).await;
            }

            #[tokio::test]
            async fn payment_neighbors_reports_adjacent_entries() {
                let (store, _guard) = $make;
                super::payment_neighbors_reports_adjacent_entries(store).await;
            }

            #[tokio::test]
            async fn reservation_bins_lists_one_account() {
                let (store, _guard) = $make;
                super::reservation_bins_lists_one_account(store).await;
            }
        }
    };
}

fn memory_store() -> (Arc<MemoryCounterStore>, ()) {
    (Arc::new(MemoryCounterStore::new()), ())
}

fn redb_store() -> (Arc<RedbCounterStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = RedbCounterStore::open(dir.path().join("counters.redb")).unwrap();
    (Arc::new(store), dir)
}

conformance_suite!(memory, memory_store());
conformance_suite!(redb, redb_store());

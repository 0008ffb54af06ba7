//! On-demand payment ledger and global rate limit.

use std::sync::Arc;

use tollgate_primitives::{
    BlobHeader, ON_DEMAND_QUORUMS, OnDemandPayment, PaymentMode,
    bin::{bin_index, within_window},
};
use tollgate_store::{CounterKey, CounterStore, Insertion, LedgerKey};
use tracing::{debug, trace, warn};

use crate::{
    Admission, BinIndexReason, Clock, GLOBAL_BIN_SECS, MeterError, MeterResult,
    PaymentOrderingError, chargeable_size, metrics::MeterMetrics,
};

/// Admits on-demand requests.
///
/// Each request records its cumulative payment in the account's ledger
/// before the payment is checked against its neighbours, so concurrent
/// requests for one account see each other. Any rejection after that point
/// deletes the entry again.
pub struct OnDemandLimiter<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    price_per_byte: u64,
    global_bytes_per_second: u64,
    min_chargeable_size: u64,
    validate_quorums: bool,
    metrics: MeterMetrics,
}

impl<S> std::fmt::Debug for OnDemandLimiter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnDemandLimiter")
            .field("price_per_byte", &self.price_per_byte)
            .field("global_bytes_per_second", &self.global_bytes_per_second)
            .field("min_chargeable_size", &self.min_chargeable_size)
            .field("validate_quorums", &self.validate_quorums)
            .finish_non_exhaustive()
    }
}

impl<S: CounterStore> OnDemandLimiter<S> {
    /// Create a limiter charging `price_per_byte` and admitting at most
    /// `global_bytes_per_second` across all accounts.
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        price_per_byte: u64,
        global_bytes_per_second: u64,
    ) -> Self {
        Self {
            store,
            clock,
            price_per_byte,
            global_bytes_per_second,
            min_chargeable_size: 0,
            validate_quorums: false,
            metrics: MeterMetrics::default(),
        }
    }

    /// Charge at least `size` bytes per request.
    pub fn with_min_chargeable_size(mut self, size: u64) -> Self {
        self.min_chargeable_size = size;
        self
    }

    /// Only admit the on-demand quorums.
    pub fn with_quorum_validation(mut self, enabled: bool) -> Self {
        self.validate_quorums = enabled;
        self
    }

    /// The global bin containing the current time.
    pub fn current_bin(&self) -> u64 {
        bin_index(self.clock.unix_seconds(), GLOBAL_BIN_SECS)
    }

    /// Admit `header` against the account's on-chain `deposit`.
    pub async fn admit(
        &self,
        header: &BlobHeader,
        deposit: &OnDemandPayment,
    ) -> MeterResult<Admission> {
        let account = header.account_id;
        let payment = header.cumulative_payment;

        if self.validate_quorums {
            validate_quorums(header)?;
        }
        if payment > deposit.cumulative_payment {
            return Err(PaymentOrderingError::ExceedsDeposit {
                cumulative_payment: payment,
                deposit: deposit.cumulative_payment,
            }
            .into());
        }

        let charged = chargeable_size(header.blob_size, self.min_chargeable_size);
        let key = LedgerKey::new(account, payment);
        if self.store.insert_payment(key, charged).await? == Insertion::AlreadyExists {
            debug!(%account, payment, "duplicate on-demand payment");
            return Err(PaymentOrderingError::Duplicate {
                cumulative_payment: payment,
            }
            .into());
        }
        trace!(%account, payment, charged, "recorded on-demand payment");

        let current = self.current_bin();
        match self.check_and_count(header, key, charged, current).await {
            Ok(usage) => Ok(Admission {
                mode: PaymentMode::OnDemand,
                charged,
                bin_index: current,
                bin_usage: usage,
                overflow: None,
            }),
            Err(err) => Err(self.rollback_payment(key, err).await),
        }
    }

    /// Validate the payment against its ledger neighbours, then count it
    /// against the global bin `current`. Returns the new global usage.
    async fn check_and_count(
        &self,
        header: &BlobHeader,
        key: LedgerKey,
        charged: u64,
        current: u64,
    ) -> MeterResult<u64> {
        let payment = key.cumulative_payment;
        let neighbors = self.store.payment_neighbors(key.account, payment).await?;

        let cost = charged.saturating_mul(self.price_per_byte);
        if neighbors.prev_payment.saturating_add(cost) > payment {
            return Err(PaymentOrderingError::InsufficientIncrement {
                cumulative_payment: payment,
                prev_payment: neighbors.prev_payment,
                cost,
            }
            .into());
        }

        if let Some(next) = neighbors.next {
            let next_cost = next.data_length.saturating_mul(self.price_per_byte);
            if payment.saturating_add(next_cost) > next.cumulative_payment {
                return Err(PaymentOrderingError::BreaksNextMargin {
                    cumulative_payment: payment,
                    next_payment: next.cumulative_payment,
                    next_cost,
                }
                .into());
            }
        }

        if !within_window(header.bin_index, current) {
            return Err(MeterError::InvalidBinIndex {
                bin_index: header.bin_index,
                reason: BinIndexReason::OutsideGlobalWindow { current },
            });
        }

        let usage = self
            .store
            .increment(CounterKey::global(current), charged)
            .await?;
        if usage > self.global_bytes_per_second {
            return Err(MeterError::GlobalRateLimit {
                usage,
                limit: self.global_bytes_per_second,
            });
        }
        Ok(usage)
    }

    /// Delete the ledger entry of a rejected request. A failed delete is
    /// logged and does not replace `err`.
    async fn rollback_payment(&self, key: LedgerKey, err: MeterError) -> MeterError {
        debug!(
            account = %key.account,
            payment = key.cumulative_payment,
            reason = err.reason(),
            "rolling back on-demand payment"
        );
        self.metrics.inc_rollbacks();
        if let Err(e) = self.store.remove_payment(key).await {
            warn!(
                account = %key.account,
                payment = key.cumulative_payment,
                error = %e,
                "failed to roll back on-demand payment"
            );
            self.metrics.inc_rollback_failures();
        }
        err
    }
}

fn validate_quorums(header: &BlobHeader) -> MeterResult<()> {
    if header.quorum_params.is_empty() {
        return Err(MeterError::InvalidQuorum { quorum: None });
    }
    match header.quorum_numbers().find(|q| !ON_DEMAND_QUORUMS.contains(q)) {
        Some(quorum) => Err(MeterError::InvalidQuorum {
            quorum: Some(quorum),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tollgate_primitives::{AccountId, QuorumParam};
    use tollgate_store::MemoryCounterStore;

    use crate::ManualClock;

    const NOW: u64 = 1_700_000_000;

    fn account() -> AccountId {
        AccountId::repeat_byte(0xbb)
    }

    fn setup(global: u64) -> (Arc<MemoryCounterStore>, OnDemandLimiter<MemoryCounterStore>) {
        let store = Arc::new(MemoryCounterStore::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let limiter = OnDemandLimiter::new(store.clone(), clock, 1, global);
        (store, limiter)
    }

    fn header(cumulative_payment: u64, blob_size: u64) -> BlobHeader {
        BlobHeader {
            account_id: account(),
            bin_index: NOW,
            cumulative_payment,
            blob_size,
            quorum_params: vec![QuorumParam {
                quorum_id: 1,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn deposit() -> OnDemandPayment {
        OnDemandPayment {
            cumulative_payment: 1_000_000,
        }
    }

    async fn recorded(store: &MemoryCounterStore, payment: u64) -> Option<u64> {
        store
            .payment(LedgerKey::new(account(), payment))
            .await
            .unwrap()
    }

    /// Ledger `{10: 5, 30: 5}`.
    async fn seeded() -> (Arc<MemoryCounterStore>, OnDemandLimiter<MemoryCounterStore>) {
        let (store, limiter) = setup(1_000);
        limiter.admit(&header(10, 5), &deposit()).await.unwrap();
        limiter.admit(&header(30, 5), &deposit()).await.unwrap();
        (store, limiter)
    }

    #[tokio::test]
    async fn test_payment_between_neighbours_accepted() {
        let (store, limiter) = seeded().await;

        let admission = limiter.admit(&header(20, 5), &deposit()).await.unwrap();
        assert_eq!(admission.mode, PaymentMode::OnDemand);
        assert_eq!(admission.bin_index, NOW);
        assert_eq!(admission.bin_usage, 15);
        assert_eq!(recorded(&store, 20).await, Some(5));
    }

    #[tokio::test]
    async fn test_insufficient_increment_rejected() {
        let (store, limiter) = seeded().await;

        assert_matches!(
            limiter.admit(&header(20, 12), &deposit()).await,
            Err(MeterError::PaymentOrdering(PaymentOrderingError::InsufficientIncrement {
                prev_payment: 10,
                cost: 12,
                ..
            }))
        );
        assert_eq!(recorded(&store, 20).await, None);
    }

    #[tokio::test]
    async fn test_next_margin_rejected() {
        let (store, limiter) = seeded().await;

        assert_matches!(
            limiter.admit(&header(26, 5), &deposit()).await,
            Err(MeterError::PaymentOrdering(PaymentOrderingError::BreaksNextMargin {
                next_payment: 30,
                ..
            }))
        );
        assert_eq!(recorded(&store, 26).await, None);
    }

    #[tokio::test]
    async fn test_duplicate_payment_rejected() {
        let (store, limiter) = seeded().await;

        assert_matches!(
            limiter.admit(&header(30, 1), &deposit()).await,
            Err(MeterError::PaymentOrdering(PaymentOrderingError::Duplicate {
                cumulative_payment: 30
            }))
        );
        // The original entry survives.
        assert_eq!(recorded(&store, 30).await, Some(5));
    }

    #[tokio::test]
    async fn test_first_payment_must_cover_itself() {
        let (store, limiter) = setup(1_000);

        assert_matches!(
            limiter.admit(&header(4, 5), &deposit()).await,
            Err(MeterError::PaymentOrdering(PaymentOrderingError::InsufficientIncrement {
                prev_payment: 0,
                ..
            }))
        );
        assert_eq!(store.payment_count(), 0);
        limiter.admit(&header(5, 5), &deposit()).await.unwrap();
    }

    #[tokio::test]
    async fn test_exceeds_deposit_writes_nothing() {
        let (store, limiter) = setup(1_000);

        assert_matches!(
            limiter.admit(&header(101, 5), &OnDemandPayment { cumulative_payment: 100 }).await,
            Err(MeterError::PaymentOrdering(PaymentOrderingError::ExceedsDeposit {
                cumulative_payment: 101,
                deposit: 100
            }))
        );
        assert_eq!(store.payment_count(), 0);
        assert_eq!(store.counter_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_global_bin_rolls_back() {
        let (store, limiter) = setup(1_000);

        let mut request = header(10, 5);
        request.bin_index = NOW - 2;
        assert_matches!(
            limiter.admit(&request, &deposit()).await,
            Err(MeterError::InvalidBinIndex {
                reason: BinIndexReason::OutsideGlobalWindow { current: NOW },
                ..
            })
        );
        assert_eq!(store.payment_count(), 0);
        assert_eq!(store.counter_count(), 0);

        request.bin_index = NOW - 1;
        limiter.admit(&request, &deposit()).await.unwrap();
        assert_eq!(store.payment_count(), 1);
    }

    #[tokio::test]
    async fn test_late_replay_is_duplicate() {
        let store = Arc::new(MemoryCounterStore::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let limiter = OnDemandLimiter::new(store.clone(), clock.clone(), 1, 1_000);
        let request = header(10, 5);

        limiter.admit(&request, &deposit()).await.unwrap();
        clock.set(NOW + 5);

        assert_matches!(
            limiter.admit(&request, &deposit()).await,
            Err(MeterError::PaymentOrdering(PaymentOrderingError::Duplicate {
                cumulative_payment: 10
            }))
        );
        assert_eq!(recorded(&store, 10).await, Some(5));
    }

    #[tokio::test]
    async fn test_global_limit_rolls_back_ledger() {
        let (store, limiter) = setup(10);

        limiter.admit(&header(10, 10), &deposit()).await.unwrap();
        assert_matches!(
            limiter.admit(&header(20, 1), &deposit()).await,
            Err(MeterError::GlobalRateLimit { usage: 11, limit: 10 })
        );
        assert_eq!(recorded(&store, 20).await, None);
    }

    #[tokio::test]
    async fn test_price_scales_cost() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter =
            OnDemandLimiter::new(store.clone(), Arc::new(ManualClock::new(NOW)), 3, 1_000);

        assert_matches!(
            limiter.admit(&header(14, 5), &deposit()).await,
            Err(MeterError::PaymentOrdering(PaymentOrderingError::InsufficientIncrement {
                cost: 15,
                ..
            }))
        );
        limiter.admit(&header(15, 5), &deposit()).await.unwrap();
    }

    #[tokio::test]
    async fn test_quorum_validation() {
        let (_, limiter) = setup(1_000);
        let limiter = limiter.with_quorum_validation(true);

        let mut request = header(10, 5);
        request.quorum_params.push(QuorumParam {
            quorum_id: 2,
            ..Default::default()
        });
        assert_matches!(
            limiter.admit(&request, &deposit()).await,
            Err(MeterError::InvalidQuorum { quorum: Some(2) })
        );

        limiter.admit(&header(10, 5), &deposit()).await.unwrap();
    }
}

//! Reservation bin accounting.

use std::{sync::Arc, time::Duration};

use tollgate_primitives::{
    BlobHeader, PaymentMode, Reservation,
    bin::{bin_index, overflow_bin, within_window},
};
use tollgate_store::{CounterKey, CounterStore};
use tracing::{debug, trace, warn};

use crate::{
    Admission, BinIndexReason, Clock, MeterError, MeterResult, OverflowCredit, OverflowReason,
    chargeable_size, metrics::MeterMetrics,
};

/// Admits reservation requests against per-account bin capacity.
///
/// Usage is incremented before it is judged. A request that crosses the
/// bin's `data_rate` may move its excess two bins ahead, as long as the
/// total stays within twice the rate and the reservation is still valid
/// there.
pub struct ReservationLimiter<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    window_secs: u64,
    min_chargeable_size: u64,
    validate_quorums: bool,
    rollback_overflow: bool,
    metrics: MeterMetrics,
}

impl<S> std::fmt::Debug for ReservationLimiter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationLimiter")
            .field("window_secs", &self.window_secs)
            .field("min_chargeable_size", &self.min_chargeable_size)
            .field("validate_quorums", &self.validate_quorums)
            .field("rollback_overflow", &self.rollback_overflow)
            .finish_non_exhaustive()
    }
}

impl<S: CounterStore> ReservationLimiter<S> {
    /// Create a limiter with bins of length `window`.
    ///
    /// Bins are whole seconds; `window` is truncated and never shorter than
    /// one second.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            store,
            clock,
            window_secs: window.as_secs().max(1),
            min_chargeable_size: 0,
            validate_quorums: false,
            rollback_overflow: false,
            metrics: MeterMetrics::default(),
        }
    }

    /// Charge at least `size` bytes per request.
    pub fn with_min_chargeable_size(mut self, size: u64) -> Self {
        self.min_chargeable_size = size;
        self
    }

    /// Only admit quorums the reservation pays for.
    pub fn with_quorum_validation(mut self, enabled: bool) -> Self {
        self.validate_quorums = enabled;
        self
    }

    /// Undo the increment of requests rejected for overflow.
    pub fn with_overflow_rollback(mut self, enabled: bool) -> Self {
        self.rollback_overflow = enabled;
        self
    }

    /// The reservation bin containing the current time.
    pub fn current_bin(&self) -> u64 {
        bin_index(self.clock.unix_seconds(), self.window_secs)
    }

    /// Admit `header` against `reservation`.
    pub async fn admit(
        &self,
        header: &BlobHeader,
        reservation: &Reservation,
    ) -> MeterResult<Admission> {
        let bin = header.bin_index;
        self.validate_bin(bin, reservation)?;
        if self.validate_quorums {
            validate_quorums(header, reservation)?;
        }

        let charged = chargeable_size(header.blob_size, self.min_chargeable_size);
        let limit = reservation.data_rate;
        let key = CounterKey::reservation(header.account_id, bin);
        let usage = self.store.increment(key, charged).await?;
        trace!(
            account = %header.account_id,
            bin,
            charged,
            usage,
            limit,
            "reservation bin incremented"
        );

        let admission = Admission {
            mode: PaymentMode::Reservation,
            charged,
            bin_index: bin,
            bin_usage: usage,
            overflow: None,
        };

        if usage <= limit {
            return Ok(admission);
        }

        if usage.saturating_sub(charged) >= limit {
            debug!(account = %header.account_id, bin, usage, limit, "reservation bin already full");
            let reason = OverflowReason::AlreadyFull { usage, limit };
            return Err(self.reject_overflow(key, charged, reason).await);
        }

        let target = overflow_bin(bin).filter(|target| *target <= reservation.end_epoch);
        match target {
            Some(target) if usage <= limit.saturating_mul(2) => {
                let amount = usage - limit;
                self.credit_overflow(key, charged, header, target, amount)
                    .await?;
                self.metrics.record_overflow(amount);
                debug!(
                    account = %header.account_id,
                    bin,
                    target,
                    amount,
                    "overflow moved to later bin"
                );
                let overflow = Some(OverflowCredit {
                    bin_index: target,
                    amount,
                });
                Ok(Admission {
                    overflow,
                    ..admission
                })
            }
            _ => {
                debug!(
                    account = %header.account_id,
                    bin,
                    usage,
                    limit,
                    "overflow exceeds bin limit"
                );
                let reason = OverflowReason::ExceedsLimit { usage, limit };
                Err(self.reject_overflow(key, charged, reason).await)
            }
        }
    }

    fn validate_bin(&self, bin: u64, reservation: &Reservation) -> MeterResult<()> {
        let current = self.current_bin();
        if !within_window(bin, current) {
            return Err(MeterError::InvalidBinIndex {
                bin_index: bin,
                reason: BinIndexReason::OutsideWindow { current },
            });
        }
        if !reservation.covers(bin) {
            return Err(MeterError::InvalidBinIndex {
                bin_index: bin,
                reason: BinIndexReason::OutsideReservation {
                    start: reservation.start_epoch,
                    end: reservation.end_epoch,
                },
            });
        }
        Ok(())
    }

    /// Add `amount` to bin `target`. On failure the request's own increment
    /// is taken back and the store error returned.
    async fn credit_overflow(
        &self,
        key: CounterKey,
        charged: u64,
        header: &BlobHeader,
        target: u64,
        amount: u64,
    ) -> MeterResult<()> {
        let target_key = CounterKey::reservation(header.account_id, target);
        if let Err(e) = self.store.increment(target_key, amount).await {
            warn!(
                account = %header.account_id,
                target,
                error = %e,
                "failed to credit overflow bin"
            );
            self.undo_increment(key, charged).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn reject_overflow(
        &self,
        key: CounterKey,
        charged: u64,
        reason: OverflowReason,
    ) -> MeterError {
        if self.rollback_overflow {
            self.undo_increment(key, charged).await;
        }
        reason.into()
    }

    async fn undo_increment(&self, key: CounterKey, charged: u64) {
        self.metrics.inc_rollbacks();
        if let Err(e) = self.store.decrement(key, charged).await {
            warn!(?key, charged, error = %e, "failed to roll back reservation bin increment");
            self.metrics.inc_rollback_failures();
        }
    }
}

fn validate_quorums(header: &BlobHeader, reservation: &Reservation) -> MeterResult<()> {
    if header.quorum_params.is_empty() {
        return Err(MeterError::InvalidQuorum { quorum: None });
    }
    match header.quorum_numbers().find(|q| !reservation.allows_quorum(*q)) {
        Some(quorum) => Err(MeterError::InvalidQuorum {
            quorum: Some(quorum),
        }),
        None => Ok(()),
    }
}

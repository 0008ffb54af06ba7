//! Request metering entry point.

use std::sync::Arc;

use tollgate_chainstate::{FixedReferenceBlock, PaymentChainState, ReferenceBlockSource};
use tollgate_primitives::{BlobHeader, PaymentMode};
use tollgate_signer::HeaderVerifier;
use tollgate_store::CounterStore;
use tracing::{debug, trace};

use crate::{
    Clock, MeterError, MeterResult, MeteringConfig, OnDemandLimiter, ReservationLimiter,
    SystemClock, metrics::MeterMetrics,
};

/// Usage moved to a later reservation bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowCredit {
    /// Bin the overflow was charged to.
    pub bin_index: u64,
    /// Bytes charged there.
    pub amount: u64,
}

/// Receipt for an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Path the request was metered on.
    pub mode: PaymentMode,
    /// Bytes counted against the payment.
    pub charged: u64,
    /// Reservation bin (reservation mode) or global bin (on-demand mode)
    /// the request was counted in.
    pub bin_index: u64,
    /// Usage of that bin including this request.
    pub bin_usage: u64,
    /// Overflow moved to a later bin, reservation mode only.
    pub overflow: Option<OverflowCredit>,
}

/// Meters signed requests against chain-state payment terms.
///
/// Holds no counters itself: every decision is made on values read back
/// from the [`CounterStore`], so any number of meterers may share one store.
pub struct Meterer<S, P> {
    verifier: HeaderVerifier,
    chain_state: P,
    blocks: Arc<dyn ReferenceBlockSource>,
    reservations: ReservationLimiter<S>,
    on_demand: OnDemandLimiter<S>,
    metrics: MeterMetrics,
}

impl<S, P> std::fmt::Debug for Meterer<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meterer")
            .field("verifier", &self.verifier)
            .field("reservations", &self.reservations)
            .field("on_demand", &self.on_demand)
            .finish_non_exhaustive()
    }
}

impl<S, P> Meterer<S, P>
where
    S: CounterStore,
    P: PaymentChainState,
{
    /// Create a meterer reading the system clock.
    pub fn new<C: MeteringConfig>(config: &C, store: Arc<S>, chain_state: P) -> Self {
        Self::with_clock(config, store, chain_state, Arc::new(SystemClock))
    }

    /// Create a meterer reading `clock`.
    ///
    /// Chain state is read at block `0` until
    /// [`with_reference_blocks`](Self::with_reference_blocks) says otherwise.
    pub fn with_clock<C: MeteringConfig>(
        config: &C,
        store: Arc<S>,
        chain_state: P,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reservations =
            ReservationLimiter::new(store.clone(), clock.clone(), config.reservation_window())
                .with_min_chargeable_size(config.min_chargeable_size())
                .with_quorum_validation(config.validate_quorums())
                .with_overflow_rollback(config.rollback_reservation_overflow());
        let on_demand = OnDemandLimiter::new(
            store,
            clock,
            config.price_per_byte(),
            config.global_bytes_per_second(),
        )
        .with_min_chargeable_size(config.min_chargeable_size())
        .with_quorum_validation(config.validate_quorums());

        Self {
            verifier: HeaderVerifier::new(config.signing_domain()),
            chain_state,
            blocks: Arc::new(FixedReferenceBlock::default()),
            reservations,
            on_demand,
            metrics: MeterMetrics::default(),
        }
    }

    /// Read chain state at the blocks chosen by `blocks`.
    pub fn with_reference_blocks(mut self, blocks: impl ReferenceBlockSource + 'static) -> Self {
        self.blocks = Arc::new(blocks);
        self
    }

    /// The signature verifier in use.
    pub fn verifier(&self) -> &HeaderVerifier {
        &self.verifier
    }

    /// The reservation limiter in use.
    pub fn reservations(&self) -> &ReservationLimiter<S> {
        &self.reservations
    }

    /// The on-demand limiter in use.
    pub fn on_demand(&self) -> &OnDemandLimiter<S> {
        &self.on_demand
    }

    /// Decide whether `header` may be dispersed, counting it if so.
    ///
    /// A zero cumulative payment is metered against the account's
    /// reservation, anything else against its on-demand deposit.
    pub async fn meter_request(&self, header: &BlobHeader) -> MeterResult<Admission> {
        self.metrics.inc_requests();

        match self.dispatch(header).await {
            Ok(admission) => {
                trace!(
                    account = %header.account_id,
                    mode = %admission.mode,
                    charged = admission.charged,
                    bin = admission.bin_index,
                    usage = admission.bin_usage,
                    "request admitted"
                );
                self.metrics.record_admitted(admission.mode);
                Ok(admission)
            }
            Err(err) => {
                debug!(
                    account = %header.account_id,
                    reason = err.reason(),
                    %err,
                    "request rejected"
                );
                self.metrics.record_rejected(err.reason());
                Err(err)
            }
        }
    }

    async fn dispatch(&self, header: &BlobHeader) -> MeterResult<Admission> {
        self.verifier.verify(header)?;

        let account = header.account_id;
        let block = self.blocks.reference_block().await?;

        match header.payment_mode() {
            mode @ PaymentMode::Reservation => {
                let reservation = self
                    .chain_state
                    .active_reservation(&account, block)
                    .await?
                    .ok_or(MeterError::AccountNotFound { account, mode })?;
                self.reservations.admit(header, &reservation).await
            }
            mode @ PaymentMode::OnDemand => {
                let deposit = self
                    .chain_state
                    .on_demand_payment(&account, block)
                    .await?
                    .ok_or(MeterError::AccountNotFound { account, mode })?;
                self.on_demand.admit(header, &deposit).await
            }
        }
    }
}

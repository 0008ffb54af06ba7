//! Meterer metrics

use metrics::Counter;
use tollgate_primitives::PaymentMode;

/// Meterer metrics
#[derive(Clone, Debug)]
pub(crate) struct MeterMetrics {
    /// Number of requests presented for metering
    requests_total: Counter,
    /// Number of reservation requests whose overflow moved to a later bin
    overflow_forgiven_total: Counter,
    /// Bytes credited to later bins as overflow
    overflow_bytes_total: Counter,
    /// Number of compensating writes attempted
    rollbacks_total: Counter,
    /// Number of compensating writes that failed
    rollback_failures_total: Counter,
}

impl Default for MeterMetrics {
    fn default() -> Self {
        Self {
            requests_total: metrics::counter!("meterer.requests_total"),
            overflow_forgiven_total: metrics::counter!("meterer.overflow_forgiven_total"),
            overflow_bytes_total: metrics::counter!("meterer.overflow_bytes_total"),
            rollbacks_total: metrics::counter!("meterer.rollbacks_total"),
            rollback_failures_total: metrics::counter!("meterer.rollback_failures_total"),
        }
    }
}

impl MeterMetrics {
    pub(crate) fn inc_requests(&self) {
        self.requests_total.increment(1);
    }

    pub(crate) fn record_admitted(&self, mode: PaymentMode) {
        let mode: &'static str = mode.into();
        metrics::counter!("meterer.admitted_total", "mode" => mode).increment(1);
    }

    pub(crate) fn record_rejected(&self, reason: &'static str) {
        metrics::counter!("meterer.rejected_total", "reason" => reason).increment(1);
    }

    pub(crate) fn record_overflow(&self, bytes: u64) {
        self.overflow_forgiven_total.increment(1);
        self.overflow_bytes_total.increment(bytes);
    }

    pub(crate) fn inc_rollbacks(&self) {
        self.rollbacks_total.increment(1);
    }

    pub(crate) fn inc_rollback_failures(&self) {
        self.rollback_failures_total.increment(1);
    }
}

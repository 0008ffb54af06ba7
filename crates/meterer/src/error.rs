//! Rejection reasons.

use tollgate_chainstate::ChainStateError;
use tollgate_primitives::{AccountId, PaymentMode};
use tollgate_signer::SignatureError;
use tollgate_store::StoreError;

/// Why a request was not admitted.
///
/// Every variant is a declined admission reported to the caller. `Store`
/// and `ChainState` wrap collaborator failures and are never retried here.
#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum MeterError {
    /// Signature malformed or not made by the claimed account.
    #[error("invalid signature: {0}")]
    Signature(#[from] SignatureError),

    /// No reservation (reservation mode) or deposit (on-demand mode).
    #[error("{} for account {account}", missing_terms(.mode))]
    AccountNotFound {
        account: AccountId,
        mode: PaymentMode,
    },

    /// Declared bin is outside the accepted window.
    #[error("invalid bin index {bin_index}: {reason}")]
    InvalidBinIndex {
        bin_index: u64,
        reason: BinIndexReason,
    },

    /// Reservation bin capacity exceeded.
    #[error(transparent)]
    BinOverflow(#[from] OverflowReason),

    /// Cumulative payment does not fit the account's ledger.
    #[error(transparent)]
    PaymentOrdering(#[from] PaymentOrderingError),

    /// Aggregate on-demand throughput for the current second exceeded.
    #[error("global rate limit exceeded: {usage} bytes in bin, limit {limit}")]
    GlobalRateLimit { usage: u64, limit: u64 },

    /// Requested quorum not covered by the payment, or none requested.
    #[error("{}", invalid_quorum(.quorum))]
    InvalidQuorum { quorum: Option<u8> },

    /// Counter store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Chain-state provider failure.
    #[error("chain state error: {0}")]
    ChainState(#[from] ChainStateError),
}

impl MeterError {
    /// Stable snake_case label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        self.into()
    }
}

fn missing_terms(mode: &PaymentMode) -> &'static str {
    match mode {
        PaymentMode::Reservation => "no active reservation",
        PaymentMode::OnDemand => "no on-demand balance",
    }
}

fn invalid_quorum(quorum: &Option<u8>) -> String {
    match quorum {
        Some(q) => format!("quorum {q} is not covered by the payment"),
        None => "request names no quorum".to_string(),
    }
}

/// Detail for [`MeterError::InvalidBinIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BinIndexReason {
    /// Not the current or previous reservation bin.
    #[error("current reservation bin is {current}")]
    OutsideWindow { current: u64 },

    /// Outside the reservation's inclusive epoch range.
    #[error("reservation covers bins {start}..={end}")]
    OutsideReservation { start: u64, end: u64 },

    /// Not the current or previous global (one second) bin.
    #[error("current global bin is {current}")]
    OutsideGlobalWindow { current: u64 },
}

/// Detail for [`MeterError::BinOverflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OverflowReason {
    /// The bin was full before this request.
    #[error("bin already overflowed: usage {usage}, limit {limit}")]
    AlreadyFull { usage: u64, limit: u64 },

    /// The overflow is beyond twice the limit, or the reservation ends
    /// before the bin that would absorb it.
    #[error("overflow exceeds bin limit: usage {usage}, limit {limit}")]
    ExceedsLimit { usage: u64, limit: u64 },
}

/// Detail for [`MeterError::PaymentOrdering`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaymentOrderingError {
    /// The exact cumulative payment is already recorded for the account.
    #[error("duplicate payment {cumulative_payment}")]
    Duplicate { cumulative_payment: u64 },

    /// Not enough above the previous payment to cover this request.
    #[error(
        "insufficient cumulative payment increment: {cumulative_payment} < {prev_payment} + {cost}"
    )]
    InsufficientIncrement {
        cumulative_payment: u64,
        prev_payment: u64,
        cost: u64,
    },

    /// Leaves too little room below the next payment for its own charge.
    #[error("breaks next payment's margin: {cumulative_payment} + {next_cost} > {next_payment}")]
    BreaksNextMargin {
        cumulative_payment: u64,
        next_payment: u64,
        next_cost: u64,
    },

    /// Claims more than the account has deposited on chain.
    #[error("cumulative payment {cumulative_payment} exceeds deposit {deposit}")]
    ExceedsDeposit {
        cumulative_payment: u64,
        deposit: u64,
    },
}

/// Result type for metering operations.
pub type MeterResult<T> = Result<T, MeterError>;

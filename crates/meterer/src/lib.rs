//! Payment metering and admission control for blob dispersal.
//!
//! Before a blob is dispersed its signed [`BlobHeader`] is metered: the
//! signature is checked, the account's payment terms are read from chain
//! state, and the blob is counted against either
//!
//! - a **reservation**: a per-account byte budget per time bin, with one
//!   bounded burst allowed to spill two bins ahead ([`ReservationLimiter`])
//! - an **on-demand deposit**: a monotonically increasing cumulative payment
//!   recorded in a per-account ledger, subject to a global bytes-per-second
//!   cap ([`OnDemandLimiter`])
//!
//! [`Meterer`] ties these together. All mutable state lives in a
//! [`CounterStore`](tollgate_store::CounterStore).
//!
//! # Configuration
//!
//! Policy is read through [`MeteringConfig`]. [`DefaultMeteringConfig`]
//! carries the defaults; [`MeteringArgs`] exposes the same knobs as CLI
//! flags under `--metering.*`.
//!
//! # Metrics
//!
//! Counters are registered with the `metrics` facade under `meterer.*`;
//! installing a recorder is up to the embedding process.
//!
//! [`BlobHeader`]: tollgate_primitives::BlobHeader

mod args;
mod clock;
mod config;
mod constants;
mod error;
mod meterer;
mod metrics;
mod on_demand;
mod reservation;

pub use args::MeteringArgs;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DefaultMeteringConfig, MeteringConfig};
pub use constants::GLOBAL_BIN_SECS;
pub use error::{BinIndexReason, MeterError, MeterResult, OverflowReason, PaymentOrderingError};
pub use meterer::{Admission, Meterer, OverflowCredit};
pub use on_demand::OnDemandLimiter;
pub use reservation::ReservationLimiter;

/// Bytes a request of `blob_size` is charged for.
pub(crate) const fn chargeable_size(blob_size: u64, min_chargeable_size: u64) -> u64 {
    if blob_size < min_chargeable_size {
        min_chargeable_size
    } else {
        blob_size
    }
}

//! Core data model for payment metering.
//!
//! A blob submission carries a [`BlobHeader`] declaring how it pays: a zero
//! cumulative payment selects the account's pre-purchased [`Reservation`], a
//! non-zero one selects pay-per-byte [`OnDemandPayment`]. Usage is counted in
//! fixed-length time windows called bins (see [`bin`]).
//!
//! This crate is kept free of storage and signing concerns so every other
//! crate in the workspace can depend on it.

mod header;
mod reservation;

pub mod bin;

pub use header::{BlobHeader, QuorumParam};
pub use reservation::{OnDemandPayment, Reservation};

pub use alloy_primitives::{Address, Bytes};

/// Account identifier: the 20-byte address that signs requests.
pub type AccountId = Address;

/// Block number used as the chain-state reference point.
pub type BlockNumber = u64;

/// Quorums on-demand traffic may disperse to.
pub const ON_DEMAND_QUORUMS: [u8; 2] = [0, 1];

/// Payment mode selected by a request's cumulative payment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMode {
    /// Charged against a pre-purchased bandwidth reservation.
    Reservation,
    /// Charged against a monotonically increasing cumulative payment.
    OnDemand,
}

impl PaymentMode {
    /// Mode selected by a cumulative payment value (`0` means reservation).
    pub const fn from_cumulative_payment(cumulative_payment: u64) -> Self {
        if cumulative_payment == 0 {
            Self::Reservation
        } else {
            Self::OnDemand
        }
    }
}

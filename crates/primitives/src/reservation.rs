//! Payment terms sourced from chain state.

/// Pre-purchased bandwidth for one account.
///
/// `start_epoch` and `end_epoch` are inclusive reservation-bin indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Reservation {
    /// Bytes the account may charge per reservation bin.
    pub data_rate: u64,
    /// First bin the reservation is valid for.
    pub start_epoch: u64,
    /// Last bin the reservation is valid for.
    pub end_epoch: u64,
    /// Quorums the reservation pays for.
    pub quorum_numbers: Vec<u8>,
    /// Percentage split of `data_rate` across `quorum_numbers`.
    pub quorum_split: Vec<u8>,
}

impl Reservation {
    /// Whether `bin_index` lies within the reservation's validity range.
    pub const fn covers(&self, bin_index: u64) -> bool {
        self.start_epoch <= bin_index && bin_index <= self.end_epoch
    }

    /// Whether the reservation pays for `quorum_id`.
    pub fn allows_quorum(&self, quorum_id: u8) -> bool {
        self.quorum_numbers.contains(&quorum_id)
    }
}

/// On-demand deposit for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct OnDemandPayment {
    /// Deposited balance; the ceiling for any claimed cumulative payment.
    pub cumulative_payment: u64,
}

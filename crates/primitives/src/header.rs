//! Blob header carried by every submission attempt.

use alloy_primitives::{Address, Bytes};

use crate::PaymentMode;

/// Per-quorum security parameters requested for a blob.
///
/// Only carried for signing; the meter reads `quorum_id` when quorum
/// validation is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct QuorumParam {
    pub quorum_id: u8,
    pub adversary_threshold: u8,
    pub confirmation_threshold: u8,
    pub chunk_length: u32,
}

/// Payment-bearing header of a blob submission.
///
/// Immutable once signed: any field change invalidates `signature`.
///
/// # Bin index
///
/// The meaning of `bin_index` depends on the payment mode. Reservation
/// requests declare a reservation-window index, on-demand requests declare
/// a one-second index used by the global rate limit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BlobHeader {
    /// Header format version.
    pub version: u32,
    /// Account paying for the blob; must match the signer.
    pub account_id: Address,
    /// Anti-replay nonce (not checked for uniqueness by the meter).
    pub nonce: u64,
    /// Caller-declared time bin.
    pub bin_index: u64,
    /// `0` selects the reservation path, anything else on-demand.
    pub cumulative_payment: u64,
    /// Bytes to charge.
    pub blob_size: u64,
    /// Opaque commitment to the blob content.
    pub commitment: Bytes,
    /// Requested quorums and their thresholds.
    pub quorum_params: Vec<QuorumParam>,
    /// 65-byte `r || s || v` ECDSA signature over all other fields.
    pub signature: Bytes,
}

impl BlobHeader {
    /// Payment mode this header selects.
    pub const fn payment_mode(&self) -> PaymentMode {
        PaymentMode::from_cumulative_payment(self.cumulative_payment)
    }

    /// Quorum IDs requested by this header, in declaration order.
    pub fn quorum_numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.quorum_params.iter().map(|q| q.quorum_id)
    }

    /// Returns a copy with the given signature attached.
    pub fn with_signature(mut self, signature: Bytes) -> Self {
        self.signature = signature;
        self
    }
}

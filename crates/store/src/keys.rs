//! Store keys.

use tollgate_primitives::AccountId;

const ADDRESS_LEN: usize = 20;

/// Length of an `account || u64` key as stored by byte-keyed backends.
pub(crate) const ACCOUNT_KEY_LEN: usize = ADDRESS_LEN + 8;

/// Key of an atomically incremented usage counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CounterKey {
    /// Bytes charged by one account in one reservation bin.
    Reservation { account: AccountId, bin: u64 },
    /// Bytes charged by all on-demand traffic in one global bin.
    Global { bin: u64 },
}

impl CounterKey {
    /// Reservation-bin counter for `account`.
    pub const fn reservation(account: AccountId, bin: u64) -> Self {
        Self::Reservation { account, bin }
    }

    /// Global on-demand counter.
    pub const fn global(bin: u64) -> Self {
        Self::Global { bin }
    }

    /// Bin index this counter belongs to.
    pub const fn bin(&self) -> u64 {
        match self {
            Self::Reservation { bin, .. } | Self::Global { bin } => *bin,
        }
    }
}

/// Key of one on-demand ledger entry.
///
/// An account's entries are ordered by `cumulative_payment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerKey {
    pub account: AccountId,
    pub cumulative_payment: u64,
}

impl LedgerKey {
    /// Create a ledger key.
    pub const fn new(account: AccountId, cumulative_payment: u64) -> Self {
        Self {
            account,
            cumulative_payment,
        }
    }
}

/// Encode `account || suffix` with a big-endian suffix, so byte order
/// groups keys by account and sorts them numerically within it.
pub(crate) fn encode_account_key(account: &AccountId, suffix: u64) -> [u8; ACCOUNT_KEY_LEN] {
    let mut key = [0u8; ACCOUNT_KEY_LEN];
    let (head, tail) = key.split_at_mut(ADDRESS_LEN);
    head.copy_from_slice(account.as_slice());
    tail.copy_from_slice(&suffix.to_be_bytes());
    key
}

/// Suffix of a key produced by [`encode_account_key`].
pub(crate) fn decode_suffix(key: &[u8; ACCOUNT_KEY_LEN]) -> u64 {
    key.last_chunk::<8>().map(|b| u64::from_be_bytes(*b)).unwrap_or_default()
}

//! Metering configuration.

use std::time::Duration;

use tollgate_signer::SigningDomain;

use crate::constants::*;

/// What the meter needs to know about pricing, limits and signing.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait MeteringConfig: Send + Sync {
    /// Price of one on-demand byte.
    fn price_per_byte(&self) -> u64;

    /// Ceiling on bytes admitted per global (one second) bin.
    fn global_bytes_per_second(&self) -> u64;

    /// Length of one reservation bin.
    fn reservation_window(&self) -> Duration;

    /// Smallest number of bytes any request is charged for.
    fn min_chargeable_size(&self) -> u64;

    /// Domain header signatures are checked against.
    fn signing_domain(&self) -> SigningDomain;

    /// Whether requested quorums are checked against the payment terms.
    fn validate_quorums(&self) -> bool {
        false
    }

    /// Whether a reservation request rejected for overflow has its bin
    /// increment undone.
    fn rollback_reservation_overflow(&self) -> bool {
        false
    }
}

/// Default metering configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMeteringConfig;

impl MeteringConfig for DefaultMeteringConfig {
    fn price_per_byte(&self) -> u64 {
        DEFAULT_PRICE_PER_BYTE
    }

    fn global_bytes_per_second(&self) -> u64 {
        DEFAULT_GLOBAL_BYTES_PER_SECOND
    }

    fn reservation_window(&self) -> Duration {
        DEFAULT_RESERVATION_WINDOW
    }

    fn min_chargeable_size(&self) -> u64 {
        DEFAULT_MIN_CHARGEABLE_SIZE
    }

    fn signing_domain(&self) -> SigningDomain {
        SigningDomain::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_signer::{DEFAULT_CHAIN_ID, DEFAULT_VERIFYING_CONTRACT};

    #[test]
    fn test_default_config() {
        let config = DefaultMeteringConfig;
        assert_eq!(config.price_per_byte(), 1);
        assert_eq!(config.global_bytes_per_second(), 1_000_000);
        assert_eq!(config.reservation_window(), Duration::from_secs(375));
        assert_eq!(config.min_chargeable_size(), 0);
        assert_eq!(config.signing_domain().chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(
            config.signing_domain().verifying_contract,
            DEFAULT_VERIFYING_CONTRACT
        );
        assert!(!config.validate_quorums());
        assert!(!config.rollback_reservation_overflow());
    }
}

//! CLI arguments for payment metering configuration.

use std::time::Duration;

use alloy_primitives::Address;
use clap::Args;
use serde::{Deserialize, Serialize};
use tollgate_signer::{DEFAULT_CHAIN_ID, DEFAULT_VERIFYING_CONTRACT, SigningDomain};

use crate::{MeteringConfig, constants::*};

/// Payment metering CLI arguments.
#[derive(Debug, Args, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[command(next_help_heading = "Payment Metering")]
#[serde(default)]
pub struct MeteringArgs {
    /// Price charged per on-demand byte
    #[arg(long = "metering.price-per-byte", default_value_t = DEFAULT_PRICE_PER_BYTE)]
    pub price_per_byte: u64,

    /// Aggregate on-demand bytes admitted per second
    #[arg(long = "metering.global-rate", default_value_t = DEFAULT_GLOBAL_BYTES_PER_SECOND)]
    pub global_bytes_per_second: u64,

    /// Reservation bin length in seconds
    #[arg(long = "metering.reservation-window", default_value_t = DEFAULT_RESERVATION_WINDOW_SECS)]
    pub reservation_window_secs: u64,

    /// Minimum bytes charged per request (0 disables)
    #[arg(long = "metering.min-chargeable-size", default_value_t = DEFAULT_MIN_CHARGEABLE_SIZE)]
    pub min_chargeable_size: u64,

    /// Chain ID of the payment contract, used in the signing domain
    #[arg(long = "metering.chain-id", default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: u64,

    /// Payment contract address, used in the signing domain
    #[arg(long = "metering.verifying-contract", default_value_t = DEFAULT_VERIFYING_CONTRACT)]
    pub verifying_contract: Address,

    /// Reject requests naming quorums their payment does not cover
    #[arg(long = "metering.validate-quorums")]
    pub validate_quorums: bool,

    /// Undo the bin increment of reservation requests rejected for overflow
    #[arg(long = "metering.rollback-overflow")]
    pub rollback_reservation_overflow: bool,
}

impl Default for MeteringArgs {
    fn default() -> Self {
        Self {
            price_per_byte: DEFAULT_PRICE_PER_BYTE,
            global_bytes_per_second: DEFAULT_GLOBAL_BYTES_PER_SECOND,
            reservation_window_secs: DEFAULT_RESERVATION_WINDOW_SECS,
            min_chargeable_size: DEFAULT_MIN_CHARGEABLE_SIZE,
            chain_id: DEFAULT_CHAIN_ID,
            verifying_contract: DEFAULT_VERIFYING_CONTRACT,
            validate_quorums: false,
            rollback_reservation_overflow: false,
        }
    }
}

impl MeteringArgs {
    /// Validate argument values.
    pub fn validate(&self) -> Result<(), String> {
        if self.reservation_window_secs == 0 {
            return Err("reservation-window must be at least one second".to_string());
        }
        if self.chain_id == 0 {
            return Err("chain-id must be non-zero".to_string());
        }
        Ok(())
    }
}

impl MeteringConfig for MeteringArgs {
    fn price_per_byte(&self) -> u64 {
        self.price_per_byte
    }

    fn global_bytes_per_second(&self) -> u64 {
        self.global_bytes_per_second
    }

    fn reservation_window(&self) -> Duration {
        Duration::from_secs(self.reservation_window_secs)
    }

    fn min_chargeable_size(&self) -> u64 {
        self.min_chargeable_size
    }

    fn signing_domain(&self) -> SigningDomain {
        SigningDomain::new(self.chain_id, self.verifying_contract)
    }

    fn validate_quorums(&self) -> bool {
        self.validate_quorums
    }

    fn rollback_reservation_overflow(&self) -> bool {
        self.rollback_reservation_overflow
    }
}

//! Default metering policy.

use std::time::Duration;

/// Default price charged per byte of on-demand traffic.
pub(crate) const DEFAULT_PRICE_PER_BYTE: u64 = 1;

/// Default ceiling on aggregate on-demand bytes per second.
pub(crate) const DEFAULT_GLOBAL_BYTES_PER_SECOND: u64 = 1_000_000;

/// Default reservation bin length in seconds.
pub(crate) const DEFAULT_RESERVATION_WINDOW_SECS: u64 = 375;

/// Default reservation bin length.
pub(crate) const DEFAULT_RESERVATION_WINDOW: Duration =
    Duration::from_secs(DEFAULT_RESERVATION_WINDOW_SECS);

/// Default minimum bytes charged per request (disabled).
pub(crate) const DEFAULT_MIN_CHARGEABLE_SIZE: u64 = 0;

/// Length of a global on-demand bin in seconds.
pub const GLOBAL_BIN_SECS: u64 = 1;

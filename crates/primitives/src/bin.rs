//! Bin arithmetic.
//!
//! A bin is `floor(unix_seconds / window)`. Requests may target the current
//! bin or the one before it, which absorbs clock skew and in-flight latency
//! at window boundaries.

/// Offset from a request's bin to the bin that absorbs its overflow.
pub const OVERFLOW_BIN_OFFSET: u64 = 2;

/// Bin containing `unix_seconds` for a window of `window_secs`.
///
/// A zero window maps everything to bin 0.
pub const fn bin_index(unix_seconds: u64, window_secs: u64) -> u64 {
    match unix_seconds.checked_div(window_secs) {
        Some(bin) => bin,
        None => 0,
    }
}

/// Whether `declared` is the current bin or the one before it.
pub const fn within_window(declared: u64, current: u64) -> bool {
    declared == current || declared.saturating_add(1) == current
}

/// Bin that absorbs overflow from `bin`, or `None` if it would not fit in `u64`.
pub const fn overflow_bin(bin: u64) -> Option<u64> {
    bin.checked_add(OVERFLOW_BIN_OFFSET)
}

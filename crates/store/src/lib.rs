//! Durable counters for payment metering.
//!
//! The meter keeps no mutable state of its own. Everything it counts lives
//! behind [`CounterStore`], which offers exactly the primitives admission
//! control needs:
//!
//! - atomic increment-and-get on per-account reservation bins and on the
//!   global on-demand bin ([`CounterKey`]), plus a listing of an account's
//!   reservation bins
//! - insert-if-absent, lookup and delete on the per-account payment ledger
//!   ([`LedgerKey`])
//! - ordered range queries over one account's ledger
//!
//! # Backends
//!
//! - [`MemoryCounterStore`] - process-local, for tests and single-instance use
//! - [`RedbCounterStore`] - persistent, backed by the redb embedded database
//!
//! Backends must be safe for unbounded concurrent callers; every operation is
//! atomic with respect to every other.

mod error;
mod keys;
mod memory;
mod redb_store;
mod traits;

#[cfg(test)]
mod conformance;

pub use error::StoreError;
pub use keys::{CounterKey, LedgerKey};
pub use memory::MemoryCounterStore;
pub use redb_store::RedbCounterStore;
pub use traits::{
    BinUsage, CounterStore, Insertion, PaymentBound, PaymentNeighbors, PaymentRecord, SortOrder,
};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

//! Chain-state access for payment metering.
//!
//! The meter never owns payment terms. Reservations and on-demand deposits
//! are read from a [`PaymentChainState`] at a reference block chosen by a
//! [`ReferenceBlockSource`].
//!
//! # Providers
//!
//! - [`InMemoryChainState`] - mutable maps, for tests and fixed deployments
//! - [`CachedChainState`] - serves an immutable [`PaymentSnapshot`] pulled
//!   from a [`PaymentStateSource`] and refreshed on an interval

mod cached;
mod error;
mod memory;
mod provider;

pub use cached::{CachedChainState, PaymentSnapshot, PaymentStateSource};
pub use error::ChainStateError;
pub use memory::InMemoryChainState;
pub use provider::{FixedReferenceBlock, PaymentChainState, ReferenceBlockSource};

/// Result type for chain-state operations.
pub type ChainStateResult<T> = Result<T, ChainStateError>;

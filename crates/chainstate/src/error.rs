//! Chain-state error types.

/// Errors from chain-state providers.
///
/// A missing reservation or deposit is not an error; providers report it as
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainStateError {
    /// The provider could not be reached or timed out.
    #[error("chain state unavailable: {0}")]
    Unavailable(String),

    /// The provider returned data that could not be interpreted.
    #[error("invalid chain state: {0}")]
    Invalid(String),
}

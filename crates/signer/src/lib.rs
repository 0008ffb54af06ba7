//! EIP-712 signing and verification for blob headers.
//!
//! Every metered request is authenticated by an ECDSA signature over an
//! EIP-712 typed-data digest of its [`BlobHeader`](tollgate_primitives::BlobHeader).
//! The digest covers all header fields except the signature itself.
//!
//! # EIP-712 Domain
//!
//! - Name: "Tollgate"
//! - Version: "1"
//! - ChainId: configured network chain
//! - VerifyingContract: configured payment contract
//!
//! # Types
//!
//! ```text
//! BlobHeader(uint32 version,string accountID,uint64 nonce,uint64 binIndex,uint64 cumulativePayment,bytes commitment,uint64 dataLength,QuorumParam[] quorumParams)
//! QuorumParam(uint8 quorumID,uint8 adversaryThreshold,uint8 confirmationThreshold,uint32 chunkLength)
//! ```
//!
//! `accountID` is the lower-case, `0x`-prefixed hex form of the address.
//!
//! # Signing a Header
//!
//! ```ignore
//! let verifier = HeaderVerifier::new(SigningDomain::default());
//! let signed = sign_header(header, &signer, verifier.domain())?;
//! verifier.verify(&signed)?;
//! ```

mod domain;
mod typed;
mod verifier;

pub use domain::{
    DEFAULT_CHAIN_ID, DEFAULT_VERIFYING_CONTRACT, DOMAIN_NAME, DOMAIN_VERSION, SigningDomain,
};
pub use typed::{account_string, signing_hash};
pub use verifier::{HeaderVerifier, sign_header};

pub use alloy_primitives::{Address, B256, Signature};
pub use alloy_sol_types::Eip712Domain;

/// Length of an encoded `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Errors from signing or verifying a header.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Signature bytes could not be parsed.
    #[error("malformed signature: {0}")]
    Malformed(String),

    /// Public key recovery failed.
    #[error("failed to recover signer: {0}")]
    Recovery(String),

    /// Header was signed by a different account than it claims.
    #[error("recovered address {recovered} does not match account {account}")]
    AccountMismatch {
        account: Address,
        recovered: Address,
    },

    /// The signer could not produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Result alias for signing operations.
pub type SignatureResult<T> = Result<T, SignatureError>;

//! EIP-712 domain separating header signatures by network and contract.

use alloy_primitives::{Address, address};
use alloy_sol_types::{Eip712Domain, eip712_domain};

/// EIP-712 domain name for header signing.
pub const DOMAIN_NAME: &str = "Tollgate";

/// EIP-712 domain version for header signing.
pub const DOMAIN_VERSION: &str = "1";

/// Default chain ID (Holesky).
pub const DEFAULT_CHAIN_ID: u64 = 17000;

/// Default verifying contract.
pub const DEFAULT_VERIFYING_CONTRACT: Address =
    address!("0x1234000000000000000000000000000000000000");

/// Network parameters that scope a header signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningDomain {
    /// Chain the payment contract lives on.
    pub chain_id: u64,
    /// Payment contract address.
    pub verifying_contract: Address,
}

impl SigningDomain {
    /// Create a signing domain.
    pub const fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
        }
    }

    /// Build the EIP-712 domain.
    pub fn eip712(&self) -> Eip712Domain {
        eip712_domain! {
            name: DOMAIN_NAME,
            version: DOMAIN_VERSION,
            chain_id: self.chain_id,
            verifying_contract: self.verifying_contract,
        }
    }
}

impl Default for SigningDomain {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_ID, DEFAULT_VERIFYING_CONTRACT)
    }
}

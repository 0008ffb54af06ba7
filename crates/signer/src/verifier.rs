//! Signer recovery and account binding.

use alloy_primitives::{Address, B256, Bytes, Signature};
use alloy_signer::SignerSync;
use alloy_sol_types::Eip712Domain;
use tollgate_primitives::BlobHeader;

use crate::{SIGNATURE_LENGTH, SignatureError, SignatureResult, SigningDomain, signing_hash};

/// Verifies that a header was signed by the account it names.
///
/// Stateless apart from the domain; share freely across tasks.
#[derive(Debug, Clone)]
pub struct HeaderVerifier {
    domain: Eip712Domain,
}

impl HeaderVerifier {
    /// Create a verifier for the given signing domain.
    pub fn new(domain: SigningDomain) -> Self {
        Self {
            domain: domain.eip712(),
        }
    }

    /// The EIP-712 domain signatures are checked against.
    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Compute the signing hash for a header.
    pub fn signing_hash(&self, header: &BlobHeader) -> B256 {
        signing_hash(header, &self.domain)
    }

    /// Recover the address that produced `header.signature`.
    pub fn recover_signer(&self, header: &BlobHeader) -> SignatureResult<Address> {
        let sig = parse_signature(&header.signature)?;
        let hash = self.signing_hash(header);

        sig.recover_address_from_prehash(&hash)
            .map_err(|e| SignatureError::Recovery(e.to_string()))
    }

    /// Verify the header is signed by `header.account_id`.
    pub fn verify(&self, header: &BlobHeader) -> SignatureResult<()> {
        let recovered = self.recover_signer(header)?;
        if recovered != header.account_id {
            return Err(SignatureError::AccountMismatch {
                account: header.account_id,
                recovered,
            });
        }
        Ok(())
    }
}

/// Sign `header` with `signer`, returning it with the signature attached.
///
/// Any existing signature is replaced.
pub fn sign_header<S: SignerSync>(
    header: BlobHeader,
    signer: &S,
    domain: &Eip712Domain,
) -> SignatureResult<BlobHeader> {
    let hash = signing_hash(&header, domain);
    let sig = signer
        .sign_hash_sync(&hash)
        .map_err(|e| SignatureError::Signing(e.to_string()))?;
    let signature = Bytes::copy_from_slice(&sig.as_bytes());
    Ok(header.with_signature(signature))
}

fn parse_signature(bytes: &Bytes) -> SignatureResult<Signature> {
    if bytes.len() != SIGNATURE_LENGTH {
        return Err(SignatureError::Malformed(format!(
            "invalid signature length: expected {SIGNATURE_LENGTH}, got {}",
            bytes.len()
        )));
    }

    Signature::try_from(bytes.as_ref()).map_err(|e| SignatureError::Malformed(e.to_string()))
}

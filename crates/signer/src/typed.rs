//! EIP-712 typed-data view of a blob header.

use alloy_primitives::{Address, B256, hex};
use alloy_sol_types::{Eip712Domain, SolStruct};
use tollgate_primitives::BlobHeader;

mod sol {
    alloy_sol_types::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct QuorumParam {
            uint8 quorumID;
            uint8 adversaryThreshold;
            uint8 confirmationThreshold;
            uint32 chunkLength;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct BlobHeader {
            uint32 version;
            string accountID;
            uint64 nonce;
            uint64 binIndex;
            uint64 cumulativePayment;
            bytes commitment;
            uint64 dataLength;
            QuorumParam[] quorumParams;
        }
    }
}

/// Canonical string form of an account inside the signed payload.
pub fn account_string(account: &Address) -> String {
    hex::encode_prefixed(account)
}

impl From<&BlobHeader> for sol::BlobHeader {
    fn from(header: &BlobHeader) -> Self {
        Self {
            version: header.version,
            accountID: account_string(&header.account_id),
            nonce: header.nonce,
            binIndex: header.bin_index,
            cumulativePayment: header.cumulative_payment,
            commitment: header.commitment.clone(),
            dataLength: header.blob_size,
            quorumParams: header
                .quorum_params
                .iter()
                .map(|q| sol::QuorumParam {
                    quorumID: q.quorum_id,
                    adversaryThreshold: q.adversary_threshold,
                    confirmationThreshold: q.confirmation_threshold,
                    chunkLength: q.chunk_length,
                })
                .collect(),
        }
    }
}

/// EIP-712 signing hash of `header` under `domain`.
///
/// The signature field is not part of the digest.
pub fn signing_hash(header: &BlobHeader, domain: &Eip712Domain) -> B256 {
    sol::BlobHeader::from(header).eip712_signing_hash(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SigningDomain;
    use alloy_primitives::Bytes;
    use tollgate_primitives::QuorumParam;

    fn test_header() -> BlobHeader {
        BlobHeader {
            version: 1,
            account_id: Address::repeat_byte(0xab),
            nonce: 7,
            bin_index: 4_500_000,
            cumulative_payment: 0,
            blob_size: 2048,
            commitment: Bytes::from_static(b"commitment"),
            quorum_params: vec![QuorumParam {
                quorum_id: 0,
                adversary_threshold: 80,
                confirmation_threshold: 100,
                chunk_length: 10,
            }],
            signature: Bytes::new(),
        }
    }

    #[test]
    fn test_account_string_is_lower_case() {
        let account = Address::repeat_byte(0xab);
        assert_eq!(account_string(&account), format!("0x{}", "ab".repeat(20)));
    }

    #[test]
    fn test_encode_type() {
        assert_eq!(
            sol::BlobHeader::eip712_encode_type(),
            "BlobHeader(uint32 version,string accountID,uint64 nonce,uint64 binIndex,uint64 cumulativePayment,bytes commitment,uint64 dataLength,QuorumParam[] quorumParams)QuorumParam(uint8 quorumID,uint8 adversaryThreshold,uint8 confirmationThreshold,uint32 chunkLength)"
        );
    }

    #[test]
    fn test_signing_hash_deterministic() {
        let domain = SigningDomain::default().eip712();
        let header = test_header();
        assert_eq!(
            signing_hash(&header, &domain),
            signing_hash(&header, &domain)
        );
    }

    #[test]
    fn test_signing_hash_ignores_signature() {
        let domain = SigningDomain::default().eip712();
        let header = test_header();
        let signed = header.clone().with_signature(Bytes::from(vec![1u8; 65]));
        assert_eq!(
            signing_hash(&header, &domain),
            signing_hash(&signed, &domain)
        );
    }

    #[test]
    fn test_signing_hash_covers_every_field() {
        let domain = SigningDomain::default().eip712();
        let base = signing_hash(&test_header(), &domain);

        let mutations: Vec<fn(&mut BlobHeader)> = vec![
            |h| h.version += 1,
            |h| h.account_id = Address::repeat_byte(0xcd),
            |h| h.nonce += 1,
            |h| h.bin_index += 1,
            |h| h.cumulative_payment += 1,
            |h| h.blob_size += 1,
            |h| h.commitment = Bytes::from_static(b"other"),
            |h| h.quorum_params[0].chunk_length += 1,
            |h| h.quorum_params.clear(),
        ];

        for mutate in mutations {
            let mut header = test_header();
            mutate(&mut header);
            assert_ne!(signing_hash(&header, &domain), base);
        }
    }
}

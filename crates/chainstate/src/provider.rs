//! Provider traits.

use async_trait::async_trait;
use tollgate_primitives::{AccountId, BlockNumber, OnDemandPayment, Reservation};

use crate::ChainStateResult;

/// Read access to on-chain payment terms.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait PaymentChainState: Send + Sync {
    /// The account's reservation active at `block`, if any.
    async fn active_reservation(
        &self,
        account: &AccountId,
        block: BlockNumber,
    ) -> ChainStateResult<Option<Reservation>>;

    /// The account's on-demand deposit at `block`, if any.
    async fn on_demand_payment(
        &self,
        account: &AccountId,
        block: BlockNumber,
    ) -> ChainStateResult<Option<OnDemandPayment>>;
}

/// Chooses the block chain state is read at.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait ReferenceBlockSource: Send + Sync {
    /// Block number to evaluate the next request against.
    async fn reference_block(&self) -> ChainStateResult<BlockNumber>;
}

/// A reference block that never moves.
///
/// The default is block `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedReferenceBlock(pub BlockNumber);

#[async_trait]
impl ReferenceBlockSource for FixedReferenceBlock {
    async fn reference_block(&self) -> ChainStateResult<BlockNumber> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fixed_reference_block() {
        assert_eq!(
            FixedReferenceBlock::default()
                .reference_block()
                .await
                .unwrap(),
            0
        );

        let source: Arc<dyn ReferenceBlockSource> = Arc::new(FixedReferenceBlock(42));
        assert_eq!(source.reference_block().await.unwrap(), 42);
    }
}

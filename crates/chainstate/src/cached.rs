//! Snapshot-backed chain state with periodic refresh.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tollgate_primitives::{AccountId, BlockNumber, OnDemandPayment, Reservation};
use tracing::{debug, warn};

use crate::{ChainStateResult, PaymentChainState, ReferenceBlockSource};

/// Payment terms of every account as of one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentSnapshot {
    /// Block the snapshot was taken at.
    pub block: BlockNumber,
    /// Active reservations by account.
    pub reservations: HashMap<AccountId, Reservation>,
    /// On-demand deposits by account.
    pub on_demand: HashMap<AccountId, OnDemandPayment>,
}

/// Bulk loader of payment terms, typically backed by contract calls.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait PaymentStateSource: Send + Sync {
    /// Load all payment terms as of `block`.
    async fn fetch_snapshot(&self, block: BlockNumber) -> ChainStateResult<PaymentSnapshot>;
}

/// Chain state served from an in-memory snapshot.
///
/// Lookups never touch the source. The snapshot only changes through
/// [`refresh`](Self::refresh); a failed refresh keeps the previous one. The
/// `block` argument of lookups is ignored, the snapshot's own block is the
/// reference point.
#[derive(Debug)]
pub struct CachedChainState<S> {
    source: S,
    snapshot: RwLock<Arc<PaymentSnapshot>>,
}

impl<S: PaymentStateSource> CachedChainState<S> {
    /// Create a cache with an empty snapshot. Call [`refresh`](Self::refresh)
    /// before serving requests.
    pub fn new(source: S) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Arc::default()),
        }
    }

    /// Create a cache and load the first snapshot at `block`.
    pub async fn load(source: S, block: BlockNumber) -> ChainStateResult<Self> {
        let cache = Self::new(source);
        cache.refresh(block).await?;
        Ok(cache)
    }

    /// The snapshot currently served.
    pub fn snapshot(&self) -> Arc<PaymentSnapshot> {
        self.snapshot.read().clone()
    }

    /// Replace the snapshot with one taken at `block`.
    pub async fn refresh(&self, block: BlockNumber) -> ChainStateResult<()> {
        let snapshot = self.source.fetch_snapshot(block).await?;
        debug!(
            block,
            reservations = snapshot.reservations.len(),
            on_demand = snapshot.on_demand.len(),
            "refreshed payment snapshot"
        );
        *self.snapshot.write() = Arc::new(snapshot);
        Ok(())
    }
}

impl<S: PaymentStateSource + 'static> CachedChainState<S> {
    /// Refresh every `interval` at the block chosen by `blocks` until
    /// `shutdown` resolves.
    pub fn spawn_refresh<B, F>(
        self: Arc<Self>,
        blocks: B,
        interval: Duration,
        shutdown: F,
    ) -> JoinHandle<()>
    where
        B: ReferenceBlockSource + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut shutdown = std::pin::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        debug!("payment snapshot refresh shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        let result = match blocks.reference_block().await {
                            Ok(block) => self.refresh(block).await,
                            Err(e) => Err(e),
                        };
                        if let Err(e) = result {
                            warn!(
                                error = %e,
                                "payment snapshot refresh failed, keeping previous snapshot"
                            );
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl<S: PaymentStateSource> PaymentChainState for CachedChainState<S> {
    async fn active_reservation(
        &self,
        account: &AccountId,
        _block: BlockNumber,
    ) -> ChainStateResult<Option<Reservation>> {
        Ok(self.snapshot.read().reservations.get(account).cloned())
    }

    async fn on_demand_payment(
        &self,
        account: &AccountId,
        _block: BlockNumber,
    ) -> ChainStateResult<Option<OnDemandPayment>> {
        Ok(self.snapshot.read().on_demand.get(account).copied())
    }
}

//! In-memory chain state.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tollgate_primitives::{AccountId, BlockNumber, OnDemandPayment, Reservation};

use crate::{ChainStateResult, PaymentChainState, PaymentSnapshot, PaymentStateSource};

/// Chain state held in process memory.
///
/// Terms are independent of the reference block. Also usable as the
/// [`PaymentStateSource`] behind a [`CachedChainState`](crate::CachedChainState).
#[derive(Debug, Default)]
pub struct InMemoryChainState {
    reservations: RwLock<HashMap<AccountId, Reservation>>,
    on_demand: RwLock<HashMap<AccountId, OnDemandPayment>>,
}

impl InMemoryChainState {
    /// Create an empty chain state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace an account's active reservation.
    pub fn set_reservation(&self, account: AccountId, reservation: Reservation) {
        self.reservations.write().insert(account, reservation);
    }

    /// Remove an account's reservation.
    pub fn remove_reservation(&self, account: &AccountId) -> Option<Reservation> {
        self.reservations.write().remove(account)
    }

    /// Set or replace an account's on-demand deposit.
    pub fn set_on_demand_payment(&self, account: AccountId, payment: OnDemandPayment) {
        self.on_demand.write().insert(account, payment);
    }

    /// Remove an account's on-demand deposit.
    pub fn remove_on_demand_payment(&self, account: &AccountId) -> Option<OnDemandPayment> {
        self.on_demand.write().remove(account)
    }
}

#[async_trait]
impl PaymentChainState for InMemoryChainState {
    async fn active_reservation(
        &self,
        account: &AccountId,
        _block: BlockNumber,
    ) -> ChainStateResult<Option<Reservation>> {
        Ok(self.reservations.read().get(account).cloned())
    }

    async fn on_demand_payment(
        &self,
        account: &AccountId,
        _block: BlockNumber,
    ) -> ChainStateResult<Option<OnDemandPayment>> {
        Ok(self.on_demand.read().get(account).copied())
    }
}

#[async_trait]
impl PaymentStateSource for InMemoryChainState {
    async fn fetch_snapshot(&self, block: BlockNumber) -> ChainStateResult<PaymentSnapshot> {
        Ok(PaymentSnapshot {
            block,
            reservations: self.reservations.read().clone(),
            on_demand: self.on_demand.read().clone(),
        })
    }
}

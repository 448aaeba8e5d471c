//! In-memory [`LedgerStore`] fake shared by the manager tests.

use async_trait::async_trait;

use kava_core::{Ingredients, ResourceAmounts, ResourceInventory, ResourceKind};

use crate::error::{SyncError, SyncResult};
use crate::store::LedgerStore;

/// A store that either echoes a fixed inventory or fails every call.
pub(crate) struct FakeStore {
    respond_with: ResourceInventory,
    fail_with: Option<String>,
}

impl FakeStore {
    /// Every call succeeds and returns `inventory` as the authoritative state.
    pub fn ok(inventory: ResourceInventory) -> Self {
        FakeStore {
            respond_with: inventory,
            fail_with: None,
        }
    }

    /// Every call fails with a store rejection.
    pub fn failing(message: &str) -> Self {
        FakeStore {
            respond_with: kava_core::MACHINE_SEED,
            fail_with: Some(message.to_string()),
        }
    }

    fn respond(&self) -> SyncResult<ResourceInventory> {
        match &self.fail_with {
            Some(message) => Err(SyncError::StoreRejected(message.clone())),
            None => Ok(self.respond_with),
        }
    }
}

#[async_trait]
impl LedgerStore for FakeStore {
    async fn fetch(&self) -> SyncResult<ResourceInventory> {
        self.respond()
    }

    async fn consume(&self, _ingredients: &Ingredients) -> SyncResult<ResourceInventory> {
        self.respond()
    }

    async fn refill(&self, _amounts: &ResourceAmounts) -> SyncResult<ResourceInventory> {
        self.respond()
    }

    async fn replace(&self, _inventory: &ResourceInventory) -> SyncResult<ResourceInventory> {
        self.respond()
    }

    async fn purchase(
        &self,
        _resource: ResourceKind,
        _amount: i64,
    ) -> SyncResult<ResourceInventory> {
        self.respond()
    }

    async fn transfer(
        &self,
        _resource: ResourceKind,
        _amount: i64,
    ) -> SyncResult<ResourceInventory> {
        self.respond()
    }
}

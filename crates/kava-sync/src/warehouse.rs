//! # Warehouse Inventory Manager
//!
//! Owns the bulk ledger: purchase credits, transfer preconditions and
//! reconciliation against the warehouse-tier remote store. Mirrors the
//! optimistic/reconcile/rollback pattern of the machine manager, with one
//! asymmetry: purchase failures ARE user-blocking (the operator pressed the
//! button and needs to know), while machine-side refill failures are not.
//!
//! Transfers are the warehouse half of a two-piece movement: this manager
//! debits, the machine manager credits, and the two remote calls are
//! independent. A crash or partition between them leaves a lost-resource or
//! double-resource window - see [`crate::restock`] for where that gap is
//! accepted.

use tracing::warn;

use kava_core::inventory::{PURCHASE_AMOUNTS, WAREHOUSE_SEED};
use kava_core::{CoreError, ResourceAmounts, ResourceInventory, ResourceKind};

use crate::error::{SyncError, SyncResult};
use crate::store::{HttpLedgerStore, LedgerStore};

// =============================================================================
// Warehouse Inventory Manager
// =============================================================================

/// The warehouse's ledger and its synchronization hooks.
pub struct WarehouseInventory<S = HttpLedgerStore> {
    inventory: ResourceInventory,
    store: Option<S>,
    last_error: Option<String>,
}

impl WarehouseInventory<HttpLedgerStore> {
    /// A manager with no remote store: pure local operation.
    pub fn local() -> Self {
        WarehouseInventory::new(None)
    }
}

impl<S: LedgerStore> WarehouseInventory<S> {
    /// Creates a manager seeded with the standard warehouse inventory.
    pub fn new(store: Option<S>) -> Self {
        WarehouseInventory {
            inventory: WAREHOUSE_SEED,
            store,
            last_error: None,
        }
    }

    /// Current ledger value.
    pub fn inventory(&self) -> ResourceInventory {
        self.inventory
    }

    /// True if a remote store is configured for this tier.
    pub fn remote_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// The most recent remote failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Resets the ledger to its seed value.
    pub fn reset(&mut self) {
        self.inventory = WAREHOUSE_SEED;
        self.last_error = None;
    }

    /// Buys a fixed bundle of one resource.
    ///
    /// The bundle size is configuration ([`PURCHASE_AMOUNTS`]), not caller
    /// input. Optimistic credit first; a store failure reverses the credit
    /// by the same fixed amount and propagates - the operator sees the
    /// purchase fail.
    ///
    /// Returns the amount added.
    pub async fn purchase(&mut self, resource: ResourceKind) -> SyncResult<i64> {
        let amount = PURCHASE_AMOUNTS.get(resource);
        let bundle = ResourceAmounts::of(resource, amount);
        self.inventory = self.inventory.credit(&bundle);

        if let Some(store) = &self.store {
            match store.purchase(resource, amount).await {
                Ok(authoritative) => {
                    self.inventory = authoritative;
                    self.last_error = None;
                }
                Err(e) => {
                    // Reverse the optimistic credit by the same fixed amount
                    self.inventory = self.inventory.debit(&bundle);
                    let message = e.to_string();
                    warn!(resource = %resource, error = %message, "Purchase rejected by store, reversed");
                    self.last_error = Some(message.clone());
                    return Err(SyncError::RemoteSyncFailure {
                        op: "purchase".to_string(),
                        message,
                    });
                }
            }
        }

        Ok(amount)
    }

    /// Debits stock bound for the client machine.
    ///
    /// Fails fast with `InsufficientStock` and no mutation when the
    /// warehouse cannot cover the amount. On a store failure the exact
    /// pre-debit value is restored and the failure returned.
    pub async fn transfer_to_client(
        &mut self,
        resource: ResourceKind,
        amount: i64,
    ) -> SyncResult<()> {
        let available = self.inventory.get(resource);
        if available < amount {
            return Err(SyncError::Core(CoreError::InsufficientStock {
                resource: resource.to_string(),
                available,
                requested: amount,
            }));
        }

        let snapshot = self.inventory;
        self.inventory = self.inventory.debit(&ResourceAmounts::of(resource, amount));

        if let Some(store) = &self.store {
            match store.transfer(resource, amount).await {
                Ok(authoritative) => {
                    self.inventory = authoritative;
                    self.last_error = None;
                }
                Err(e) => {
                    self.inventory = snapshot;
                    let message = e.to_string();
                    warn!(resource = %resource, error = %message, "Transfer rejected by store, rolled back");
                    self.last_error = Some(message.clone());
                    return Err(SyncError::RemoteSyncFailure {
                        op: "transfer".to_string(),
                        message,
                    });
                }
            }
        }

        Ok(())
    }

    /// Pushes the entire local inventory to the store as an unconditional
    /// overwrite, replacing local state with whatever the store echoes back.
    pub async fn sync_to_remote(&mut self) -> SyncResult<()> {
        let store = self.store.as_ref().ok_or(SyncError::RemoteUnconfigured)?;
        match store.replace(&self.inventory).await {
            Ok(echoed) => {
                self.inventory = echoed;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Inventory push failed");
                self.last_error = Some(message.clone());
                Err(SyncError::RemoteSyncFailure {
                    op: "update".to_string(),
                    message,
                })
            }
        }
    }

    /// Fetches the authoritative inventory and replaces local state wholesale.
    ///
    /// On failure the current local state is retained and the error recorded.
    pub async fn load_from_remote(&mut self) -> SyncResult<()> {
        let store = self.store.as_ref().ok_or(SyncError::RemoteUnconfigured)?;
        match store.fetch().await {
            Ok(authoritative) => {
                self.inventory = authoritative;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Remote load failed, keeping local state");
                self.last_error = Some(message.clone());
                Err(SyncError::RemoteSyncFailure {
                    op: "load".to_string(),
                    message,
                })
            }
        }
    }

    /// Replaces the ledger with an inventory observed elsewhere (relay or
    /// admin override).
    pub fn apply_remote_update(&mut self, inventory: ResourceInventory) {
        self.inventory = inventory;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeStore;

    #[tokio::test]
    async fn test_transfer_scenario() {
        let mut warehouse = WarehouseInventory::local();
        assert_eq!(warehouse.inventory().water, 10_000);

        warehouse
            .transfer_to_client(ResourceKind::Water, 300)
            .await
            .unwrap();
        assert_eq!(warehouse.inventory().water, 9_700);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_stock_fails_fast() {
        let mut warehouse = WarehouseInventory::local();
        warehouse.apply_remote_update(ResourceInventory {
            water: 100,
            ..WAREHOUSE_SEED
        });

        let err = warehouse
            .transfer_to_client(ResourceKind::Water, 300)
            .await
            .unwrap_err();
        match err {
            SyncError::Core(CoreError::InsufficientStock {
                resource,
                available,
                requested,
            }) => {
                assert_eq!(resource, "water");
                assert_eq!(available, 100);
                assert_eq!(requested, 300);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
        assert_eq!(warehouse.inventory().water, 100);
    }

    #[tokio::test]
    async fn test_purchase_adds_fixed_bundle() {
        let mut warehouse = WarehouseInventory::local();
        let added = warehouse.purchase(ResourceKind::Coffee).await.unwrap();
        assert_eq!(added, 70);
        assert_eq!(warehouse.inventory().coffee, 1_070);
    }

    #[tokio::test]
    async fn test_purchase_remote_failure_reverses_credit() {
        let mut warehouse = WarehouseInventory::new(Some(FakeStore::failing("sheet offline")));

        let err = warehouse.purchase(ResourceKind::Water).await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteSyncFailure { .. }));
        assert_eq!(warehouse.inventory(), WAREHOUSE_SEED);
        assert!(warehouse.last_error().unwrap().contains("sheet offline"));
    }

    #[tokio::test]
    async fn test_transfer_remote_failure_restores_pre_debit_value() {
        let mut warehouse = WarehouseInventory::new(Some(FakeStore::failing("partition")));

        let err = warehouse
            .transfer_to_client(ResourceKind::Stirrers, 25)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::RemoteSyncFailure { .. }));
        assert_eq!(warehouse.inventory(), WAREHOUSE_SEED);
    }

    #[tokio::test]
    async fn test_remote_success_replaces_wholesale() {
        let authoritative = ResourceInventory {
            water: 8_000,
            coffee: 900,
            milk: 4_500,
            small_cups: 90,
            large_cups: 95,
            stirrers: 180,
        };
        let mut warehouse = WarehouseInventory::new(Some(FakeStore::ok(authoritative)));

        warehouse
            .transfer_to_client(ResourceKind::Water, 300)
            .await
            .unwrap();
        assert_eq!(warehouse.inventory(), authoritative);
    }

    #[tokio::test]
    async fn test_sync_to_remote_pushes_and_adopts_echo() {
        let echoed = ResourceInventory {
            milk: 1,
            ..WAREHOUSE_SEED
        };
        let store = FakeStore::ok(echoed);
        let mut warehouse = WarehouseInventory::new(Some(store));

        warehouse.sync_to_remote().await.unwrap();
        assert_eq!(warehouse.inventory(), echoed);
    }

    #[tokio::test]
    async fn test_sync_to_remote_without_store() {
        let mut warehouse = WarehouseInventory::local();
        assert!(matches!(
            warehouse.sync_to_remote().await,
            Err(SyncError::RemoteUnconfigured)
        ));
    }

    #[tokio::test]
    async fn test_reset_restores_seed() {
        let mut warehouse = WarehouseInventory::local();
        warehouse.purchase(ResourceKind::Water).await.unwrap();
        warehouse.reset();
        assert_eq!(warehouse.inventory(), WAREHOUSE_SEED);
    }
}

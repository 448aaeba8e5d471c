//! # Client Machine Inventory Manager
//!
//! Owns the client-side ledger: feasibility checks, optimistic debits, relay
//! broadcasts and reconciliation against the machine-tier remote store.
//!
//! ## The Optimistic Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    consume() / refill() Lifecycle                       │
//! │                                                                         │
//! │  1. check        is_sufficient? ── no ──► InsufficientResources,        │
//! │                        │                  NO MUTATION                   │
//! │                        ▼ yes                                            │
//! │  2. snapshot     copy the current ledger value                          │
//! │                        │                                                │
//! │  3. mutate       debit/credit locally (callers see the new value        │
//! │                        │                immediately)                    │
//! │  4. broadcast    client:resource-update over the relay                  │
//! │                        │                (fire-and-forget)               │
//! │  5. reconcile    remote store call, if configured                       │
//! │                  ├── ok ───► REPLACE ledger with returned inventory     │
//! │                  └── err ──► RESTORE the step-2 snapshot                │
//! │                              consume: surface RemoteSyncFailure         │
//! │                              refill:  log only (warehouse-side noise)   │
//! │                                                                         │
//! │  Restore is by value-replacement of the snapshot, never by undoing      │
//! │  individual field changes.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations against one manager are expected to run to completion
//! (including the remote round-trip) before the next is issued. Nothing
//! enforces at-most-one-in-flight: two concurrent `consume` calls can both
//! pass the feasibility check against a stale snapshot before either debits.
//! That race window is part of the broadcast-and-reconcile design, recovered
//! by the next wholesale replacement from the store.

use tracing::{debug, warn};

use kava_core::inventory::{LOW_THRESHOLDS, MACHINE_SEED};
use kava_core::{CoreError, Ingredients, ResourceAmounts, ResourceInventory, ResourceKind};

use crate::error::{SyncError, SyncResult};
use crate::protocol::RelayMessage;
use crate::store::{HttpLedgerStore, LedgerStore};
use crate::transport::TransportHandle;

// =============================================================================
// Machine Inventory Manager
// =============================================================================

/// The client machine's ledger and its synchronization hooks.
///
/// The manager exclusively owns its ledger instance: the warehouse never
/// mutates it directly, all cross-tier movement arrives through
/// [`refill`](Self::refill).
pub struct MachineInventory<S = HttpLedgerStore> {
    inventory: ResourceInventory,
    store: Option<S>,
    relay: Option<TransportHandle>,
    last_error: Option<String>,
}

impl MachineInventory<HttpLedgerStore> {
    /// A manager with no remote store and no relay: pure local operation.
    pub fn local() -> Self {
        MachineInventory::new(None, None)
    }
}

impl<S: LedgerStore> MachineInventory<S> {
    /// Creates a manager seeded with the standard machine inventory.
    ///
    /// Both collaborators are injected: `store` enables reconciliation,
    /// `relay` enables broadcasts. Either may be absent.
    pub fn new(store: Option<S>, relay: Option<TransportHandle>) -> Self {
        MachineInventory {
            inventory: MACHINE_SEED,
            store,
            relay,
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

    /// Resources at or below their low-stock threshold. Advisory only.
    pub fn low_resources(&self) -> Vec<ResourceKind> {
        self.inventory.low_set(&LOW_THRESHOLDS)
    }

    /// Resets the ledger to its seed value.
    pub fn reset(&mut self) {
        self.inventory = MACHINE_SEED;
        self.last_error = None;
    }

    /// Pure feasibility predicate: can this drink be made right now?
    ///
    /// Checks water/coffee/milk, one cup from the requested bucket, and one
    /// stirrer when sugar was requested. Sugar itself is NOT checked - the
    /// machine carries no sugar stock field, so the only bound on sugar is
    /// the 0-5 per-cup cap (while stirrers, which exist only to stir that
    /// sugar, ARE stocked and debited).
    pub fn can_make(&self, ingredients: &Ingredients) -> bool {
        self.inventory.is_sufficient(&ingredients.required_amounts())
    }

    /// Consumes the resources of one brewed drink.
    ///
    /// On success the drink counts as prepared. On `RemoteSyncFailure` the
    /// ledger has been restored to its pre-call value and the drink is NOT
    /// prepared - the caller must refund any payment it deducted.
    pub async fn consume(&mut self, ingredients: &Ingredients) -> SyncResult<()> {
        let required = ingredients.required_amounts();
        if !self.inventory.is_sufficient(&required) {
            return Err(SyncError::Core(CoreError::InsufficientResources));
        }

        let snapshot = self.inventory;
        self.inventory = self.inventory.debit(&required);
        self.broadcast_inventory().await;

        if let Some(store) = &self.store {
            match store.consume(ingredients).await {
                Ok(authoritative) => {
                    self.inventory = authoritative;
                    self.last_error = None;
                }
                Err(e) => {
                    self.inventory = snapshot;
                    let message = e.to_string();
                    warn!(error = %message, "Consume rejected by store, rolled back");
                    self.last_error = Some(message.clone());
                    return Err(SyncError::RemoteSyncFailure {
                        op: "consume".to_string(),
                        message,
                    });
                }
            }
        }

        Ok(())
    }

    /// Credits refill amounts arriving from the warehouse.
    ///
    /// Remote failures are rolled back silently: they originate on the
    /// warehouse side and must not block the customer-facing machine, so
    /// they are logged and recorded in `last_error` only.
    pub async fn refill(&mut self, amounts: &ResourceAmounts) {
        let snapshot = self.inventory;
        self.inventory = self.inventory.credit(amounts);
        self.broadcast_inventory().await;

        if let Some(store) = &self.store {
            match store.refill(amounts).await {
                Ok(authoritative) => {
                    self.inventory = authoritative;
                    self.last_error = None;
                }
                Err(e) => {
                    self.inventory = snapshot;
                    let message = e.to_string();
                    warn!(error = %message, "Refill rejected by store, rolled back");
                    self.last_error = Some(message);
                }
            }
        }
    }

    /// Fetches the authoritative inventory and replaces local state wholesale.
    ///
    /// On failure the current local state is retained and the error recorded:
    /// degrade-to-local, never a crash. A manager without a store keeps its
    /// local state untouched (`RemoteUnconfigured` is not a failure of the
    /// machine, only of this explicit request for remote state).
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

    /// Replaces the ledger with an inventory observed on the relay.
    ///
    /// Used when an `admin:resource-update` or `client:refill-update`
    /// rebroadcast carries a newer view of this machine's state.
    pub fn apply_remote_update(&mut self, inventory: ResourceInventory) {
        self.inventory = inventory;
    }

    /// Fire-and-forget broadcast of the current ledger value.
    async fn broadcast_inventory(&self) {
        if let Some(relay) = &self.relay {
            let msg = RelayMessage::resource_update(self.inventory);
            if let Err(e) = relay.send(msg).await {
                debug!(?e, "Relay broadcast dropped");
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeStore;
    use kava_core::CupSize;

    /// The standard small espresso: 30ml water, 7g coffee, no milk, no sugar.
    fn espresso() -> Ingredients {
        Ingredients::new(30, 7, 0, 0, CupSize::Small).unwrap()
    }

    #[tokio::test]
    async fn test_consume_espresso_scenario() {
        let mut machine = MachineInventory::local();
        machine.consume(&espresso()).await.unwrap();

        let after = machine.inventory();
        assert_eq!(after.water, 270);
        assert_eq!(after.coffee, 21);
        assert_eq!(after.milk, 300);
        assert_eq!(after.small_cups, 9);
        assert_eq!(after.large_cups, 8);
        assert_eq!(after.stirrers, 10);
    }

    #[tokio::test]
    async fn test_consume_insufficient_leaves_ledger_unchanged() {
        let mut machine = MachineInventory::local();
        let thirsty = Ingredients::new(400, 7, 0, 0, CupSize::Small).unwrap();

        let err = machine.consume(&thirsty).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Core(CoreError::InsufficientResources)
        ));
        assert_eq!(machine.inventory(), MACHINE_SEED);
    }

    #[tokio::test]
    async fn test_consume_debits_stirrer_with_sugar() {
        let mut machine = MachineInventory::local();
        let sweet = Ingredients::new(30, 7, 0, 3, CupSize::Small).unwrap();

        machine.consume(&sweet).await.unwrap();
        assert_eq!(machine.inventory().stirrers, 9);
    }

    #[test]
    fn test_can_make_is_pure_and_idempotent() {
        let machine = MachineInventory::local();
        let before = machine.inventory();
        assert!(machine.can_make(&espresso()));
        assert!(machine.can_make(&espresso()));
        assert_eq!(machine.inventory(), before);
    }

    #[test]
    fn test_can_make_checks_cup_bucket_and_stirrers() {
        let mut machine = MachineInventory::local();
        machine.apply_remote_update(ResourceInventory {
            small_cups: 0,
            stirrers: 0,
            ..MACHINE_SEED
        });

        // Small cup bucket empty
        assert!(!machine.can_make(&espresso()));

        // Large cup fine, until sugar wants a stirrer
        let plain_large = Ingredients::new(30, 7, 0, 0, CupSize::Large).unwrap();
        assert!(machine.can_make(&plain_large));
        let sweet_large = Ingredients::new(30, 7, 0, 1, CupSize::Large).unwrap();
        assert!(!machine.can_make(&sweet_large));
    }

    #[tokio::test]
    async fn test_consume_remote_failure_restores_exact_snapshot() {
        let mut machine =
            MachineInventory::new(Some(FakeStore::failing("sheet offline")), None);

        let err = machine.consume(&espresso()).await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteSyncFailure { .. }));
        assert_eq!(machine.inventory(), MACHINE_SEED);
        assert!(machine.last_error().unwrap().contains("sheet offline"));
    }

    #[tokio::test]
    async fn test_consume_remote_success_replaces_wholesale() {
        let authoritative = ResourceInventory {
            water: 111,
            coffee: 22,
            milk: 33,
            small_cups: 4,
            large_cups: 5,
            stirrers: 6,
        };
        let mut machine = MachineInventory::new(Some(FakeStore::ok(authoritative)), None);

        machine.consume(&espresso()).await.unwrap();
        // Not the locally debited value - the store's answer, field for field
        assert_eq!(machine.inventory(), authoritative);
        assert!(machine.last_error().is_none());
    }

    #[tokio::test]
    async fn test_refill_remote_failure_rolls_back_silently() {
        let mut machine =
            MachineInventory::new(Some(FakeStore::failing("quota exceeded")), None);
        let amounts = ResourceAmounts {
            water: 300,
            ..Default::default()
        };

        machine.refill(&amounts).await;
        assert_eq!(machine.inventory(), MACHINE_SEED);
        assert!(machine.last_error().unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_refill_credits_locally_without_store() {
        let mut machine = MachineInventory::local();
        machine
            .refill(&ResourceAmounts {
                water: 300,
                stirrers: 10,
                ..Default::default()
            })
            .await;
        assert_eq!(machine.inventory().water, 600);
        assert_eq!(machine.inventory().stirrers, 20);
    }

    #[tokio::test]
    async fn test_load_from_remote_replaces_or_degrades() {
        let authoritative = ResourceInventory {
            water: 999,
            ..MACHINE_SEED
        };
        let mut machine = MachineInventory::new(Some(FakeStore::ok(authoritative)), None);
        machine.load_from_remote().await.unwrap();
        assert_eq!(machine.inventory().water, 999);

        let mut machine = MachineInventory::new(Some(FakeStore::failing("timeout")), None);
        let err = machine.load_from_remote().await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteSyncFailure { .. }));
        // Degrade-to-local: state retained
        assert_eq!(machine.inventory(), MACHINE_SEED);
    }

    #[tokio::test]
    async fn test_load_without_store_is_unconfigured() {
        let mut machine = MachineInventory::local();
        assert!(matches!(
            machine.load_from_remote().await,
            Err(SyncError::RemoteUnconfigured)
        ));
    }

    #[tokio::test]
    async fn test_consume_broadcasts_post_debit_inventory() {
        let (relay, mut rx) = TransportHandle::detached();
        let mut machine = MachineInventory::<HttpLedgerStore>::new(None, Some(relay));

        machine.consume(&espresso()).await.unwrap();

        match rx.recv().await.unwrap() {
            RelayMessage::ClientResourceUpdate(update) => {
                assert_eq!(update.inventory.water, 270);
                assert_eq!(update.inventory.small_cups, 9);
            }
            other => panic!("expected client:resource-update, got {}", other.type_name()),
        }
    }

    #[tokio::test]
    async fn test_low_resources_after_draining() {
        let mut machine = MachineInventory::local();
        assert!(machine.low_resources().is_empty());

        machine.apply_remote_update(ResourceInventory {
            water: 100,
            small_cups: 5,
            ..MACHINE_SEED
        });
        assert_eq!(
            machine.low_resources(),
            vec![ResourceKind::Water, ResourceKind::SmallCups]
        );
    }

    #[tokio::test]
    async fn test_reset_restores_seed() {
        let mut machine = MachineInventory::local();
        machine.consume(&espresso()).await.unwrap();
        machine.reset();
        assert_eq!(machine.inventory(), MACHINE_SEED);
        assert!(machine.last_error().is_none());
    }
}

//! # Vending Orchestration
//!
//! Ties payment and consumption together for one customer order. The money
//! contract: a failed consumption must look like "nothing happened to your
//! money or your cup" - so a payment deducted before a consume that
//! ultimately fails (including its remote round-trip) is refunded in full.
//!
//! ## Order Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         One Customer Order                              │
//! │                                                                         │
//! │  select(kind) ──► insert_coin()* ──► adjust_sugar()* ──► brew()         │
//! │                                                            │            │
//! │                              ┌─────────────────────────────┤            │
//! │                              ▼                             ▼            │
//! │                      deduct price                   consume resources   │
//! │                              │                             │            │
//! │                              │          err ◄──────────────┤            │
//! │                              │           │                 │ ok         │
//! │                              │     REFUND price            ▼            │
//! │                              │     (deposit whole     take_drink()      │
//! │                              │      again)            returns change    │
//! │                              ▼                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use kava_core::{CoreError, Deposit, DrinkKind, Ingredients, Money, Recipe, MAX_SUGAR};

use crate::error::SyncResult;
use crate::machine::MachineInventory;
use crate::store::{HttpLedgerStore, LedgerStore};

/// One vending session: the machine's ledger plus the current order state.
pub struct VendingMachine<S = HttpLedgerStore> {
    machine: MachineInventory<S>,
    deposit: Deposit,
    selected: Option<DrinkKind>,
    sugar: u8,
}

impl VendingMachine<HttpLedgerStore> {
    /// A vending machine with no remote store and no relay.
    pub fn local() -> Self {
        VendingMachine::new(MachineInventory::local())
    }
}

impl<S: LedgerStore> VendingMachine<S> {
    /// Wraps an inventory manager into a vending session.
    pub fn new(machine: MachineInventory<S>) -> Self {
        VendingMachine {
            machine,
            deposit: Deposit::new(),
            selected: None,
            sugar: 0,
        }
    }

    /// The underlying inventory manager.
    pub fn machine(&self) -> &MachineInventory<S> {
        &self.machine
    }

    /// Mutable access for refills and remote loads.
    pub fn machine_mut(&mut self) -> &mut MachineInventory<S> {
        &mut self.machine
    }

    /// The current deposit.
    pub fn deposit(&self) -> &Deposit {
        &self.deposit
    }

    /// Selects a drink and sets the price the deposit must cover.
    pub fn select(&mut self, kind: DrinkKind) {
        self.selected = Some(kind);
        self.deposit.set_required(Recipe::find(kind).price);
    }

    /// Adds a coin to the deposit.
    pub fn insert_coin(&mut self, amount: Money) {
        self.deposit.insert_coin(amount);
    }

    /// Adjusts the sugar amount, clamped to the 0-5 per-cup range.
    pub fn adjust_sugar(&mut self, delta: i8) {
        let adjusted = self.sugar as i16 + delta as i16;
        self.sugar = adjusted.clamp(0, MAX_SUGAR as i16) as u8;
    }

    /// Selected sugar amount.
    pub fn sugar(&self) -> u8 {
        self.sugar
    }

    /// True when a selected drink is both paid for and feasible.
    pub fn can_brew(&self) -> bool {
        let Some(kind) = self.selected else {
            return false;
        };
        if !self.deposit.has_sufficient_funds() {
            return false;
        }
        let recipe = Recipe::find(kind);
        match Ingredients::for_recipe(&recipe, self.sugar) {
            Ok(ingredients) => self.machine.can_make(&ingredients),
            Err(_) => false,
        }
    }

    /// Brews the selected drink: deduct payment, consume resources.
    ///
    /// If consumption fails for any reason - a local shortage or a remote
    /// rejection after the optimistic debit - the deducted payment is
    /// refunded before the error is returned: the customer's money and the
    /// ledger both end exactly where they started.
    pub async fn brew(&mut self) -> SyncResult<()> {
        let kind = self.selected.ok_or(CoreError::NothingSelected)?;
        let recipe = Recipe::find(kind);
        let ingredients = Ingredients::for_recipe(&recipe, self.sugar)?;

        self.deposit.deduct(recipe.price)?;

        if let Err(e) = self.machine.consume(&ingredients).await {
            self.deposit.refund(recipe.price);
            return Err(e);
        }

        Ok(())
    }

    /// Hands over the drink, returning the change and clearing the order.
    pub fn take_drink(&mut self) -> Money {
        self.selected = None;
        self.sugar = 0;
        self.deposit.return_change()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::testutil::FakeStore;
    use kava_core::MACHINE_SEED;

    #[tokio::test]
    async fn test_brew_deducts_payment_and_resources() {
        let mut vending = VendingMachine::local();
        vending.select(DrinkKind::Espresso); // 1.20
        vending.insert_coin(Money::from_cents(150));
        assert!(vending.can_brew());

        vending.brew().await.unwrap();
        assert_eq!(vending.deposit().balance(), Money::from_cents(30));
        assert_eq!(vending.machine().inventory().water, 270);

        let change = vending.take_drink();
        assert_eq!(change, Money::from_cents(30));
        assert_eq!(vending.deposit().balance(), Money::zero());
    }

    #[tokio::test]
    async fn test_brew_without_funds_fails_before_consumption() {
        let mut vending = VendingMachine::local();
        vending.select(DrinkKind::Latte); // 2.00
        vending.insert_coin(Money::from_cents(50));
        assert!(!vending.can_brew());

        let err = vending.brew().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Core(CoreError::InsufficientFunds { .. })
        ));
        assert_eq!(vending.machine().inventory(), MACHINE_SEED);
        assert_eq!(vending.deposit().balance(), Money::from_cents(50));
    }

    #[tokio::test]
    async fn test_remote_failure_refunds_payment() {
        let machine = MachineInventory::new(Some(FakeStore::failing("sheet offline")), None);
        let mut vending = VendingMachine::new(machine);
        vending.select(DrinkKind::Espresso);
        vending.insert_coin(Money::from_cents(120));

        let err = vending.brew().await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteSyncFailure { .. }));

        // Nothing happened to the money or the cup
        assert_eq!(vending.deposit().balance(), Money::from_cents(120));
        assert_eq!(vending.machine().inventory(), MACHINE_SEED);
    }

    #[tokio::test]
    async fn test_brew_without_selection() {
        let mut vending = VendingMachine::local();
        assert!(!vending.can_brew());
        assert!(matches!(
            vending.brew().await,
            Err(SyncError::Core(CoreError::NothingSelected))
        ));
    }

    #[test]
    fn test_adjust_sugar_clamps_to_range() {
        let mut vending = VendingMachine::local();
        vending.adjust_sugar(3);
        assert_eq!(vending.sugar(), 3);
        vending.adjust_sugar(5);
        assert_eq!(vending.sugar(), 5);
        vending.adjust_sugar(-9);
        assert_eq!(vending.sugar(), 0);
    }

    #[tokio::test]
    async fn test_sweet_brew_uses_a_stirrer() {
        let mut vending = VendingMachine::local();
        vending.select(DrinkKind::Cappuccino); // 1.80
        vending.adjust_sugar(2);
        vending.insert_coin(Money::from_cents(200));

        vending.brew().await.unwrap();
        assert_eq!(vending.machine().inventory().stirrers, 9);
    }
}

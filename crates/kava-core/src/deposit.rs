//! # Coin Deposit
//!
//! Pure arithmetic for the payment collaborator: coins in, price deducted,
//! change out. The vending flow in kava-sync orchestrates this against
//! resource consumption - if consumption ultimately fails, the deducted
//! payment is refunded so the customer sees "nothing happened".

use crate::error::CoreError;
use crate::money::Money;

/// Accepted coin denominations, in cents.
pub const COIN_VALUES: [Money; 4] = [
    Money::from_cents(1),
    Money::from_cents(2),
    Money::from_cents(5),
    Money::from_cents(10),
];

/// Default coin for the "insert coin" action.
pub const DEFAULT_COIN: Money = Money::from_cents(10);

/// The current deposit: balance inserted so far and the price to cover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deposit {
    balance: Money,
    required: Money,
}

impl Deposit {
    pub fn new() -> Self {
        Deposit::default()
    }

    /// Balance inserted so far.
    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Price of the selected drink.
    pub fn required(&self) -> Money {
        self.required
    }

    /// Adds a coin to the balance.
    pub fn insert_coin(&mut self, amount: Money) {
        self.balance += amount;
    }

    /// Sets the price the balance must cover.
    pub fn set_required(&mut self, amount: Money) {
        self.required = amount;
    }

    /// True iff the balance covers the required price.
    pub fn has_sufficient_funds(&self) -> bool {
        self.balance >= self.required
    }

    /// Change owed at the current balance (never negative).
    pub fn change(&self) -> Money {
        self.balance.saturating_sub(self.required)
    }

    /// Deducts a payment from the balance.
    ///
    /// Fails with `InsufficientFunds` and no mutation when the balance is
    /// below the amount.
    pub fn deduct(&mut self, amount: Money) -> Result<(), CoreError> {
        if self.balance < amount {
            return Err(CoreError::InsufficientFunds {
                required: amount.cents(),
                available: self.balance.cents(),
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Refunds a previously deducted payment.
    pub fn refund(&mut self, amount: Money) {
        self.balance += amount;
    }

    /// Returns the change and clears the deposit for the next order.
    pub fn return_change(&mut self) -> Money {
        let change = self.change();
        self.balance = Money::zero();
        self.required = Money::zero();
        change
    }

    /// Clears balance and required price.
    pub fn reset(&mut self) {
        *self = Deposit::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_deduct() {
        let mut deposit = Deposit::new();
        deposit.insert_coin(DEFAULT_COIN);
        deposit.insert_coin(DEFAULT_COIN);
        assert_eq!(deposit.balance(), Money::from_cents(20));

        deposit.deduct(Money::from_cents(15)).unwrap();
        assert_eq!(deposit.balance(), Money::from_cents(5));
    }

    #[test]
    fn test_deduct_below_balance_fails_without_mutation() {
        let mut deposit = Deposit::new();
        deposit.insert_coin(Money::from_cents(10));

        let err = deposit.deduct(Money::from_cents(120)).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientFunds { .. }));
        assert_eq!(deposit.balance(), Money::from_cents(10));
    }

    #[test]
    fn test_change_and_return() {
        let mut deposit = Deposit::new();
        deposit.set_required(Money::from_cents(120));
        deposit.insert_coin(Money::from_cents(100));
        assert!(!deposit.has_sufficient_funds());
        assert_eq!(deposit.change(), Money::zero());

        deposit.insert_coin(Money::from_cents(50));
        assert!(deposit.has_sufficient_funds());
        assert_eq!(deposit.change(), Money::from_cents(30));

        deposit.deduct(Money::from_cents(120)).unwrap();
        assert_eq!(deposit.return_change(), Money::from_cents(30));
        assert_eq!(deposit.balance(), Money::zero());
    }

    #[test]
    fn test_refund_restores_deducted_payment() {
        let mut deposit = Deposit::new();
        deposit.insert_coin(Money::from_cents(120));
        deposit.deduct(Money::from_cents(120)).unwrap();
        deposit.refund(Money::from_cents(120));
        assert_eq!(deposit.balance(), Money::from_cents(120));
    }
}

//! # kava-core: Pure Business Logic for Kava
//!
//! This crate is the **heart** of Kava. It contains all business logic for
//! the two-tier coffee vending machine as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kava Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Client View / Admin View (TypeScript)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ WebSocket / HTTP                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kava-sync (network layer)                    │   │
//! │  │    relay hub, transport, remote ledger store, managers          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kava-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ inventory │  │  recipe   │  │  deposit  │  │   money   │  │   │
//! │  │   │  Ledger   │  │   Menu    │  │   Coins   │  │   Money   │  │   │
//! │  │   │  ops      │  │Ingredients│  │  Balance  │  │   cents   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`inventory`] - The resource ledger: quantities and the arithmetic rules
//!   governing debits/credits
//! - [`recipe`] - Drink recipes, cup sizes and consumption requests
//! - [`deposit`] - Coin deposit arithmetic for the payment collaborator
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Network and file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod deposit;
pub mod error;
pub mod inventory;
pub mod money;
pub mod recipe;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use kava_core::ResourceInventory` instead of
// `use kava_core::inventory::ResourceInventory`

pub use deposit::Deposit;
pub use error::{CoreError, CoreResult};
pub use inventory::{
    ResourceAmounts, ResourceInventory, ResourceKind, LOW_THRESHOLDS, MACHINE_SEED,
    PURCHASE_AMOUNTS, REFILL_BUNDLE, WAREHOUSE_SEED,
};
pub use money::Money;
pub use recipe::{CupSize, DrinkKind, Ingredients, Recipe, MENU};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum teaspoons of sugar per cup.
pub const MIN_SUGAR: u8 = 0;

/// Maximum teaspoons of sugar per cup.
///
/// ## Business Reason
/// The dosing unit physically holds five spoons per brew cycle. This is the
/// only bound on sugar: cumulative draw is not tracked against a stock field.
pub const MAX_SUGAR: u8 = 5;

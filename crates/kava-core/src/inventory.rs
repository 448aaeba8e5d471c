//! # Resource Ledger
//!
//! The shared inventory data model and the arithmetic rules governing
//! debits and credits. Both tiers (client machine and warehouse) keep their
//! quantities in a [`ResourceInventory`] and mutate it exclusively through
//! the pure operations defined here.
//!
//! ## Ledger Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Ledger Invariants                              │
//! │                                                                         │
//! │  1. Every field ≥ 0 at rest.                                           │
//! │  2. An operation that would drive a field negative is rejected          │
//! │     BEFORE mutation (is_sufficient first) - never clamped silently.     │
//! │  3. debit() assumes the caller already verified sufficiency;            │
//! │     violating that is a programming error, not a recoverable one.       │
//! │  4. credit() has no upper bound - capacity is advisory, not enforced.   │
//! │                                                                         │
//! │  check ──► snapshot ──► debit/credit ──► (network) ──► replace/rollback │
//! │  (the snapshot/rollback halves live in kava-sync; the arithmetic        │
//! │   halves live here)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why explicit per-field code?
//! The original system iterated record entries reflectively to apply partial
//! updates. Here every mutation path names all six fields, so a missing field
//! is a compile error rather than a silent no-op.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Resource Kind
// =============================================================================

/// The six consumable resources tracked by both ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    /// Water, millilitres.
    Water,
    /// Ground coffee, grams.
    Coffee,
    /// Milk, millilitres.
    Milk,
    /// Small cups, count.
    SmallCups,
    /// Large cups, count.
    LargeCups,
    /// Stirrers, count.
    Stirrers,
}

impl ResourceKind {
    /// All six resources, in ledger field order.
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Water,
        ResourceKind::Coffee,
        ResourceKind::Milk,
        ResourceKind::SmallCups,
        ResourceKind::LargeCups,
        ResourceKind::Stirrers,
    ];

    /// Wire name of this resource (matches the JSON field name).
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Water => "water",
            ResourceKind::Coffee => "coffee",
            ResourceKind::Milk => "milk",
            ResourceKind::SmallCups => "smallCups",
            ResourceKind::LargeCups => "largeCups",
            ResourceKind::Stirrers => "stirrers",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "water" => Ok(ResourceKind::Water),
            "coffee" => Ok(ResourceKind::Coffee),
            "milk" => Ok(ResourceKind::Milk),
            "smallCups" => Ok(ResourceKind::SmallCups),
            "largeCups" => Ok(ResourceKind::LargeCups),
            "stirrers" => Ok(ResourceKind::Stirrers),
            other => Err(CoreError::UnknownResource(other.to_string())),
        }
    }
}

// =============================================================================
// Resource Inventory
// =============================================================================

/// A tier's in-memory record of resource quantities (the "ledger").
///
/// ## Field Units
/// - `water` / `milk`: millilitres
/// - `coffee`: grams
/// - `small_cups` / `large_cups` / `stirrers`: count
///
/// Serialized camelCase so the wire payloads and the spreadsheet-backed
/// remote store see `smallCups` / `largeCups`, same as the TS views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInventory {
    pub water: i64,
    pub coffee: i64,
    pub milk: i64,
    pub small_cups: i64,
    pub large_cups: i64,
    pub stirrers: i64,
}

/// Partial quantities applied to a ledger.
///
/// A zero field means "not specified" - debits and credits of zero are
/// no-ops, so partial updates are expressed without option-wrapping every
/// field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceAmounts {
    pub water: i64,
    pub coffee: i64,
    pub milk: i64,
    pub small_cups: i64,
    pub large_cups: i64,
    pub stirrers: i64,
}

impl ResourceAmounts {
    /// Amounts touching a single resource.
    pub const fn of(kind: ResourceKind, amount: i64) -> Self {
        let mut amounts = ResourceAmounts {
            water: 0,
            coffee: 0,
            milk: 0,
            small_cups: 0,
            large_cups: 0,
            stirrers: 0,
        };
        match kind {
            ResourceKind::Water => amounts.water = amount,
            ResourceKind::Coffee => amounts.coffee = amount,
            ResourceKind::Milk => amounts.milk = amount,
            ResourceKind::SmallCups => amounts.small_cups = amount,
            ResourceKind::LargeCups => amounts.large_cups = amount,
            ResourceKind::Stirrers => amounts.stirrers = amount,
        }
        amounts
    }

    /// Quantity for one resource.
    pub const fn get(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Water => self.water,
            ResourceKind::Coffee => self.coffee,
            ResourceKind::Milk => self.milk,
            ResourceKind::SmallCups => self.small_cups,
            ResourceKind::LargeCups => self.large_cups,
            ResourceKind::Stirrers => self.stirrers,
        }
    }
}

impl ResourceInventory {
    /// Quantity for one resource.
    pub const fn get(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Water => self.water,
            ResourceKind::Coffee => self.coffee,
            ResourceKind::Milk => self.milk,
            ResourceKind::SmallCups => self.small_cups,
            ResourceKind::LargeCups => self.large_cups,
            ResourceKind::Stirrers => self.stirrers,
        }
    }

    /// Returns true iff every specified amount is covered by this ledger.
    ///
    /// This is the gate every debit must pass first. Zero fields in
    /// `required` are trivially covered.
    pub const fn is_sufficient(&self, required: &ResourceAmounts) -> bool {
        self.water >= required.water
            && self.coffee >= required.coffee
            && self.milk >= required.milk
            && self.small_cups >= required.small_cups
            && self.large_cups >= required.large_cups
            && self.stirrers >= required.stirrers
    }

    /// Subtracts each specified amount, returning the new ledger value.
    ///
    /// ## Precondition
    /// The caller has already verified [`is_sufficient`](Self::is_sufficient).
    /// Calling `debit` without that check is a programming error - the
    /// `debug_assert` exists to catch it in tests, not to make the case
    /// recoverable.
    #[must_use]
    pub fn debit(&self, amounts: &ResourceAmounts) -> ResourceInventory {
        debug_assert!(
            self.is_sufficient(amounts),
            "debit without a sufficiency check"
        );
        ResourceInventory {
            water: self.water - amounts.water,
            coffee: self.coffee - amounts.coffee,
            milk: self.milk - amounts.milk,
            small_cups: self.small_cups - amounts.small_cups,
            large_cups: self.large_cups - amounts.large_cups,
            stirrers: self.stirrers - amounts.stirrers,
        }
    }

    /// Adds each specified amount, returning the new ledger value.
    ///
    /// No upper bound is enforced here: physical capacity is a display
    /// concern, not a ledger invariant.
    #[must_use]
    pub fn credit(&self, amounts: &ResourceAmounts) -> ResourceInventory {
        ResourceInventory {
            water: self.water + amounts.water,
            coffee: self.coffee + amounts.coffee,
            milk: self.milk + amounts.milk,
            small_cups: self.small_cups + amounts.small_cups,
            large_cups: self.large_cups + amounts.large_cups,
            stirrers: self.stirrers + amounts.stirrers,
        }
    }

    /// Resources at or below their threshold.
    ///
    /// Purely advisory: a low resource never blocks an operation, it only
    /// flags the tier for a refill.
    pub fn low_set(&self, thresholds: &ResourceInventory) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind) <= thresholds.get(*kind))
            .collect()
    }
}

// =============================================================================
// Seed Values & Bundles
// =============================================================================
// Both ledgers are created from these fixed seeds at session start and reset
// to them on an explicit reset action. Only the remote store (if configured)
// persists anything across sessions.

/// Initial inventory for the client machine (enough for ~2 cups of each drink).
pub const MACHINE_SEED: ResourceInventory = ResourceInventory {
    water: 300,
    coffee: 28,
    milk: 300,
    small_cups: 10,
    large_cups: 8,
    stirrers: 10,
};

/// Initial warehouse inventory.
pub const WAREHOUSE_SEED: ResourceInventory = ResourceInventory {
    water: 10_000,
    coffee: 1_000,
    milk: 5_000,
    small_cups: 100,
    large_cups: 100,
    stirrers: 200,
};

/// Low-stock alert thresholds (~1 cup worth).
pub const LOW_THRESHOLDS: ResourceInventory = ResourceInventory {
    water: 150,
    coffee: 14,
    milk: 150,
    small_cups: 5,
    large_cups: 4,
    stirrers: 5,
};

/// How much one warehouse purchase adds, per resource (5 portions).
pub const PURCHASE_AMOUNTS: ResourceInventory = ResourceInventory {
    water: 750,
    coffee: 70,
    milk: 750,
    small_cups: 25,
    large_cups: 20,
    stirrers: 25,
};

/// The fixed bundle one refill moves from warehouse to machine (~2 cups worth).
pub const REFILL_BUNDLE: ResourceAmounts = ResourceAmounts {
    water: 300,
    coffee: 28,
    milk: 300,
    small_cups: 10,
    large_cups: 8,
    stirrers: 10,
};

// =============================================================================
// Unit Tests
// =============================================================================

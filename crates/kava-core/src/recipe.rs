//! # Drinks & Recipes
//!
//! The static drink menu and the [`Ingredients`] consumption request that
//! flows from a brewing action into the ledger.
//!
//! ## Type Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Recipe ──► Ingredients                          │
//! │                                                                         │
//! │  Recipe (static config)           Ingredients (per-order request)       │
//! │  ────────────────────────         ──────────────────────────────        │
//! │  kind, name, price                water, coffee, milk  (from base)      │
//! │  base: water/coffee/milk/cup  +   sugar      (0-5, user adjusted)       │
//! │  preparation_secs                 stirrer    (derived: sugar > 0)       │
//! │                                                                         │
//! │  Ingredients::required_amounts() maps the request onto ledger fields:   │
//! │    cup == Small ──► small_cups: 1        stirrer ──► stirrers: 1        │
//! │    cup == Large ──► large_cups: 1                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Recipes are configuration, not ledger state: they are immutable, keyed by
//! drink kind, and independent of sugar (sugar is adjusted per order).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::inventory::ResourceAmounts;
use crate::money::Money;
use crate::MAX_SUGAR;

// =============================================================================
// Cup Size
// =============================================================================

/// Which cup bucket a drink draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CupSize {
    Small,
    Large,
}

// =============================================================================
// Drink Kind
// =============================================================================

/// The nine drinks on the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DrinkKind {
    Espresso,
    EspressoDouble,
    Americano,
    CoffeeWithMilk,
    Cappuccino,
    Latte,
    Macchiato,
    HotMilk,
    HotWater,
}

// =============================================================================
// Ingredients
// =============================================================================

/// A consumption request: what one brewed drink draws from the ledger.
///
/// `stirrer` is derived, not independently settable: it is true iff
/// `sugar > 0`. Construction enforces both that rule and the 0-5 sugar cap,
/// so an `Ingredients` value is valid by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ingredients {
    /// Water, millilitres.
    pub water: i64,
    /// Ground coffee, grams.
    pub coffee: i64,
    /// Milk, millilitres.
    pub milk: i64,
    /// Teaspoons of sugar, 0-5.
    pub sugar: u8,
    /// Cup bucket to draw from.
    pub cup: CupSize,
    /// True iff sugar > 0.
    pub stirrer: bool,
}

impl Ingredients {
    /// Builds a consumption request, enforcing the sugar cap and the
    /// derived-stirrer rule.
    pub fn new(
        water: i64,
        coffee: i64,
        milk: i64,
        sugar: u8,
        cup: CupSize,
    ) -> Result<Self, CoreError> {
        if sugar > MAX_SUGAR {
            return Err(CoreError::SugarOutOfRange(sugar));
        }
        Ok(Ingredients {
            water,
            coffee,
            milk,
            sugar,
            cup,
            stirrer: sugar > 0,
        })
    }

    /// The consumption request for a recipe with the given sugar amount.
    pub fn for_recipe(recipe: &Recipe, sugar: u8) -> Result<Self, CoreError> {
        Ingredients::new(
            recipe.base.water,
            recipe.base.coffee,
            recipe.base.milk,
            sugar,
            recipe.base.cup,
        )
    }

    /// Maps this request onto ledger fields.
    ///
    /// Sugar is intentionally absent: the ledger carries no sugar stock and
    /// the only bound on sugar is the 0-5 per-cup cap.
    pub fn required_amounts(&self) -> ResourceAmounts {
        ResourceAmounts {
            water: self.water,
            coffee: self.coffee,
            milk: self.milk,
            small_cups: if self.cup == CupSize::Small { 1 } else { 0 },
            large_cups: if self.cup == CupSize::Large { 1 } else { 0 },
            stirrers: if self.stirrer { 1 } else { 0 },
        }
    }
}

// =============================================================================
// Recipe
// =============================================================================

/// Base ingredients of a recipe, independent of sugar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BaseIngredients {
    pub water: i64,
    pub coffee: i64,
    pub milk: i64,
    pub cup: CupSize,
}

/// An immutable menu entry.
///
/// Serialize-only: recipes are compiled-in configuration, never parsed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Recipe {
    pub kind: DrinkKind,
    pub name: &'static str,
    /// Price in cents.
    pub price: Money,
    pub base: BaseIngredients,
    /// Brewing time, seconds.
    pub preparation_secs: u64,
}

const fn recipe(
    kind: DrinkKind,
    name: &'static str,
    price_cents: i64,
    water: i64,
    coffee: i64,
    milk: i64,
    cup: CupSize,
    preparation_secs: u64,
) -> Recipe {
    Recipe {
        kind,
        name,
        price: Money::from_cents(price_cents),
        base: BaseIngredients {
            water,
            coffee,
            milk,
            cup,
        },
        preparation_secs,
    }
}

/// The full drink menu.
pub const MENU: [Recipe; 9] = [
    recipe(DrinkKind::Espresso, "Cortado", 120, 30, 7, 0, CupSize::Small, 20),
    recipe(DrinkKind::EspressoDouble, "Cafe solo", 120, 60, 14, 0, CupSize::Small, 25),
    recipe(DrinkKind::Americano, "Cafe americano", 150, 150, 7, 0, CupSize::Large, 25),
    recipe(DrinkKind::CoffeeWithMilk, "Cafe con leche", 160, 50, 7, 100, CupSize::Large, 30),
    recipe(DrinkKind::Cappuccino, "Capuchino", 180, 30, 7, 100, CupSize::Large, 35),
    recipe(DrinkKind::Latte, "Latte", 200, 30, 7, 150, CupSize::Large, 35),
    recipe(DrinkKind::Macchiato, "Macchiato", 140, 30, 7, 20, CupSize::Small, 25),
    recipe(DrinkKind::HotMilk, "Leche caliente", 100, 0, 0, 150, CupSize::Small, 15),
    recipe(DrinkKind::HotWater, "Agua caliente", 50, 150, 0, 0, CupSize::Small, 10),
];

impl Recipe {
    /// Looks up the menu entry for a drink kind.
    pub fn find(kind: DrinkKind) -> Recipe {
        // MENU covers every DrinkKind variant, so the lookup cannot miss.
        MENU.iter()
            .copied()
            .find(|r| r.kind == kind)
            .unwrap_or(MENU[0])
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

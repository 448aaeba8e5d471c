//! # Error Types
//!
//! Domain-specific error types for kava-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kava-core errors (this file)                                          │
//! │  └── CoreError        - Ledger / recipe / payment rule violations      │
//! │                                                                         │
//! │  kava-sync errors (separate crate)                                     │
//! │  └── SyncError        - Transport, relay and remote store failures     │
//! │                                                                         │
//! │  Flow: CoreError → SyncError → caller / UI                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (resource name, amounts, etc.)
//! 3. Errors are enum variants, never String
//! 4. Expected failures are returned as values, never raised as panics

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The client machine cannot cover a consumption request.
    ///
    /// ## When This Occurs
    /// - A drink needs more water/coffee/milk than the machine holds
    /// - The requested cup bucket is empty
    /// - Sugar was requested but no stirrers remain
    ///
    /// ## User Workflow
    /// ```text
    /// Select drink ──► can_make? ──► InsufficientResources
    ///                                      │
    ///                                      ▼
    ///                       UI shows: "Out of large cups"
    /// ```
    #[error("Insufficient resources to prepare the drink")]
    InsufficientResources,

    /// The warehouse cannot cover a transfer of the requested size.
    ///
    /// Always checked before mutation, never after.
    #[error("Insufficient stock of {resource}: available {available}, requested {requested}")]
    InsufficientStock {
        resource: String,
        available: i64,
        requested: i64,
    },

    /// Deposit balance is below the amount being deducted.
    #[error("Insufficient funds: required {required}, deposited {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// Sugar amount outside the per-cup range.
    #[error("Sugar amount {0} is outside the allowed range 0-5")]
    SugarOutOfRange(u8),

    /// A brew was requested before any drink was selected.
    #[error("No drink selected")]
    NothingSelected,

    /// A resource name that is not one of the six ledger fields.
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// A drink type with no recipe on the menu.
    #[error("Unknown drink: {0}")]
    UnknownDrink(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            resource: "water".to_string(),
            available: 100,
            requested: 300,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock of water: available 100, requested 300"
        );
    }

    #[test]
    fn test_sugar_error_message() {
        let err = CoreError::SugarOutOfRange(9);
        assert!(err.to_string().contains('9'));
    }
}

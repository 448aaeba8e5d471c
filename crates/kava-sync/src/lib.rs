//! # kava-sync: Synchronization Layer for Kava
//!
//! This crate keeps the two inventory tiers (client machine and warehouse)
//! and every connected view loosely in agreement, through a real-time relay
//! and an optional spreadsheet-backed remote store per tier.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kava Sync Architecture                           │
//! │                                                                         │
//! │   ┌─────────────┐            ┌─────────────┐            ┌───────────┐  │
//! │   │ Client view │◄──────────►│ RelayServer │◄──────────►│Admin view │  │
//! │   │ (machine)   │  Transport │  (axum ws)  │  Transport │(warehouse)│  │
//! │   └──────┬──────┘            └─────────────┘            └─────┬─────┘  │
//! │          │                                                    │        │
//! │   ┌──────▼────────────┐                          ┌────────────▼──────┐ │
//! │   │ MachineInventory  │                          │WarehouseInventory │ │
//! │   │                   │                          │                   │ │
//! │   │ can_make          │     restock::            │ purchase          │ │
//! │   │ consume           │◄── refill_machine() ────►│ transfer_to_client│ │
//! │   │ refill            │    (two independent      │ sync_to_remote    │ │
//! │   │ load_from_remote  │     halves, best effort) │ load_from_remote  │ │
//! │   └──────┬────────────┘                          └────────────┬──────┘ │
//! │          │                                                    │        │
//! │   ┌──────▼────────────┐                          ┌────────────▼──────┐ │
//! │   │ HttpLedgerStore   │                          │ HttpLedgerStore   │ │
//! │   │ (machine tier)    │                          │ (warehouse tier)  │ │
//! │   └───────────────────┘                          └───────────────────┘ │
//! │                                                                         │
//! │  CONSISTENCY MODEL:                                                    │
//! │  ──────────────────                                                    │
//! │  • Optimistic local mutation, snapshot rollback on remote failure      │
//! │  • A successful store call's inventory REPLACES local state wholesale  │
//! │  • Relay broadcasts are fire-and-forget, at-most-once, unordered       │
//! │    across event classes                                                │
//! │  • No mutex serializes operations per ledger: concurrent calls can     │
//! │    interleave optimistic updates (accepted race window)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types
//! - [`machine`] - Client machine inventory manager
//! - [`protocol`] - Relay wire events
//! - [`relay`] - The broadcast hub (axum WebSocket server)
//! - [`restock`] - Warehouse-to-machine refill orchestration
//! - [`store`] - Remote ledger store HTTP client
//! - [`transport`] - Relay client with reconnection
//! - [`vending`] - Payment + consumption orchestration
//! - [`warehouse`] - Warehouse inventory manager
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kava_sync::{KavaConfig, MachineInventory, Transport, VendingMachine};
//!
//! let config = KavaConfig::load_or_default(None);
//!
//! // Connect to the relay (reconnects automatically with backoff)
//! let (relay, mut incoming) = Transport::spawn(config.transport_config()?);
//!
//! // Wire the machine manager to its store and the relay
//! let store = config.machine_store.client()?;
//! let machine = MachineInventory::new(store, Some(relay));
//! let mut vending = VendingMachine::new(machine);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod machine;
pub mod protocol;
pub mod relay;
pub mod restock;
pub mod store;
pub mod transport;
pub mod vending;
pub mod warehouse;

#[cfg(test)]
pub(crate) mod testutil;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{KavaConfig, RelaySettings, StoreSettings, TransportSettings};
pub use error::{SyncError, SyncResult};
pub use machine::MachineInventory;
pub use protocol::{RefillUpdate, RelayMessage, ResourceUpdate};
pub use relay::{RelayConfig, RelayHandle, RelayServer};
pub use restock::refill_machine;
pub use store::{HttpLedgerStore, LedgerStore};
pub use transport::{ConnectionState, Transport, TransportConfig, TransportHandle};
pub use vending::VendingMachine;
pub use warehouse::WarehouseInventory;

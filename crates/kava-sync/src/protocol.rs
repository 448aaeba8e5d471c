//! # Relay Wire Protocol
//!
//! Message types for the real-time relay channel.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Relay Wire Events                                 │
//! │                                                                         │
//! │  HANDSHAKE                                                             │
//! │  ─────────                                                             │
//! │  RELAY ───► connection:established                    (on connect)      │
//! │                                                                         │
//! │  RESOURCE UPDATES (machine ──► admin views)                            │
//! │  ──────────────────────────────────────────                            │
//! │  PARTY ───► client:resource-update { inventory, timestamp }            │
//! │  RELAY ───► admin:resource-update  { inventory, timestamp } (broadcast │
//! │             to every OTHER party - the origin gets no echo)            │
//! │                                                                         │
//! │  REFILLS (admin view ──► machines)                                     │
//! │  ─────────────────────────────────                                     │
//! │  PARTY ───► admin:refill         { amounts, timestamp }                │
//! │  RELAY ───► client:refill-update { amounts, timestamp }  (broadcast    │
//! │             to every party)                                            │
//! │                                                                         │
//! │  Payloads pass through the relay UNCHANGED. Delivery is fire-and-      │
//! │  forget: no acks, no ordering across event classes, per-channel        │
//! │  arrival order only.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format (JSON)
//! Messages are serialized as tagged JSON using serde's adjacently tagged
//! enum, with the tag carrying the event name:
//! ```json
//! { "type": "client:resource-update", "payload": { "inventory": { ... }, "timestamp": 1719... } }
//! ```

use serde::{Deserialize, Serialize};

use kava_core::{ResourceAmounts, ResourceInventory};

/// Milliseconds since the Unix epoch, the wire timestamp unit.
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// Main Message Enum (Tagged Union)
// =============================================================================

/// All relay wire events.
///
/// Uses serde's adjacently tagged enum for clean JSON serialization:
/// `{ "type": "client:resource-update", "payload": { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum RelayMessage {
    /// Acknowledgment sent by the relay as soon as a party connects.
    #[serde(rename = "connection:established")]
    ConnectionEstablished,

    /// A machine-side mutation announcing its new inventory.
    #[serde(rename = "client:resource-update")]
    ClientResourceUpdate(ResourceUpdate),

    /// Relay rebroadcast of a resource update, as seen by admin views.
    #[serde(rename = "admin:resource-update")]
    AdminResourceUpdate(ResourceUpdate),

    /// An admin-side refill action.
    #[serde(rename = "admin:refill")]
    AdminRefill(RefillUpdate),

    /// Relay rebroadcast of a refill, as seen by client machines.
    #[serde(rename = "client:refill-update")]
    ClientRefillUpdate(RefillUpdate),
}

// =============================================================================
// Payloads
// =============================================================================

/// Payload of a resource-update event: the full post-mutation inventory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceUpdate {
    pub inventory: ResourceInventory,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Payload of a refill event: the partial amounts credited to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefillUpdate {
    pub amounts: ResourceAmounts,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

// =============================================================================
// Helper Functions
// =============================================================================

impl RelayMessage {
    /// Returns the wire event name (for logging).
    pub fn type_name(&self) -> &'static str {
        match self {
            RelayMessage::ConnectionEstablished => "connection:established",
            RelayMessage::ClientResourceUpdate(_) => "client:resource-update",
            RelayMessage::AdminResourceUpdate(_) => "admin:resource-update",
            RelayMessage::AdminRefill(_) => "admin:refill",
            RelayMessage::ClientRefillUpdate(_) => "client:refill-update",
        }
    }

    /// Creates a `client:resource-update` stamped with the current time.
    pub fn resource_update(inventory: ResourceInventory) -> Self {
        RelayMessage::ClientResourceUpdate(ResourceUpdate {
            inventory,
            timestamp: now_ms(),
        })
    }

    /// Creates an `admin:refill` stamped with the current time.
    pub fn refill(amounts: ResourceAmounts) -> Self {
        RelayMessage::AdminRefill(RefillUpdate {
            amounts,
            timestamp: now_ms(),
        })
    }

    /// Serializes to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kava_core::MACHINE_SEED;

    #[test]
    fn test_resource_update_wire_format() {
        let msg = RelayMessage::resource_update(MACHINE_SEED);
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"client:resource-update\""));
        assert!(json.contains("\"smallCups\":10"));
        assert!(json.contains("\"timestamp\""));

        let parsed = RelayMessage::from_json(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_refill_wire_format() {
        let amounts = ResourceAmounts {
            water: 300,
            ..Default::default()
        };
        let msg = RelayMessage::refill(amounts);
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"admin:refill\""));
        assert!(json.contains("\"water\":300"));
    }

    #[test]
    fn test_connection_established_has_no_payload() {
        let json = RelayMessage::ConnectionEstablished.to_json().unwrap();
        assert_eq!(json, r#"{"type":"connection:established"}"#);
        assert_eq!(
            RelayMessage::from_json(&json).unwrap(),
            RelayMessage::ConnectionEstablished
        );
    }

    #[test]
    fn test_rebroadcast_names_differ_from_inbound_names() {
        let update = ResourceUpdate {
            inventory: MACHINE_SEED,
            timestamp: 1,
        };
        let inbound = RelayMessage::ClientResourceUpdate(update).to_json().unwrap();
        let outbound = RelayMessage::AdminResourceUpdate(update).to_json().unwrap();
        assert!(inbound.contains("client:resource-update"));
        assert!(outbound.contains("admin:resource-update"));
    }
}

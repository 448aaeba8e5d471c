//! # Remote Ledger Store Client
//!
//! HTTP client for the opaque, spreadsheet-backed store that acts as the
//! system of record when configured. One store URL per tier (machine and
//! warehouse), same contract for both.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Remote Ledger Store Contract                         │
//! │                                                                         │
//! │  GET  <url>                    ──► read current inventory              │
//! │  POST <url> {action, ...}      ──► mutate, echo resulting inventory    │
//! │                                                                         │
//! │  action = consume  { ingredients }          (machine tier)             │
//! │  action = refill   { amounts }              (machine tier)             │
//! │  action = purchase { resource, amount }     (warehouse tier)           │
//! │  action = transfer { resource, amount }     (warehouse tier)           │
//! │  action = update   { inventory }            (either tier, overwrite)   │
//! │                                                                         │
//! │  Response envelope (both verbs):                                        │
//! │    { success: bool, data?: ResourceInventory, error?, timestamp? }      │
//! │                                                                         │
//! │  success == false OR missing data ──► FAILED CALL, regardless of       │
//! │  transport-level HTTP status. The returned data REPLACES the local     │
//! │  ledger wholesale (never merged field-by-field).                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The trait seam exists so the inventory managers can be driven against an
//! in-memory fake in tests; `HttpLedgerStore` is the production impl.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use kava_core::{Ingredients, ResourceAmounts, ResourceInventory, ResourceKind};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Response Envelope
// =============================================================================

/// The store's response envelope, shared by GET and every POST action.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<ResourceInventory>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ApiResponse {
    /// Extracts the authoritative inventory, or the failure.
    ///
    /// `success: false` or a missing `data` field is a failed call no matter
    /// what the HTTP layer said.
    fn into_inventory(self) -> SyncResult<ResourceInventory> {
        if !self.success {
            return Err(SyncError::StoreRejected(
                self.error.unwrap_or_else(|| "unspecified store error".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| SyncError::StoreRejected("response carried no inventory".to_string()))
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// POST bodies for the store's mutating actions.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum StoreRequest<'a> {
    Consume { ingredients: &'a Ingredients },
    Refill { amounts: &'a ResourceAmounts },
    Update { inventory: &'a ResourceInventory },
    Purchase { resource: ResourceKind, amount: i64 },
    Transfer { resource: ResourceKind, amount: i64 },
}

impl StoreRequest<'_> {
    fn action(&self) -> &'static str {
        match self {
            StoreRequest::Consume { .. } => "consume",
            StoreRequest::Refill { .. } => "refill",
            StoreRequest::Update { .. } => "update",
            StoreRequest::Purchase { .. } => "purchase",
            StoreRequest::Transfer { .. } => "transfer",
        }
    }
}

// =============================================================================
// Ledger Store Trait
// =============================================================================

/// Operations against a tier's remote ledger store.
///
/// Every call returns the canonical post-operation inventory, which the
/// calling manager uses to replace its local ledger wholesale.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Reads the current inventory.
    async fn fetch(&self) -> SyncResult<ResourceInventory>;

    /// Consumes the resources of one brewed drink.
    async fn consume(&self, ingredients: &Ingredients) -> SyncResult<ResourceInventory>;

    /// Credits refill amounts to the inventory.
    async fn refill(&self, amounts: &ResourceAmounts) -> SyncResult<ResourceInventory>;

    /// Unconditionally overwrites the stored inventory.
    async fn replace(&self, inventory: &ResourceInventory) -> SyncResult<ResourceInventory>;

    /// Adds a purchased bundle to one resource.
    async fn purchase(&self, resource: ResourceKind, amount: i64) -> SyncResult<ResourceInventory>;

    /// Debits one resource for a warehouse-to-machine transfer.
    async fn transfer(&self, resource: ResourceKind, amount: i64) -> SyncResult<ResourceInventory>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// Production [`LedgerStore`] backed by the spreadsheet HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpLedgerStore {
    client: reqwest::Client,
    url: Url,
}

impl HttpLedgerStore {
    /// Creates a store client for one tier's endpoint.
    pub fn new(url: &str, request_timeout: Duration) -> SyncResult<Self> {
        let url = Url::parse(url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "Store URL must be http(s), got: {}",
                url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(HttpLedgerStore { client, url })
    }

    /// Sends one POST action and unwraps the envelope.
    async fn post(&self, request: StoreRequest<'_>) -> SyncResult<ResourceInventory> {
        debug!(action = request.action(), url = %self.url, "Store request");
        let response: ApiResponse = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        response.into_inventory()
    }
}

#[async_trait]
impl LedgerStore for HttpLedgerStore {
    async fn fetch(&self) -> SyncResult<ResourceInventory> {
        debug!(url = %self.url, "Store fetch");
        let response: ApiResponse = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .json()
            .await?;
        response.into_inventory()
    }

    async fn consume(&self, ingredients: &Ingredients) -> SyncResult<ResourceInventory> {
        self.post(StoreRequest::Consume { ingredients }).await
    }

    async fn refill(&self, amounts: &ResourceAmounts) -> SyncResult<ResourceInventory> {
        self.post(StoreRequest::Refill { amounts }).await
    }

    async fn replace(&self, inventory: &ResourceInventory) -> SyncResult<ResourceInventory> {
        self.post(StoreRequest::Update { inventory }).await
    }

    async fn purchase(&self, resource: ResourceKind, amount: i64) -> SyncResult<ResourceInventory> {
        self.post(StoreRequest::Purchase { resource, amount }).await
    }

    async fn transfer(&self, resource: ResourceKind, amount: i64) -> SyncResult<ResourceInventory> {
        self.post(StoreRequest::Transfer { resource, amount }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kava_core::{CupSize, MACHINE_SEED};

    #[test]
    fn test_request_bodies_carry_action_tag() {
        let ingredients = Ingredients::new(30, 7, 0, 2, CupSize::Small).unwrap();
        let json =
            serde_json::to_string(&StoreRequest::Consume { ingredients: &ingredients }).unwrap();
        assert!(json.contains("\"action\":\"consume\""));
        assert!(json.contains("\"sugar\":2"));
        assert!(json.contains("\"stirrer\":true"));
        assert!(json.contains("\"cup\":\"small\""));

        let json = serde_json::to_string(&StoreRequest::Transfer {
            resource: ResourceKind::Water,
            amount: 300,
        })
        .unwrap();
        assert!(json.contains("\"action\":\"transfer\""));
        assert!(json.contains("\"resource\":\"water\""));
        assert!(json.contains("\"amount\":300"));
    }

    #[test]
    fn test_envelope_success_with_data() {
        let response = ApiResponse {
            success: true,
            data: Some(MACHINE_SEED),
            error: None,
            timestamp: None,
        };
        assert_eq!(response.into_inventory().unwrap(), MACHINE_SEED);
    }

    #[test]
    fn test_envelope_failure_regardless_of_data() {
        let response = ApiResponse {
            success: false,
            data: Some(MACHINE_SEED),
            error: Some("quota exceeded".into()),
            timestamp: None,
        };
        match response.into_inventory() {
            Err(SyncError::StoreRejected(msg)) => assert_eq!(msg, "quota exceeded"),
            other => panic!("expected StoreRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_missing_data_is_a_failure() {
        let response = ApiResponse {
            success: true,
            data: None,
            error: None,
            timestamp: None,
        };
        assert!(matches!(
            response.into_inventory(),
            Err(SyncError::StoreRejected(_))
        ));
    }

    #[test]
    fn test_envelope_parses_store_json() {
        let json = r#"{"success":true,"data":{"water":270,"coffee":21,"milk":300,"smallCups":9,"largeCups":8,"stirrers":10},"timestamp":"2026-08-07T10:00:00Z"}"#;
        let response: ApiResponse = serde_json::from_str(json).unwrap();
        let inventory = response.into_inventory().unwrap();
        assert_eq!(inventory.water, 270);
        assert_eq!(inventory.small_cups, 9);
    }

    #[test]
    fn test_store_rejects_non_http_url() {
        assert!(HttpLedgerStore::new("ws://example.com", Duration::from_secs(5)).is_err());
        assert!(HttpLedgerStore::new("https://example.com/sheet", Duration::from_secs(5)).is_ok());
    }
}

//! Pluggable trait interfaces for the engine.
//!
//! Every seam is an async trait: the node contract, the four external
//! capability ports, and the persistence abstraction. Concrete defaults
//! live in `defaults/`; the PostgreSQL store lives in its own crate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::{NodeError, PortError, StoreError};
use crate::types::{
    BaseFields, ExecutionOutcome, HydratedWorkflow, NodeContext, NodeRecord, WorkflowDraft,
    WorkflowSnapshot,
};

// ---------------------------------------------------------------------------
// Node contract
// ---------------------------------------------------------------------------

/// Every node variant implements this trait. A node parses its own slice of
/// the metadata at construction, can project itself back to the frontend
/// shape, and executes its logic against the shared variable bag.
#[async_trait]
pub trait Node: Send + Sync {
    /// The instance-level fields shared by all variants.
    fn base(&self) -> &BaseFields;

    /// The React Flow projection. The default is the trivial field
    /// projection, which preserves the raw metadata bytes; override only if
    /// a variant needs custom serialization.
    fn view(&self) -> NodeRecord {
        self.base().to_record()
    }

    /// Check configuration invariants. Called once at build time, after
    /// metadata parsing; must not perform I/O.
    fn validate(&self) -> Result<(), NodeError> {
        Ok(())
    }

    /// Run the node's logic. May perform I/O through a capability port and
    /// must observe `cancel`. Reads variables from `ctx`; the walker merges
    /// the returned output back into the bag.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        ctx: &NodeContext,
    ) -> Result<ExecutionOutcome, NodeError>;
}

impl std::fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let base = self.base();
        f.debug_struct("Node")
            .field("id", &base.id)
            .field("node_type", &base.node_type)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Capability ports
// ---------------------------------------------------------------------------

/// Fetches the current temperature for a coordinate pair.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn temperature(
        &self,
        cancel: &CancellationToken,
        lat: f64,
        lon: f64,
    ) -> Result<f64, PortError>;
}

/// A flood-risk reading for a coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodReading {
    pub discharge: f64,
    pub risk_level: String,
}

/// Fetches river-discharge based flood risk for a coordinate pair.
#[async_trait]
pub trait FloodProvider: Send + Sync {
    async fn flood_risk(
        &self,
        cancel: &CancellationToken,
        lat: f64,
        lon: f64,
    ) -> Result<FloodReading, PortError>;
}

/// An email ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// An SMS ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

/// Outcome of a send attempt on either messaging port.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub delivery_status: String,
    pub sent: bool,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(
        &self,
        cancel: &CancellationToken,
        msg: &EmailMessage,
    ) -> Result<Delivery, PortError>;
}

#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send(
        &self,
        cancel: &CancellationToken,
        msg: &SmsMessage,
    ) -> Result<Delivery, PortError>;
}

/// The bag of external capability adapters injected into the node factory.
///
/// Adapters are shared by reference across concurrent executions and must
/// be stateless (or internally synchronized).
#[derive(Clone)]
pub struct Capabilities {
    pub weather: Arc<dyn WeatherProvider>,
    pub flood: Arc<dyn FloodProvider>,
    pub email: Arc<dyn EmailProvider>,
    pub sms: Arc<dyn SmsProvider>,
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Workflow persistence: the three-tier read path plus the write, delete,
/// and publish operations. Each method runs inside a single transaction on
/// the backing store; missing rows read as `None` / `false`.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Hydrate a workflow from one consistent snapshot: header, instances
    /// joined to the node library, and edges.
    async fn get_workflow(&self, id: Uuid) -> Result<Option<HydratedWorkflow>, StoreError>;

    /// Upsert the header and replace all child rows. Re-saving a
    /// soft-deleted workflow un-deletes it.
    async fn upsert_workflow(&self, draft: &WorkflowDraft) -> Result<(), StoreError>;

    /// Hard-delete children, soft-delete the header. Returns `false` when
    /// the header did not exist.
    async fn delete_workflow(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Freeze the current DAG into a new numbered snapshot and mark it
    /// active. Returns `None` when the workflow does not exist.
    async fn publish_workflow(&self, id: Uuid) -> Result<Option<WorkflowSnapshot>, StoreError>;

    /// The snapshot the workflow's `active_snapshot_id` points at, if any.
    async fn active_snapshot(&self, id: Uuid) -> Result<Option<WorkflowSnapshot>, StoreError>;
}

/// A flat map of caller-supplied input variables.
pub type InputMap = HashMap<String, serde_json::Value>;

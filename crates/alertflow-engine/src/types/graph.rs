//! Graph schema types: the contract between persistence, engine, and UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use uuid::Uuid;

/// Canvas coordinates of a node instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Display and logic payload of a hydrated node.
///
/// `metadata` is the raw JSON stored in the node library. It is never
/// decoded and re-encoded on the way to the frontend; serializing this
/// struct emits the stored bytes verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    pub description: String,
    pub metadata: Box<RawValue>,
}

/// A hydrated node: the join of a canvas instance with its library
/// blueprint. This is also the React Flow representation returned by the
/// read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    pub data: NodeData,
}

/// A directed connection between two node instances.
///
/// `source_handle` distinguishes branches leaving a condition node
/// (`"true"` / `"false"`); the remaining fields are display attributes
/// passed through for the canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(default)]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_style: Option<Box<RawValue>>,
}

/// Lifecycle state of a workflow container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Published,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    /// Parse a stored status string; anything unrecognized reads as draft.
    pub fn parse(s: &str) -> Self {
        match s {
            "published" => Self::Published,
            _ => Self::Draft,
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully hydrated workflow: header fields plus nodes and edges, exactly
/// as assembled by one consistent storage snapshot. Owned by a single
/// execution for its duration.
#[derive(Debug, Clone)]
pub struct HydratedWorkflow {
    pub id: Uuid,
    pub name: String,
    pub status: WorkflowStatus,
    pub active_snapshot_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl HydratedWorkflow {
    /// Assemble a workflow from a frozen snapshot DAG. Header fields other
    /// than the id are immaterial to execution.
    pub fn from_dag(id: Uuid, dag: DagData) -> Self {
        Self {
            id,
            name: String::new(),
            status: WorkflowStatus::Published,
            active_snapshot_id: None,
            created_at: Utc::now(),
            modified_at: Utc::now(),
            nodes: dag.nodes,
            edges: dag.edges,
        }
    }
}

/// The caller-supplied shape of a workflow save: header name plus the full
/// replacement set of nodes and edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDraft {
    pub id: Uuid,
    pub name: String,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

/// The frozen DAG stored inside a published snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagData {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

/// An immutable published version of a workflow's DAG.
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub version_number: i32,
    pub dag: DagData,
    pub published_at: DateTime<Utc>,
}

/// Response payload of a publish operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub snapshot_id: Uuid,
    pub version_number: i32,
    pub published_at: DateTime<Utc>,
}

/// The frontend view of a workflow: id, factory-checked nodes, edges.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowView {
    pub id: Uuid,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

/// The instance-level fields every node variant shares. Variants keep the
/// raw metadata here so the default [`NodeRecord`] projection is lossless.
#[derive(Debug, Clone)]
pub struct BaseFields {
    pub id: String,
    pub node_type: String,
    pub position: Position,
    pub label: String,
    pub description: String,
    pub metadata: Box<RawValue>,
}

impl BaseFields {
    pub fn from_record(record: &NodeRecord) -> Self {
        Self {
            id: record.id.clone(),
            node_type: record.node_type.clone(),
            position: record.position,
            label: record.data.label.clone(),
            description: record.data.description.clone(),
            metadata: record.data.metadata.clone(),
        }
    }

    /// The React Flow projection shared by all node variants. Metadata is
    /// the raw stored value, not a reconstruction.
    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.id.clone(),
            node_type: self.node_type.clone(),
            position: self.position,
            data: NodeData {
                label: self.label.clone(),
                description: self.description.clone(),
                metadata: self.metadata.clone(),
            },
        }
    }
}

//! The public operations over workflows: get, save, delete, publish,
//! execute. The transport layer (out of scope here) decodes requests,
//! calls these methods, and renders [`ErrorBody`](crate::errors::ErrorBody)
//! envelopes from [`ServiceError`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::executor::run_workflow;
use crate::nodes::build_node;
use crate::traits::{Capabilities, InputMap, WorkflowStore};
use crate::types::{
    ExecutionReport, HydratedWorkflow, PublishReceipt, RunStatus, WorkflowDraft, WorkflowView,
};

/// The body accepted by the execute operation. Form answers and condition
/// settings arrive in separate objects and are flattened into one variable
/// map for the engine.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecuteRequest {
    pub form_data: HashMap<String, Value>,
    pub condition: HashMap<String, Value>,
}

impl ExecuteRequest {
    pub fn into_inputs(self) -> InputMap {
        let mut inputs = self.form_data;
        inputs.extend(self.condition);
        inputs
    }
}

/// Handles workflow operations against an abstract store, keeping the
/// public surface decoupled from the persistence backend.
pub struct WorkflowService {
    store: Arc<dyn WorkflowStore>,
    caps: Capabilities,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn WorkflowStore>, caps: Capabilities) -> Self {
        Self { store, caps }
    }

    /// Load a workflow and return it in the shape the canvas expects.
    /// Every node is run through the factory first, so malformed metadata
    /// is caught here rather than surfacing in the frontend.
    pub async fn get_workflow(&self, id: Uuid) -> Result<WorkflowView, ServiceError> {
        debug!(%id, "returning workflow definition");
        let wf = self
            .store
            .get_workflow(id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let nodes = wf
            .nodes
            .iter()
            .map(|record| build_node(record, &self.caps).map(|node| node.view()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WorkflowView {
            id: wf.id,
            nodes,
            edges: wf.edges,
        })
    }

    /// Save (create or replace) a workflow definition.
    pub async fn save_workflow(&self, draft: &WorkflowDraft) -> Result<(), ServiceError> {
        debug!(id = %draft.id, nodes = draft.nodes.len(), edges = draft.edges.len(), "saving workflow");
        self.store.upsert_workflow(draft).await?;
        Ok(())
    }

    /// Soft-delete a workflow and hard-delete its children.
    pub async fn delete_workflow(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete_workflow(id).await? {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    /// Freeze the current DAG into a new published snapshot.
    pub async fn publish_workflow(&self, id: Uuid) -> Result<PublishReceipt, ServiceError> {
        debug!(%id, "publishing workflow");
        let snapshot = self
            .store
            .publish_workflow(id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        Ok(PublishReceipt {
            snapshot_id: snapshot.id,
            version_number: snapshot.version_number,
            published_at: snapshot.published_at,
        })
    }

    /// Execute a workflow against the given inputs.
    ///
    /// A published snapshot takes precedence over the live tables, so
    /// execution is decoupled from library mutations; drafts fall back to
    /// a live hydration. Business failures come back inside the report.
    pub async fn execute_workflow(
        &self,
        id: Uuid,
        inputs: &InputMap,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport, ServiceError> {
        let wf = match self.store.active_snapshot(id).await? {
            Some(snapshot) => {
                debug!(%id, version = snapshot.version_number, "executing from snapshot");
                HydratedWorkflow::from_dag(id, snapshot.dag)
            }
            None => self
                .store
                .get_workflow(id)
                .await?
                .ok_or(ServiceError::NotFound)?,
        };

        let report = run_workflow(&wf, inputs, &self.caps, cancel).await?;

        if report.status != RunStatus::Completed {
            warn!(
                %id,
                status = ?report.status,
                failed_node = report.failed_node.as_deref().unwrap_or(""),
                error = report.error.as_deref().unwrap_or(""),
                "workflow did not complete"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::InMemoryStore;
    use crate::errors::ErrorCode;
    use crate::nodes::test_support::capabilities;
    use crate::types::{EdgeRecord, NodeData, NodeRecord, Position};
    use serde_json::{json, value::RawValue};

    fn record(id: &str, node_type: &str, metadata: &str) -> NodeRecord {
        NodeRecord {
            id: id.into(),
            node_type: node_type.into(),
            position: Position::default(),
            data: NodeData {
                label: id.into(),
                description: format!("{id} node"),
                metadata: RawValue::from_string(metadata.into()).expect("valid json"),
            },
        }
    }

    fn edge(id: &str, source: &str, target: &str, handle: Option<&str>) -> EdgeRecord {
        EdgeRecord {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: handle.map(Into::into),
            edge_type: "smoothstep".into(),
            animated: false,
            label: None,
            style: None,
            label_style: None,
        }
    }

    fn linear_draft(id: Uuid) -> WorkflowDraft {
        WorkflowDraft {
            id,
            name: "weather alerts".into(),
            nodes: vec![
                record("start", "start", "{}"),
                record(
                    "condition",
                    "condition",
                    r#"{"conditionVariable":"temperature","outputVariables":["conditionMet"]}"#,
                ),
                record("end", "end", "{}"),
            ],
            edges: vec![
                edge("e1", "start", "condition", None),
                edge("e2", "condition", "end", Some("true")),
                edge("e3", "condition", "end", Some("false")),
            ],
        }
    }

    fn service() -> WorkflowService {
        WorkflowService::new(Arc::new(InMemoryStore::new()), capabilities(28.5))
    }

    #[tokio::test]
    async fn save_then_get_returns_the_canvas_shape() {
        let svc = service();
        let id = Uuid::new_v4();
        svc.save_workflow(&linear_draft(id)).await.expect("save");

        let view = svc.get_workflow(id).await.expect("get");
        assert_eq!(view.id, id);
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.edges.len(), 3);
        assert_eq!(view.nodes[1].node_type, "condition");
    }

    #[tokio::test]
    async fn get_missing_workflow_maps_to_not_found() {
        let svc = service();
        let err = svc.get_workflow(Uuid::new_v4()).await.expect_err("missing");
        assert_eq!(err.envelope().code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn get_with_corrupt_metadata_is_internal_error() {
        let svc = service();
        let id = Uuid::new_v4();
        let mut draft = linear_draft(id);
        draft.nodes.push(record("bad", "form", r#"{"inputFields": 7}"#));
        svc.save_workflow(&draft).await.expect("save");

        let err = svc.get_workflow(id).await.expect_err("corrupt metadata");
        assert_eq!(err.envelope().code, ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let svc = service();
        let id = Uuid::new_v4();
        svc.save_workflow(&linear_draft(id)).await.expect("save");
        svc.delete_workflow(id).await.expect("delete");

        let err = svc.get_workflow(id).await.expect_err("deleted");
        assert_eq!(err.envelope().code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn execute_runs_the_draft_when_no_snapshot_exists() {
        let svc = service();
        let id = Uuid::new_v4();
        svc.save_workflow(&linear_draft(id)).await.expect("save");

        let inputs: InputMap = [("temperature".to_string(), json!(30))].into();
        let report = svc
            .execute_workflow(id, &inputs, &CancellationToken::new())
            .await
            .expect("execute");
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.steps.len(), 3);
        assert!(!report.executed_at.is_empty());
    }

    #[tokio::test]
    async fn execute_prefers_the_published_snapshot() {
        let svc = service();
        let id = Uuid::new_v4();
        svc.save_workflow(&linear_draft(id)).await.expect("save");
        let receipt = svc.publish_workflow(id).await.expect("publish");
        assert_eq!(receipt.version_number, 1);

        // Mutate the draft after publishing: drop the condition node.
        let mut draft = linear_draft(id);
        draft.nodes.remove(1);
        draft.edges = vec![edge("e1", "start", "end", None)];
        svc.save_workflow(&draft).await.expect("save");

        // Execution still runs the frozen three-node snapshot.
        let inputs: InputMap = [("temperature".to_string(), json!(30))].into();
        let report = svc
            .execute_workflow(id, &inputs, &CancellationToken::new())
            .await
            .expect("execute");
        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.steps[1].node_id, "condition");
    }

    #[tokio::test]
    async fn execute_request_flattens_form_and_condition() {
        let body: ExecuteRequest = serde_json::from_str(
            r#"{
                "formData": {"name": "Alice", "city": "Sydney"},
                "condition": {"operator": "less_than", "threshold": 20}
            }"#,
        )
        .expect("decode");
        let inputs = body.into_inputs();
        assert_eq!(inputs["name"], json!("Alice"));
        assert_eq!(inputs["operator"], json!("less_than"));
        assert_eq!(inputs["threshold"], json!(20));
    }

    #[tokio::test]
    async fn publish_missing_workflow_is_not_found() {
        let svc = service();
        let err = svc
            .publish_workflow(Uuid::new_v4())
            .await
            .expect_err("missing");
        assert_eq!(err.envelope().code, ErrorCode::NotFound);
    }
}

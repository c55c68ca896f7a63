//! In-memory [`WorkflowStore`] with the same soft-delete and snapshot
//! semantics as the PostgreSQL store. Backs service-level tests and
//! embedded use without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::traits::WorkflowStore;
use crate::types::{
    DagData, EdgeRecord, HydratedWorkflow, NodeRecord, WorkflowDraft, WorkflowSnapshot,
    WorkflowStatus,
};

#[derive(Debug, Clone)]
struct StoredWorkflow {
    name: String,
    status: WorkflowStatus,
    active_snapshot_id: Option<Uuid>,
    created_at: chrono::DateTime<Utc>,
    modified_at: chrono::DateTime<Utc>,
    deleted_at: Option<chrono::DateTime<Utc>>,
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    snapshots: Vec<WorkflowSnapshot>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<HashMap<Uuid, StoredWorkflow>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, StoredWorkflow>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn get_workflow(&self, id: Uuid) -> Result<Option<HydratedWorkflow>, StoreError> {
        let guard = self.lock();
        let Some(stored) = guard.get(&id).filter(|w| w.deleted_at.is_none()) else {
            return Ok(None);
        };
        Ok(Some(HydratedWorkflow {
            id,
            name: stored.name.clone(),
            status: stored.status,
            active_snapshot_id: stored.active_snapshot_id,
            created_at: stored.created_at,
            modified_at: stored.modified_at,
            nodes: stored.nodes.clone(),
            edges: stored.edges.clone(),
        }))
    }

    async fn upsert_workflow(&self, draft: &WorkflowDraft) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut guard = self.lock();
        let stored = guard.entry(draft.id).or_insert_with(|| StoredWorkflow {
            name: String::new(),
            status: WorkflowStatus::Draft,
            active_snapshot_id: None,
            created_at: now,
            modified_at: now,
            deleted_at: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            snapshots: Vec::new(),
        });
        stored.name = draft.name.clone();
        stored.modified_at = now;
        // Re-saving a soft-deleted workflow un-deletes it.
        stored.deleted_at = None;
        stored.nodes = draft.nodes.clone();
        stored.edges = draft.edges.clone();
        Ok(())
    }

    async fn delete_workflow(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut guard = self.lock();
        let Some(stored) = guard.get_mut(&id) else {
            return Ok(false);
        };
        // Children are hard-deleted, the header soft-deleted.
        stored.nodes.clear();
        stored.edges.clear();
        let now = Utc::now();
        stored.deleted_at = Some(now);
        stored.modified_at = now;
        Ok(true)
    }

    async fn publish_workflow(&self, id: Uuid) -> Result<Option<WorkflowSnapshot>, StoreError> {
        let mut guard = self.lock();
        let Some(stored) = guard.get_mut(&id).filter(|w| w.deleted_at.is_none()) else {
            return Ok(None);
        };
        let next_version = stored
            .snapshots
            .iter()
            .map(|s| s.version_number)
            .max()
            .unwrap_or(0)
            + 1;
        let snapshot = WorkflowSnapshot {
            id: Uuid::new_v4(),
            workflow_id: id,
            version_number: next_version,
            dag: DagData {
                nodes: stored.nodes.clone(),
                edges: stored.edges.clone(),
            },
            published_at: Utc::now(),
        };
        stored.snapshots.push(snapshot.clone());
        stored.active_snapshot_id = Some(snapshot.id);
        stored.status = WorkflowStatus::Published;
        Ok(Some(snapshot))
    }

    async fn active_snapshot(&self, id: Uuid) -> Result<Option<WorkflowSnapshot>, StoreError> {
        let guard = self.lock();
        let Some(stored) = guard.get(&id).filter(|w| w.deleted_at.is_none()) else {
            return Ok(None);
        };
        let Some(active_id) = stored.active_snapshot_id else {
            return Ok(None);
        };
        Ok(stored.snapshots.iter().find(|s| s.id == active_id).cloned())
    }
}

//! PostgreSQL-backed [`WorkflowStore`].
//!
//! Reads run inside repeatable-read transactions so the three queries of a
//! hydration (header, instances joined to the library, edges) see one
//! consistent snapshot; writes run under read committed. JSON columns are
//! selected with a `::text` cast so the stored bytes reach the engine
//! unchanged instead of being decoded and re-encoded along the way.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    AccessMode, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, DbErr, EntityTrait, FromQueryResult, IsolationLevel,
    QueryFilter, Statement, TransactionTrait,
};
use serde_json::value::RawValue;
use tracing::debug;
use uuid::Uuid;

use alertflow_engine::errors::StoreError;
use alertflow_engine::traits::WorkflowStore;
use alertflow_engine::types::{
    DagData, EdgeRecord, HydratedWorkflow, NodeData, NodeRecord, Position, WorkflowDraft,
    WorkflowSnapshot, WorkflowStatus,
};

use crate::models::{node_library, workflow, workflow_edge, workflow_node_instance};

/// Bound on read transactions; a hydration must stay well under this.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on write transactions, which touch several tables per save.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// PostgreSQL implementation of the workflow persistence contract.
pub struct PgWorkflowStore {
    db: Arc<DatabaseConnection>,
}

impl PgWorkflowStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

async fn bounded<T>(
    limit: Duration,
    op: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| StoreError::backend(format!("operation exceeded {limit:?}")))?
}

fn db_err(e: DbErr) -> StoreError {
    StoreError::backend(e)
}

fn stmt(sql: &str, values: impl IntoIterator<Item = sea_orm::Value>) -> Statement {
    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

fn parse_raw(text: String) -> Result<Box<RawValue>, StoreError> {
    RawValue::from_string(text).map_err(StoreError::data)
}

/// Raw JSON from an edge column, if present.
fn parse_raw_opt(text: Option<String>) -> Result<Option<Box<RawValue>>, StoreError> {
    text.map(parse_raw).transpose()
}

/// Serialize raw display JSON back into a column value on the write path.
fn raw_to_json(raw: &Option<Box<RawValue>>) -> Result<Option<serde_json::Value>, StoreError> {
    raw.as_ref()
        .map(|r| serde_json::from_str(r.get()).map_err(StoreError::data))
        .transpose()
}

#[derive(Debug, FromQueryResult)]
struct NodeRow {
    instance_id: String,
    node_type: String,
    x_pos: f64,
    y_pos: f64,
    label: String,
    description: String,
    metadata: String,
}

impl NodeRow {
    fn into_record(self) -> Result<NodeRecord, StoreError> {
        Ok(NodeRecord {
            id: self.instance_id,
            node_type: self.node_type,
            position: Position {
                x: self.x_pos,
                y: self.y_pos,
            },
            data: NodeData {
                label: self.label,
                description: self.description,
                metadata: parse_raw(self.metadata)?,
            },
        })
    }
}

#[derive(Debug, FromQueryResult)]
struct EdgeRow {
    edge_id: String,
    source_instance_id: String,
    target_instance_id: String,
    source_handle: Option<String>,
    edge_type: String,
    animated: bool,
    label: Option<String>,
    style_props: Option<String>,
    label_style: Option<String>,
}

impl EdgeRow {
    fn into_record(self) -> Result<EdgeRecord, StoreError> {
        Ok(EdgeRecord {
            id: self.edge_id,
            source: self.source_instance_id,
            target: self.target_instance_id,
            source_handle: self.source_handle,
            edge_type: self.edge_type,
            animated: self.animated,
            label: self.label,
            style: parse_raw_opt(self.style_props)?,
            label_style: parse_raw_opt(self.label_style)?,
        })
    }
}

/// Fetch a workflow's nodes by joining instance placements with their
/// library blueprints, skipping soft-deleted blueprints.
async fn hydrate_nodes(
    txn: &DatabaseTransaction,
    workflow_id: Uuid,
) -> Result<Vec<NodeRecord>, StoreError> {
    let rows = txn
        .query_all(stmt(
            r#"
            SELECT
                i.instance_id,
                l.node_type,
                i.x_pos, i.y_pos,
                l.base_label AS label,
                l.base_description AS description,
                l.metadata::text AS metadata
            FROM workflow_node_instances i
            JOIN node_library l ON i.node_library_id = l.id
            WHERE i.workflow_id = $1 AND l.deleted_at IS NULL
            "#,
            [workflow_id.into()],
        ))
        .await
        .map_err(db_err)?;

    rows.iter()
        .map(|row| {
            NodeRow::from_query_result(row, "")
                .map_err(db_err)
                .and_then(NodeRow::into_record)
        })
        .collect()
}

/// Fetch a workflow's edges with their display attributes.
async fn hydrate_edges(
    txn: &DatabaseTransaction,
    workflow_id: Uuid,
) -> Result<Vec<EdgeRecord>, StoreError> {
    let rows = txn
        .query_all(stmt(
            r#"
            SELECT
                edge_id, source_instance_id, target_instance_id, source_handle,
                edge_type, animated, label,
                style_props::text AS style_props,
                label_style::text AS label_style
            FROM workflow_edges
            WHERE workflow_id = $1
            "#,
            [workflow_id.into()],
        ))
        .await
        .map_err(db_err)?;

    rows.iter()
        .map(|row| {
            EdgeRow::from_query_result(row, "")
                .map_err(db_err)
                .and_then(EdgeRow::into_record)
        })
        .collect()
}

impl PgWorkflowStore {
    async fn fetch_workflow(&self, id: Uuid) -> Result<Option<HydratedWorkflow>, StoreError> {
        // Read-only repeatable read: the three SELECTs must not observe a
        // torn view of a concurrent save.
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::RepeatableRead),
                Some(AccessMode::ReadOnly),
            )
            .await
            .map_err(db_err)?;

        let Some(header) = txn
            .query_one(stmt(
                r#"
                SELECT name, status, active_snapshot_id, created_at, modified_at
                FROM workflows
                WHERE id = $1 AND deleted_at IS NULL
                "#,
                [id.into()],
            ))
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let name: String = header.try_get("", "name").map_err(db_err)?;
        let status: String = header.try_get("", "status").map_err(db_err)?;
        let active_snapshot_id: Option<Uuid> =
            header.try_get("", "active_snapshot_id").map_err(db_err)?;
        let created_at: DateTime<Utc> = header.try_get("", "created_at").map_err(db_err)?;
        let modified_at: DateTime<Utc> = header.try_get("", "modified_at").map_err(db_err)?;

        let nodes = hydrate_nodes(&txn, id).await?;
        let edges = hydrate_edges(&txn, id).await?;

        txn.commit().await.map_err(db_err)?;

        Ok(Some(HydratedWorkflow {
            id,
            name,
            status: WorkflowStatus::parse(&status),
            active_snapshot_id,
            created_at,
            modified_at,
            nodes,
            edges,
        }))
    }

    async fn save_draft(&self, draft: &WorkflowDraft) -> Result<(), StoreError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::ReadCommitted), None)
            .await
            .map_err(db_err)?;

        let now = Utc::now();

        // 1. Upsert the header; re-saving a soft-deleted workflow
        // un-deletes it.
        workflow::Entity::insert(workflow::ActiveModel {
            id: Set(draft.id),
            name: Set(draft.name.clone()),
            status: Set(WorkflowStatus::Draft.as_str().to_string()),
            active_snapshot_id: Set(None),
            created_at: Set(now),
            modified_at: Set(now),
            deleted_at: Set(None),
        })
        .on_conflict(
            OnConflict::column(workflow::Column::Id)
                .update_columns([
                    workflow::Column::Name,
                    workflow::Column::ModifiedAt,
                    workflow::Column::DeletedAt,
                ])
                .to_owned(),
        )
        .exec(&txn)
        .await
        .map_err(db_err)?;

        // 2. Replace the instance rows. Each node's type resolves to a
        // library id through one lookup query.
        workflow_node_instance::Entity::delete_many()
            .filter(workflow_node_instance::Column::WorkflowId.eq(draft.id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let library_ids: std::collections::HashMap<String, Uuid> = node_library::Entity::find()
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|entry| (entry.node_type, entry.id))
            .collect();

        let instances = draft
            .nodes
            .iter()
            .map(|node| {
                let library_id = *library_ids
                    .get(&node.node_type)
                    .ok_or_else(|| StoreError::UnknownLibraryType(node.node_type.clone()))?;
                Ok(workflow_node_instance::ActiveModel {
                    workflow_id: Set(draft.id),
                    instance_id: Set(node.id.clone()),
                    node_library_id: Set(library_id),
                    x_pos: Set(node.position.x),
                    y_pos: Set(node.position.y),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        if !instances.is_empty() {
            workflow_node_instance::Entity::insert_many(instances)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        // 3. Replace the edge rows.
        workflow_edge::Entity::delete_many()
            .filter(workflow_edge::Column::WorkflowId.eq(draft.id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let edges = draft
            .edges
            .iter()
            .map(|edge| {
                Ok(workflow_edge::ActiveModel {
                    workflow_id: Set(draft.id),
                    edge_id: Set(edge.id.clone()),
                    source_instance_id: Set(edge.source.clone()),
                    target_instance_id: Set(edge.target.clone()),
                    source_handle: Set(edge.source_handle.clone()),
                    edge_type: Set(edge.edge_type.clone()),
                    animated: Set(edge.animated),
                    label: Set(edge.label.clone()),
                    style_props: Set(raw_to_json(&edge.style)?),
                    label_style: Set(raw_to_json(&edge.label_style)?),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        if !edges.is_empty() {
            workflow_edge::Entity::insert_many(edges)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        debug!(id = %draft.id, nodes = draft.nodes.len(), edges = draft.edges.len(), "workflow saved");
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::ReadCommitted), None)
            .await
            .map_err(db_err)?;

        // Children go for good; the header keeps its row for audit.
        workflow_edge::Entity::delete_many()
            .filter(workflow_edge::Column::WorkflowId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        workflow_node_instance::Entity::delete_many()
            .filter(workflow_node_instance::Column::WorkflowId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let now = Utc::now();
        let updated = workflow::Entity::update_many()
            .col_expr(workflow::Column::DeletedAt, Expr::value(now))
            .col_expr(workflow::Column::ModifiedAt, Expr::value(now))
            .filter(workflow::Column::Id.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(updated.rows_affected > 0)
    }

    async fn publish(&self, id: Uuid) -> Result<Option<WorkflowSnapshot>, StoreError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), None)
            .await
            .map_err(db_err)?;

        // 1. The workflow must exist and not be soft-deleted.
        let header = txn
            .query_one(stmt(
                "SELECT name FROM workflows WHERE id = $1 AND deleted_at IS NULL",
                [id.into()],
            ))
            .await
            .map_err(db_err)?;
        if header.is_none() {
            return Ok(None);
        }

        // 2. Freeze the current DAG.
        let dag = DagData {
            nodes: hydrate_nodes(&txn, id).await?,
            edges: hydrate_edges(&txn, id).await?,
        };
        let dag_json = serde_json::to_string(&dag).map_err(StoreError::data)?;

        // 3. Next version number for this workflow.
        let row = txn
            .query_one(stmt(
                r#"
                SELECT COALESCE(MAX(version_number), 0) + 1 AS next_version
                FROM workflow_snapshots
                WHERE workflow_id = $1
                "#,
                [id.into()],
            ))
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::backend("version query returned no rows"))?;
        let version_number: i32 = row.try_get("", "next_version").map_err(db_err)?;

        // 4. Insert the snapshot. The DAG text is cast server-side so the
        // stored JSON is byte-for-byte what was serialized here.
        let snapshot_id = Uuid::new_v4();
        let published_at = Utc::now();
        txn.execute(stmt(
            r#"
            INSERT INTO workflow_snapshots (id, workflow_id, version_number, dag_data, published_at)
            VALUES ($1, $2, $3, $4::json, $5)
            "#,
            [
                snapshot_id.into(),
                id.into(),
                version_number.into(),
                dag_json.into(),
                published_at.into(),
            ],
        ))
        .await
        .map_err(db_err)?;

        // 5. Point the workflow at its new active snapshot.
        workflow::Entity::update_many()
            .col_expr(
                workflow::Column::Status,
                Expr::value(WorkflowStatus::Published.as_str()),
            )
            .col_expr(workflow::Column::ActiveSnapshotId, Expr::value(snapshot_id))
            .filter(workflow::Column::Id.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        debug!(%id, version = version_number, "workflow published");

        Ok(Some(WorkflowSnapshot {
            id: snapshot_id,
            workflow_id: id,
            version_number,
            dag,
            published_at,
        }))
    }

    async fn fetch_active_snapshot(&self, id: Uuid) -> Result<Option<WorkflowSnapshot>, StoreError> {
        let Some(row) = self
            .db
            .query_one(stmt(
                r#"
                SELECT s.id, s.workflow_id, s.version_number,
                       s.dag_data::text AS dag_data, s.published_at
                FROM workflow_snapshots s
                JOIN workflows w ON w.active_snapshot_id = s.id
                WHERE w.id = $1 AND w.deleted_at IS NULL
                "#,
                [id.into()],
            ))
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let dag_text: String = row.try_get("", "dag_data").map_err(db_err)?;
        let dag: DagData = serde_json::from_str(&dag_text).map_err(StoreError::data)?;

        Ok(Some(WorkflowSnapshot {
            id: row.try_get("", "id").map_err(db_err)?,
            workflow_id: row.try_get("", "workflow_id").map_err(db_err)?,
            version_number: row.try_get("", "version_number").map_err(db_err)?,
            dag,
            published_at: row.try_get("", "published_at").map_err(db_err)?,
        }))
    }
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn get_workflow(&self, id: Uuid) -> Result<Option<HydratedWorkflow>, StoreError> {
        bounded(READ_TIMEOUT, self.fetch_workflow(id)).await
    }

    async fn upsert_workflow(&self, draft: &WorkflowDraft) -> Result<(), StoreError> {
        bounded(WRITE_TIMEOUT, self.save_draft(draft)).await
    }

    async fn delete_workflow(&self, id: Uuid) -> Result<bool, StoreError> {
        bounded(READ_TIMEOUT, self.soft_delete(id)).await
    }

    async fn publish_workflow(&self, id: Uuid) -> Result<Option<WorkflowSnapshot>, StoreError> {
        bounded(WRITE_TIMEOUT, self.publish(id)).await
    }

    async fn active_snapshot(&self, id: Uuid) -> Result<Option<WorkflowSnapshot>, StoreError> {
        bounded(READ_TIMEOUT, self.fetch_active_snapshot(id)).await
    }
}

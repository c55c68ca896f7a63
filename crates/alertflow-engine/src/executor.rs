//! The graph walker: bounded sequential traversal with branching, per-node
//! and per-workflow deadlines, and partial-failure reporting.
//!
//! Business failures (a node error, the step limit, cancellation) come back
//! inside the [`ExecutionReport`]; only malformed workflows (bad metadata,
//! unknown types, structural problems) surface as hard errors.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{GraphError, NodeError};
use crate::nodes::build_node;
use crate::traits::{Capabilities, InputMap, Node};
use crate::types::{
    ExecutionReport, HydratedWorkflow, NodeContext, NodeRecord, RunStatus, StepRecord, StepStatus,
};
use crate::validate::validate_graph;

/// Safeguard against malformed workflows; also the loop-termination bound
/// for deliberately cyclic graphs.
pub const MAX_EXECUTION_STEPS: usize = 100;

/// How long a single node may execute. Keeps a slow external call from
/// stalling the whole workflow.
pub const NODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Total bound across all nodes of one execution.
pub const WORKFLOW_TIMEOUT: Duration = Duration::from_secs(60);

/// Execution bounds. The defaults match the production constants; tests
/// tighten them.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    pub max_steps: usize,
    pub node_timeout: Duration,
    pub workflow_timeout: Duration,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_steps: MAX_EXECUTION_STEPS,
            node_timeout: NODE_TIMEOUT,
            workflow_timeout: WORKFLOW_TIMEOUT,
        }
    }
}

/// One outgoing edge in the adjacency map. `source_handle` is set for
/// condition branches (`"true"` / `"false"`).
struct EdgeTarget {
    target: String,
    source_handle: Option<String>,
}

/// Walk the workflow graph from the start node under the default bounds.
pub async fn run_workflow(
    workflow: &HydratedWorkflow,
    inputs: &InputMap,
    caps: &Capabilities,
    cancel: &CancellationToken,
) -> Result<ExecutionReport, GraphError> {
    run_workflow_with(workflow, inputs, caps, cancel, WalkerConfig::default()).await
}

/// Walk the workflow graph with explicit bounds.
pub async fn run_workflow_with(
    workflow: &HydratedWorkflow,
    inputs: &InputMap,
    caps: &Capabilities,
    cancel: &CancellationToken,
    config: WalkerConfig,
) -> Result<ExecutionReport, GraphError> {
    let executed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    // 1. Construct and validate typed nodes from the hydrated records.
    let mut node_map: HashMap<&str, (Box<dyn Node>, &NodeRecord)> =
        HashMap::with_capacity(workflow.nodes.len());
    for record in &workflow.nodes {
        let node =
            build_node(record, caps).map_err(|source| GraphError::NodeConstruction {
                id: record.id.clone(),
                source: Box::new(source),
            })?;
        node.validate().map_err(|source| GraphError::NodeValidation {
            id: record.id.clone(),
            source,
        })?;
        node_map.insert(record.id.as_str(), (node, record));
    }

    // 2. Build adjacency, preserving the hydration layer's edge order so
    // routing is deterministic.
    let mut adjacency: HashMap<&str, Vec<EdgeTarget>> = HashMap::new();
    for edge in &workflow.edges {
        adjacency.entry(edge.source.as_str()).or_default().push(EdgeTarget {
            target: edge.target.clone(),
            source_handle: edge.source_handle.clone(),
        });
    }

    // 3. Structural validation before any node runs; malformed graphs must
    // not trigger capability calls.
    let start_id = validate_graph(&workflow.nodes, &workflow.edges)?;

    // 4. Seed the runtime context from the caller's inputs.
    let mut ctx = NodeContext::seeded(inputs);

    // 5. Walk.
    let started = Instant::now();
    let mut steps: Vec<StepRecord> = Vec::new();
    let mut current = start_id;

    while !current.is_empty() {
        if cancel.is_cancelled() {
            return Ok(finish(
                executed_at,
                RunStatus::Cancelled,
                steps,
                Some(current),
                Some("execution cancelled: cancellation requested".into()),
            ));
        }
        if started.elapsed() >= config.workflow_timeout {
            return Ok(finish(
                executed_at,
                RunStatus::Cancelled,
                steps,
                Some(current),
                Some("execution cancelled: workflow deadline exceeded".into()),
            ));
        }
        if steps.len() >= config.max_steps {
            return Ok(finish(
                executed_at,
                RunStatus::Failed,
                steps,
                Some(current),
                Some("workflow exceeded maximum execution steps".into()),
            ));
        }

        let Some((node, record)) = node_map.get(current.as_str()) else {
            let error = format!("node \"{current}\" not found in workflow");
            return Ok(finish(executed_at, RunStatus::Failed, steps, Some(current), Some(error)));
        };

        debug!(node = %current, step = steps.len(), "executing node");

        // The per-node budget never extends past the workflow deadline.
        let budget = config
            .node_timeout
            .min(config.workflow_timeout.saturating_sub(started.elapsed()));
        let node_cancel = cancel.child_token();
        let node_started = Instant::now();
        let result = match tokio::time::timeout(budget, node.execute(&node_cancel, &ctx)).await {
            Ok(result) => result,
            Err(_) => Err(NodeError::Timeout(budget)),
        };
        drop(node_cancel);
        let duration_ms = node_started.elapsed().as_millis() as u64;

        match result {
            Err(err) => {
                let message = err.to_string();
                steps.push(StepRecord {
                    node_id: record.id.clone(),
                    node_type: record.node_type.clone(),
                    label: record.data.label.clone(),
                    description: record.data.description.clone(),
                    status: StepStatus::Error,
                    duration_ms,
                    output: None,
                    error: Some(message.clone()),
                });
                let failed = record.id.clone();
                warn!(node = %failed, error = %message, "node execution failed");
                return Ok(finish(
                    executed_at,
                    RunStatus::Failed,
                    steps,
                    Some(failed.clone()),
                    Some(format!("node \"{failed}\" failed: {message}")),
                ));
            }
            Ok(outcome) => {
                // Merge outputs into the bag for downstream nodes. Flat
                // namespace, last write wins.
                if let Some(output) = &outcome.output {
                    for (key, value) in output {
                        ctx.variables.insert(key.clone(), value.clone());
                    }
                }
                steps.push(StepRecord {
                    node_id: record.id.clone(),
                    node_type: record.node_type.clone(),
                    label: record.data.label.clone(),
                    description: record.data.description.clone(),
                    status: outcome.status,
                    duration_ms,
                    output: outcome.output,
                    error: None,
                });
                current = next_node(adjacency.get(current.as_str()), outcome.branch.as_deref());
            }
        }
    }

    Ok(finish(executed_at, RunStatus::Completed, steps, None, None))
}

fn finish(
    executed_at: String,
    status: RunStatus,
    steps: Vec<StepRecord>,
    failed_node: Option<String>,
    error: Option<String>,
) -> ExecutionReport {
    ExecutionReport {
        executed_at,
        status,
        steps,
        failed_node,
        error,
    }
}

/// Pick the next node from a node's outgoing edges.
///
/// A branch tag (condition node) selects the edge whose `source_handle`
/// matches. Without a branch, the first handle-less edge is followed. As a
/// final fallback the first edge wins; no edges means the walk is over.
fn next_node(edges: Option<&Vec<EdgeTarget>>, branch: Option<&str>) -> String {
    let Some(edges) = edges.filter(|e| !e.is_empty()) else {
        return String::new();
    };

    if let Some(branch) = branch.filter(|b| !b.is_empty()) {
        return edges
            .iter()
            .find(|e| e.source_handle.as_deref() == Some(branch))
            .map(|e| e.target.clone())
            .unwrap_or_default();
    }

    edges
        .iter()
        .find(|e| e.source_handle.is_none())
        .map(|e| e.target.clone())
        .unwrap_or_else(|| edges[0].target.clone())
}

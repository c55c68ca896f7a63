//! Structural graph validation, run before any node executes.
//!
//! Catching malformed graphs upfront avoids wasted capability calls.
//! Cycles are deliberately permitted (they encode while-loop patterns) and
//! are bounded at run time by the walker's step limit.

use std::collections::HashSet;

use crate::errors::GraphError;
use crate::types::{EdgeRecord, NodeRecord};

/// Validate a workflow graph and return the start node's id.
///
/// Checks, in order: unique instance ids, the presence of a `start` node,
/// edge endpoints resolving to known instances, and the absence of edges
/// into the start node. Errors are deterministic and classifiable.
pub fn validate_graph(nodes: &[NodeRecord], edges: &[EdgeRecord]) -> Result<String, GraphError> {
    let mut ids: HashSet<&str> = HashSet::with_capacity(nodes.len());
    let mut start_id: Option<&str> = None;

    for node in nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(GraphError::DuplicateNodeId(node.id.clone()));
        }
        if node.node_type == "start" && start_id.is_none() {
            start_id = Some(node.id.as_str());
        }
    }

    let start_id = start_id.ok_or(GraphError::MissingStart)?;

    for edge in edges {
        if !ids.contains(edge.source.as_str()) {
            return Err(GraphError::DanglingSource(edge.source.clone()));
        }
        if !ids.contains(edge.target.as_str()) {
            return Err(GraphError::DanglingTarget(edge.target.clone()));
        }
        if edge.target == start_id {
            return Err(GraphError::EdgeIntoStart(start_id.to_string()));
        }
    }

    Ok(start_id.to_string())
}

//! SeaORM entities for the five workflow tables.

pub mod node_library;
pub mod workflow;
pub mod workflow_edge;
pub mod workflow_node_instance;
pub mod workflow_snapshot;

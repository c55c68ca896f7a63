//! Execution-time types: the variable bag, per-node outcomes, and the
//! response returned to callers of the execute operation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome status of a single node execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Error,
}

/// Terminal status of a whole workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
}

/// The runtime variable bag threaded through a single execution.
///
/// Seeded from the caller's inputs; each completed node's outputs are merged
/// in by the walker, last write wins. Owned by exactly one execution, so no
/// synchronization is needed.
#[derive(Debug, Clone, Default)]
pub struct NodeContext {
    pub variables: HashMap<String, Value>,
}

impl NodeContext {
    pub fn seeded(inputs: &HashMap<String, Value>) -> Self {
        Self {
            variables: inputs.clone(),
        }
    }

    /// Look up a string variable. Non-string values read as absent.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.variables.get(key).and_then(Value::as_str)
    }

    /// Look up a numeric variable, coercing any JSON number (integer or
    /// float). Strings, booleans, and nulls read as absent.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.variables.get(key).and_then(Value::as_f64)
    }
}

/// What a node reports back to the walker.
///
/// `branch` is set by condition nodes to select the outgoing edge whose
/// `source_handle` matches; other nodes leave it unset and the walker
/// follows the unconditional edge.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub status: StepStatus,
    pub output: Option<Map<String, Value>>,
    pub branch: Option<String>,
}

impl ExecutionOutcome {
    pub fn completed() -> Self {
        Self {
            status: StepStatus::Completed,
            output: None,
            branch: None,
        }
    }

    pub fn with_output(output: Map<String, Value>) -> Self {
        Self {
            status: StepStatus::Completed,
            output: Some(output),
            branch: None,
        }
    }

    pub fn branched(branch: impl Into<String>, output: Map<String, Value>) -> Self {
        Self {
            status: StepStatus::Completed,
            output: Some(output),
            branch: Some(branch.into()),
        }
    }
}

/// The recorded result of one step of the walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub node_id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    pub description: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The response of the execute operation.
///
/// Business failures (a node error, the step limit, cancellation) are
/// encoded here with partial steps; only malformed workflows surface as
/// hard errors outside this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub executed_at: String,
    pub status: RunStatus,
    pub steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_coerces_integers_and_floats_only() {
        let mut ctx = NodeContext::default();
        ctx.variables.insert("int".into(), json!(25));
        ctx.variables.insert("float".into(), json!(28.5));
        ctx.variables.insert("text".into(), json!("30"));
        ctx.variables.insert("flag".into(), json!(true));
        ctx.variables.insert("nothing".into(), Value::Null);

        assert_eq!(ctx.number("int"), Some(25.0));
        assert_eq!(ctx.number("float"), Some(28.5));
        assert_eq!(ctx.number("text"), None);
        assert_eq!(ctx.number("flag"), None);
        assert_eq!(ctx.number("nothing"), None);
        assert_eq!(ctx.number("missing"), None);
    }

    #[test]
    fn string_lookup_ignores_non_strings() {
        let mut ctx = NodeContext::default();
        ctx.variables.insert("city".into(), json!("Sydney"));
        ctx.variables.insert("count".into(), json!(3));
        assert_eq!(ctx.string("city"), Some("Sydney"));
        assert_eq!(ctx.string("count"), None);
    }

    #[test]
    fn report_serializes_camel_case_and_omits_empty_fields() {
        let report = ExecutionReport {
            executed_at: "2026-08-02T00:00:00Z".into(),
            status: RunStatus::Completed,
            steps: vec![StepRecord {
                node_id: "start".into(),
                node_type: "start".into(),
                label: "Start".into(),
                description: "entry".into(),
                status: StepStatus::Completed,
                duration_ms: 3,
                output: None,
                error: None,
            }],
            failed_node: None,
            error: None,
        };
        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains(r#""executedAt""#));
        assert!(json.contains(r#""durationMs":3"#));
        assert!(json.contains(r#""status":"completed""#));
        assert!(!json.contains("failedNode"));
        assert!(!json.contains("error"));
    }
}

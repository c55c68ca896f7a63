//! Condition node: compares a runtime variable against a threshold and
//! emits a `"true"` / `"false"` branch tag for the walker to route on.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::errors::{GraphError, NodeError};
use crate::nodes::output_map;
use crate::traits::Node;
use crate::types::{BaseFields, ExecutionOutcome, NodeContext};

/// Fallback comparison variable when the metadata names none.
const DEFAULT_VARIABLE: &str = "temperature";
const DEFAULT_OPERATOR: &str = "greater_than";
const DEFAULT_THRESHOLD: f64 = 25.0;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConditionMetadata {
    condition_variable: String,
    #[allow(dead_code)] // declared for the canvas; routing uses the branch tag
    output_variables: Vec<String>,
}

pub struct ConditionNode {
    base: BaseFields,
    meta: ConditionMetadata,
}

impl ConditionNode {
    pub(crate) fn parse(base: BaseFields) -> Result<Self, GraphError> {
        let meta = serde_json::from_str(base.metadata.get())
            .map_err(|source| GraphError::Metadata { kind: "condition", source })?;
        Ok(Self { base, meta })
    }

    fn variable_name(&self) -> &str {
        if self.meta.condition_variable.is_empty() {
            DEFAULT_VARIABLE
        } else {
            &self.meta.condition_variable
        }
    }
}

#[async_trait]
impl Node for ConditionNode {
    fn base(&self) -> &BaseFields {
        &self.base
    }

    async fn execute(
        &self,
        _cancel: &CancellationToken,
        ctx: &NodeContext,
    ) -> Result<ExecutionOutcome, NodeError> {
        let var_name = self.variable_name();

        let value = ctx.number(var_name).ok_or_else(|| {
            NodeError::failed(format!("missing or invalid variable: {var_name}"))
        })?;

        let operator = match ctx.string("operator") {
            Some(op) if !op.is_empty() => op.to_string(),
            _ => DEFAULT_OPERATOR.to_string(),
        };

        let threshold = ctx.number("threshold").unwrap_or(DEFAULT_THRESHOLD);

        let met = evaluate(value, &operator, threshold)?;
        let branch = if met { "true" } else { "false" };
        let verdict = if met { "met" } else { "not met" };

        let output = output_map([
            ("conditionMet", json!(met)),
            ("threshold", json!(threshold)),
            ("operator", json!(operator)),
            ("actualValue", json!(value)),
            (
                "message",
                json!(format!(
                    "{var_name} {value:.1} is {operator} {threshold:.1} - condition {verdict}"
                )),
            ),
        ]);

        Ok(ExecutionOutcome::branched(branch, output))
    }
}

fn evaluate(value: f64, operator: &str, threshold: f64) -> Result<bool, NodeError> {
    match operator {
        "greater_than" => Ok(value > threshold),
        "less_than" => Ok(value < threshold),
        "equal_to" => Ok(value == threshold),
        "greater_than_or_equal" => Ok(value >= threshold),
        "less_than_or_equal" => Ok(value <= threshold),
        other => Err(NodeError::failed(format!("unsupported operator: {other}"))),
    }
}

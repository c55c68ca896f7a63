//! Form node: declares which input fields the caller must supply and which
//! variables they become for downstream nodes.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Map;
use tokio_util::sync::CancellationToken;

use crate::errors::{GraphError, NodeError};
use crate::traits::Node;
use crate::types::{BaseFields, ExecutionOutcome, NodeContext};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FormMetadata {
    input_fields: Vec<String>,
    output_variables: Vec<String>,
}

pub struct FormNode {
    base: BaseFields,
    meta: FormMetadata,
}

impl FormNode {
    pub(crate) fn parse(base: BaseFields) -> Result<Self, GraphError> {
        let meta = serde_json::from_str(base.metadata.get())
            .map_err(|source| GraphError::Metadata { kind: "form", source })?;
        Ok(Self { base, meta })
    }
}

#[async_trait]
impl Node for FormNode {
    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn validate(&self) -> Result<(), NodeError> {
        let id = &self.base.id;
        if self.meta.input_fields.is_empty() {
            return Err(NodeError::invalid(format!("form node \"{id}\": no input fields")));
        }
        for (i, field) in self.meta.input_fields.iter().enumerate() {
            if field.trim().is_empty() {
                return Err(NodeError::invalid(format!(
                    "form node \"{id}\": input field [{i}] is blank"
                )));
            }
        }
        if self.meta.output_variables.is_empty() {
            return Err(NodeError::invalid(format!(
                "form node \"{id}\": no output variables"
            )));
        }
        for (i, var) in self.meta.output_variables.iter().enumerate() {
            if var.trim().is_empty() {
                return Err(NodeError::invalid(format!(
                    "form node \"{id}\": output variable [{i}] is blank"
                )));
            }
        }
        // Every input field must be re-emitted, or its value would never
        // reach downstream nodes.
        for field in &self.meta.input_fields {
            if !self.meta.output_variables.contains(field) {
                return Err(NodeError::invalid(format!(
                    "form node \"{id}\": input field \"{field}\" not listed in output variables"
                )));
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: &CancellationToken,
        ctx: &NodeContext,
    ) -> Result<ExecutionOutcome, NodeError> {
        let mut output = Map::with_capacity(self.meta.input_fields.len());
        for field in &self.meta.input_fields {
            let value = ctx.variables.get(field).ok_or_else(|| {
                NodeError::failed(format!("missing required form field: {field}"))
            })?;
            output.insert(field.clone(), value.clone());
        }
        Ok(ExecutionOutcome::with_output(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::base;
    use serde_json::json;

    fn form(metadata: &str) -> FormNode {
        FormNode::parse(base("form", "form", metadata)).expect("parse")
    }

    #[test]
    fn validate_requires_fields_and_outputs() {
        let err = form(r#"{"inputFields":[],"outputVariables":["x"]}"#)
            .validate()
            .expect_err("no inputs");
        assert_eq!(err.to_string(), "form node \"form\": no input fields");

        let err = form(r#"{"inputFields":["x"],"outputVariables":[]}"#)
            .validate()
            .expect_err("no outputs");
        assert_eq!(err.to_string(), "form node \"form\": no output variables");
    }

    #[test]
    fn validate_rejects_blank_entries() {
        let err = form(r#"{"inputFields":["name","  "],"outputVariables":["name"]}"#)
            .validate()
            .expect_err("blank field");
        assert_eq!(err.to_string(), "form node \"form\": input field [1] is blank");
    }

    #[test]
    fn validate_requires_inputs_to_flow_downstream() {
        let err = form(r#"{"inputFields":["name","city"],"outputVariables":["name"]}"#)
            .validate()
            .expect_err("city not emitted");
        assert_eq!(
            err.to_string(),
            "form node \"form\": input field \"city\" not listed in output variables"
        );
    }

    #[tokio::test]
    async fn execute_passes_declared_fields_through() {
        let node = form(r#"{"inputFields":["name","city"],"outputVariables":["name","city"]}"#);
        node.validate().expect("valid");

        let mut ctx = NodeContext::default();
        ctx.variables.insert("name".into(), json!("Alice"));
        ctx.variables.insert("city".into(), json!("Sydney"));
        ctx.variables.insert("extra".into(), json!("ignored"));

        let outcome = node
            .execute(&CancellationToken::new(), &ctx)
            .await
            .expect("execute");
        let output = outcome.output.expect("has output");
        assert_eq!(output.len(), 2);
        assert_eq!(output["name"], json!("Alice"));
        assert_eq!(output["city"], json!("Sydney"));
    }

    #[tokio::test]
    async fn execute_fails_on_missing_field() {
        let node = form(r#"{"inputFields":["name","email"],"outputVariables":["name","email"]}"#);
        let mut ctx = NodeContext::default();
        ctx.variables.insert("name".into(), json!("Alice"));

        let err = node
            .execute(&CancellationToken::new(), &ctx)
            .await
            .expect_err("email missing");
        assert_eq!(err.to_string(), "missing required form field: email");
    }
}

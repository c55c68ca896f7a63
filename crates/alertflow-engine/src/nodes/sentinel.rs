//! Sentinel nodes mark the boundaries of a workflow graph (`start`, `end`).
//! Pure topology: a no-op at execution time.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::NodeError;
use crate::traits::Node;
use crate::types::{BaseFields, ExecutionOutcome, NodeContext};

pub struct SentinelNode {
    base: BaseFields,
}

impl SentinelNode {
    pub fn new(base: BaseFields) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Node for SentinelNode {
    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn validate(&self) -> Result<(), NodeError> {
        match self.base.node_type.as_str() {
            "start" | "end" => Ok(()),
            other => Err(NodeError::invalid(format!(
                "sentinel node \"{}\": unexpected type tag \"{other}\"",
                self.base.id
            ))),
        }
    }

    async fn execute(
        &self,
        _cancel: &CancellationToken,
        _ctx: &NodeContext,
    ) -> Result<ExecutionOutcome, NodeError> {
        Ok(ExecutionOutcome::completed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::base;
    use crate::types::StepStatus;

    #[tokio::test]
    async fn execute_is_a_completed_noop() {
        let node = SentinelNode::new(base("start", "start", "{}"));
        node.validate().expect("valid");
        let outcome = node
            .execute(&CancellationToken::new(), &NodeContext::default())
            .await
            .expect("noop");
        assert_eq!(outcome.status, StepStatus::Completed);
        assert!(outcome.output.is_none());
        assert!(outcome.branch.is_none());
    }

    #[test]
    fn validate_accepts_both_boundary_tags() {
        assert!(SentinelNode::new(base("start", "start", "{}")).validate().is_ok());
        assert!(SentinelNode::new(base("end", "end", "{}")).validate().is_ok());
    }

    #[test]
    fn validate_rejects_other_tags() {
        let err = SentinelNode::new(base("x", "form", "{}"))
            .validate()
            .expect_err("wrong tag");
        assert!(err.to_string().contains("unexpected type tag"));
    }
}

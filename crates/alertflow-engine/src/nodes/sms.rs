//! SMS node: sends the context's `message` to the context's `phone` number
//! through the SMS port.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::errors::{GraphError, NodeError};
use crate::nodes::output_map;
use crate::traits::{Node, SmsMessage, SmsProvider};
use crate::types::{BaseFields, ExecutionOutcome, NodeContext};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SmsMetadata {
    input_variables: Vec<String>,
    #[allow(dead_code)] // canvas-facing; outputs are fixed by the variant
    output_variables: Vec<String>,
}

pub struct SmsNode {
    base: BaseFields,
    meta: SmsMetadata,
    sms: Arc<dyn SmsProvider>,
}

impl SmsNode {
    pub(crate) fn parse(base: BaseFields, sms: Arc<dyn SmsProvider>) -> Result<Self, GraphError> {
        let meta = serde_json::from_str(base.metadata.get())
            .map_err(|source| GraphError::Metadata { kind: "sms", source })?;
        Ok(Self { base, meta, sms })
    }
}

#[async_trait]
impl Node for SmsNode {
    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn validate(&self) -> Result<(), NodeError> {
        if !self.meta.input_variables.iter().any(|v| v == "phone") {
            return Err(NodeError::invalid(format!(
                "sms node \"{}\": inputVariables must include \"phone\"",
                self.base.id
            )));
        }
        Ok(())
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        ctx: &NodeContext,
    ) -> Result<ExecutionOutcome, NodeError> {
        let phone = match ctx.string("phone") {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return Err(NodeError::failed("missing or invalid variable: phone")),
        };

        let body = ctx.string("message").unwrap_or_default().to_string();

        let delivery = self
            .sms
            .send(cancel, &SmsMessage { to: phone, body })
            .await
            .map_err(|e| NodeError::failed(format!("failed to send sms: {e}")))?;

        Ok(ExecutionOutcome::with_output(output_map([
            ("deliveryStatus", json!(delivery.delivery_status)),
            ("smsSent", Value::Bool(delivery.sent)),
        ])))
    }
}

//! Email node: composes a message from a template in metadata, resolving
//! `{{placeholder}}` tokens against the runtime variables, and hands the
//! result to the email port.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::errors::{GraphError, NodeError};
use crate::nodes::{display_value, output_map};
use crate::traits::{EmailMessage, EmailProvider, Node};
use crate::types::{BaseFields, ExecutionOutcome, NodeContext};

const FROM_ADDRESS: &str = "weather-alerts@example.com";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EmailMetadata {
    input_variables: Vec<String>,
    #[allow(dead_code)] // canvas-facing; outputs are fixed by the variant
    output_variables: Vec<String>,
    email_template: EmailTemplate,
}

#[derive(Debug, Default, Deserialize)]
struct EmailTemplate {
    subject: String,
    body: String,
}

pub struct EmailNode {
    base: BaseFields,
    meta: EmailMetadata,
    email: Arc<dyn EmailProvider>,
}

impl EmailNode {
    pub(crate) fn parse(base: BaseFields, email: Arc<dyn EmailProvider>) -> Result<Self, GraphError> {
        let meta = serde_json::from_str(base.metadata.get())
            .map_err(|source| GraphError::Metadata { kind: "email", source })?;
        Ok(Self { base, meta, email })
    }
}

#[async_trait]
impl Node for EmailNode {
    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn validate(&self) -> Result<(), NodeError> {
        let id = &self.base.id;
        if self.meta.email_template.subject.trim().is_empty() {
            return Err(NodeError::invalid(format!("email node \"{id}\": empty subject")));
        }
        if self.meta.email_template.body.trim().is_empty() {
            return Err(NodeError::invalid(format!("email node \"{id}\": empty body")));
        }
        if self.meta.input_variables.is_empty() {
            return Err(NodeError::invalid(format!(
                "email node \"{id}\": no input variables"
            )));
        }
        // Undeclared placeholders would silently survive substitution.
        let template = format!(
            "{} {}",
            self.meta.email_template.subject, self.meta.email_template.body
        );
        for key in placeholders(&template) {
            if !self.meta.input_variables.contains(&key) {
                return Err(NodeError::invalid(format!(
                    "email node \"{id}\": template placeholder \"{key}\" not listed in input variables"
                )));
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        ctx: &NodeContext,
    ) -> Result<ExecutionOutcome, NodeError> {
        let to = match ctx.string("email") {
            Some(addr) if !addr.is_empty() => addr.to_string(),
            _ => return Err(NodeError::failed("missing or invalid variable: email")),
        };

        let msg = EmailMessage {
            to,
            from: FROM_ADDRESS.to_string(),
            subject: resolve_template(&self.meta.email_template.subject, ctx),
            body: resolve_template(&self.meta.email_template.body, ctx),
        };

        let delivery = self
            .email
            .send(cancel, &msg)
            .await
            .map_err(|e| NodeError::failed(format!("failed to send email: {e}")))?;

        Ok(ExecutionOutcome::with_output(output_map([
            (
                "emailDraft",
                json!({
                    "to": msg.to,
                    "from": msg.from,
                    "subject": msg.subject,
                    "body": msg.body,
                }),
            ),
            ("deliveryStatus", json!(delivery.delivery_status)),
            ("emailSent", Value::Bool(delivery.sent)),
        ])))
    }
}

/// Replace every `{{key}}` with the variable's display form. Unknown keys
/// are left in place.
fn resolve_template(template: &str, ctx: &NodeContext) -> String {
    let mut result = template.to_string();
    for (key, value) in &ctx.variables {
        let token = format!("{{{{{key}}}}}");
        if result.contains(&token) {
            result = result.replace(&token, &display_value(value));
        }
    }
    result
}

/// Collect the `{{key}}` tokens appearing in a template.
fn placeholders(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else { break };
        found.push(after[..close].trim().to_string());
        rest = &after[close + 2..];
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::{base, RecordingEmail};
    use serde_json::json;

    const METADATA: &str = r#"{
        "inputVariables": ["name", "city", "temperature"],
        "outputVariables": ["emailSent"],
        "emailTemplate": {
            "subject": "Weather alert for {{city}}",
            "body": "Hi {{name}}, it is {{temperature}} degrees in {{city}}."
        }
    }"#;

    fn email_node(metadata: &str) -> (EmailNode, Arc<RecordingEmail>) {
        let provider = Arc::new(RecordingEmail::default());
        let node = EmailNode::parse(base("send-alert", "email", metadata), provider.clone())
            .expect("parse");
        (node, provider)
    }

    fn ctx_with_email() -> NodeContext {
        let mut ctx = NodeContext::default();
        ctx.variables.insert("email".into(), json!("alice@example.com"));
        ctx.variables.insert("name".into(), json!("Alice"));
        ctx.variables.insert("city".into(), json!("Sydney"));
        ctx.variables.insert("temperature".into(), json!(28.5));
        ctx
    }

    #[test]
    fn placeholders_are_extracted() {
        assert_eq!(
            placeholders("Hi {{name}}, {{city}} calling {{ spaced }}"),
            vec!["name".to_string(), "city".to_string(), "spaced".to_string()]
        );
        assert!(placeholders("no tokens {{unclosed").is_empty());
    }

    #[test]
    fn validate_checks_template_and_inputs() {
        let (node, _) = email_node(
            r#"{"inputVariables":["name"],"outputVariables":[],"emailTemplate":{"subject":"","body":"b"}}"#,
        );
        assert_eq!(
            node.validate().expect_err("subject").to_string(),
            "email node \"send-alert\": empty subject"
        );

        let (node, _) = email_node(
            r#"{"inputVariables":[],"outputVariables":[],"emailTemplate":{"subject":"s","body":"b"}}"#,
        );
        assert_eq!(
            node.validate().expect_err("inputs").to_string(),
            "email node \"send-alert\": no input variables"
        );

        let (node, _) = email_node(
            r#"{"inputVariables":["name"],"outputVariables":[],"emailTemplate":{"subject":"{{city}} alert","body":"b"}}"#,
        );
        assert_eq!(
            node.validate().expect_err("undeclared placeholder").to_string(),
            "email node \"send-alert\": template placeholder \"city\" not listed in input variables"
        );
    }

    #[tokio::test]
    async fn execute_resolves_template_and_sends() {
        let (node, provider) = email_node(METADATA);
        node.validate().expect("valid");

        let outcome = node
            .execute(&CancellationToken::new(), &ctx_with_email())
            .await
            .expect("execute");
        let output = outcome.output.expect("output");
        assert_eq!(output["emailSent"], json!(true));
        assert_eq!(output["deliveryStatus"], json!("sent"));
        assert_eq!(
            output["emailDraft"]["subject"],
            json!("Weather alert for Sydney")
        );
        assert_eq!(
            output["emailDraft"]["body"],
            json!("Hi Alice, it is 28.5 degrees in Sydney.")
        );

        let sent = provider.sent.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
        assert_eq!(sent[0].from, FROM_ADDRESS);
    }

    #[tokio::test]
    async fn missing_or_empty_email_is_an_error() {
        let (node, _) = email_node(METADATA);

        let err = node
            .execute(&CancellationToken::new(), &NodeContext::default())
            .await
            .expect_err("missing");
        assert_eq!(err.to_string(), "missing or invalid variable: email");

        let mut ctx = NodeContext::default();
        ctx.variables.insert("email".into(), json!(""));
        let err = node
            .execute(&CancellationToken::new(), &ctx)
            .await
            .expect_err("empty");
        assert_eq!(err.to_string(), "missing or invalid variable: email");
    }

    #[tokio::test]
    async fn unknown_placeholders_stay_in_place() {
        let (node, _) = email_node(METADATA);
        let mut ctx = ctx_with_email();
        ctx.variables.remove("temperature");

        let outcome = node
            .execute(&CancellationToken::new(), &ctx)
            .await
            .expect("execute");
        assert_eq!(
            outcome.output.expect("output")["emailDraft"]["body"],
            json!("Hi Alice, it is {{temperature}} degrees in Sydney.")
        );
    }
}

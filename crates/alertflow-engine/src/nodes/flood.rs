//! Flood node: the weather node's sibling, specialized to the flood port.
//! Same metadata shape and option invariants; emits a risk level and the
//! raw river discharge alongside the location.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{GraphError, NodeError};
use crate::nodes::output_map;
use crate::nodes::weather::IntegrationMetadata;
use crate::traits::{FloodProvider, Node};
use crate::types::{BaseFields, ExecutionOutcome, NodeContext};

pub struct FloodNode {
    base: BaseFields,
    meta: IntegrationMetadata,
    flood: Arc<dyn FloodProvider>,
}

impl FloodNode {
    pub(crate) fn parse(base: BaseFields, flood: Arc<dyn FloodProvider>) -> Result<Self, GraphError> {
        let meta = serde_json::from_str(base.metadata.get())
            .map_err(|source| GraphError::Metadata { kind: "flood", source })?;
        Ok(Self { base, meta, flood })
    }
}

#[async_trait]
impl Node for FloodNode {
    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn validate(&self) -> Result<(), NodeError> {
        self.meta.check("flood", &self.base.id)
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        ctx: &NodeContext,
    ) -> Result<ExecutionOutcome, NodeError> {
        let city = ctx
            .string("city")
            .ok_or_else(|| NodeError::failed("missing required input variable: city"))?;

        let opt = self
            .meta
            .find_city(city)
            .ok_or_else(|| NodeError::failed(format!("unsupported city: {city}")))?;

        debug!(city, lat = opt.lat, lon = opt.lon, "fetching flood risk");

        let reading = self
            .flood
            .flood_risk(cancel, opt.lat, opt.lon)
            .await
            .map_err(|e| NodeError::failed(format!("flood risk lookup failed: {e}")))?;

        debug!(
            city,
            risk = %reading.risk_level,
            discharge = reading.discharge,
            "flood risk result"
        );

        Ok(ExecutionOutcome::with_output(output_map([
            ("floodRisk", json!(reading.risk_level)),
            ("discharge", json!(reading.discharge)),
            ("location", json!(city)),
        ])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::{base, FixedFlood};
    use crate::traits::FloodReading;
    use serde_json::json;

    const METADATA: &str = r#"{
        "apiEndpoint": "https://flood-api.open-meteo.com/v1/flood",
        "inputVariables": ["city"],
        "outputVariables": ["floodRisk"],
        "options": [{"city": "Brisbane", "lat": -27.47, "lon": 153.03}]
    }"#;

    fn flood_node(reading: FloodReading) -> FloodNode {
        FloodNode::parse(
            base("flood-check", "flood", METADATA),
            Arc::new(FixedFlood(reading)),
        )
        .expect("parse")
    }

    #[tokio::test]
    async fn execute_emits_risk_discharge_and_location() {
        let node = flood_node(FloodReading {
            discharge: 42.7,
            risk_level: "high".into(),
        });
        node.validate().expect("valid");

        let mut ctx = NodeContext::default();
        ctx.variables.insert("city".into(), json!("brisbane"));

        let outcome = node
            .execute(&CancellationToken::new(), &ctx)
            .await
            .expect("execute");
        let output = outcome.output.expect("output");
        assert_eq!(output["floodRisk"], json!("high"));
        assert_eq!(output["discharge"], json!(42.7));
        assert_eq!(output["location"], json!("brisbane"));
    }

    #[tokio::test]
    async fn unknown_city_is_an_error() {
        let node = flood_node(FloodReading {
            discharge: 0.0,
            risk_level: "low".into(),
        });
        let mut ctx = NodeContext::default();
        ctx.variables.insert("city".into(), json!("Perth"));
        let err = node
            .execute(&CancellationToken::new(), &ctx)
            .await
            .expect_err("unsupported");
        assert_eq!(err.to_string(), "unsupported city: Perth");
    }

    #[test]
    fn validate_messages_use_the_flood_kind() {
        let metadata = r#"{"apiEndpoint":"","inputVariables":[],"outputVariables":[],"options":[]}"#;
        let node = FloodNode::parse(
            base("flood-check", "flood", metadata),
            Arc::new(FixedFlood(FloodReading {
                discharge: 0.0,
                risk_level: "low".into(),
            })),
        )
        .expect("parse");
        assert_eq!(
            node.validate().expect_err("invalid").to_string(),
            "flood node \"flood-check\": missing apiEndpoint"
        );
    }
}

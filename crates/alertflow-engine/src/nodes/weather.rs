//! Weather node: resolves a city from the runtime context, looks up its
//! coordinates in the configured options, and fetches the current
//! temperature through the weather port.
//!
//! Persisted graphs tag this variant `"integration"`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{GraphError, NodeError};
use crate::nodes::output_map;
use crate::traits::{Node, WeatherProvider};
use crate::types::{BaseFields, ExecutionOutcome, NodeContext};

/// A selectable location: display name plus coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct CityOption {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct IntegrationMetadata {
    pub api_endpoint: String,
    pub input_variables: Vec<String>,
    #[allow(dead_code)] // canvas-facing; outputs are fixed by the variant
    pub output_variables: Vec<String>,
    pub options: Vec<CityOption>,
}

impl IntegrationMetadata {
    /// The option invariants shared by the weather and flood variants:
    /// endpoint configured, at least one option and input variable, city
    /// names non-blank, coordinates inside the valid ranges (boundaries
    /// included).
    pub(crate) fn check(&self, kind: &str, id: &str) -> Result<(), NodeError> {
        if self.api_endpoint.is_empty() {
            return Err(NodeError::invalid(format!(
                "{kind} node \"{id}\": missing apiEndpoint"
            )));
        }
        if self.options.is_empty() {
            return Err(NodeError::invalid(format!(
                "{kind} node \"{id}\": no city options configured"
            )));
        }
        for (i, opt) in self.options.iter().enumerate() {
            if opt.city.trim().is_empty() {
                return Err(NodeError::invalid(format!(
                    "{kind} node \"{id}\": option [{i}] has blank city"
                )));
            }
            if !(-90.0..=90.0).contains(&opt.lat) {
                return Err(NodeError::invalid(format!(
                    "{kind} node \"{id}\": option \"{}\" lat {:.2} out of range [-90, 90]",
                    opt.city, opt.lat
                )));
            }
            if !(-180.0..=180.0).contains(&opt.lon) {
                return Err(NodeError::invalid(format!(
                    "{kind} node \"{id}\": option \"{}\" lon {:.2} out of range [-180, 180]",
                    opt.city, opt.lon
                )));
            }
        }
        if self.input_variables.is_empty() {
            return Err(NodeError::invalid(format!(
                "{kind} node \"{id}\": no input variables"
            )));
        }
        Ok(())
    }

    /// Match an option by city name, case-insensitively.
    pub(crate) fn find_city(&self, city: &str) -> Option<&CityOption> {
        self.options
            .iter()
            .find(|opt| opt.city.eq_ignore_ascii_case(city))
    }
}

pub struct WeatherNode {
    base: BaseFields,
    meta: IntegrationMetadata,
    weather: Arc<dyn WeatherProvider>,
}

impl WeatherNode {
    pub(crate) fn parse(
        base: BaseFields,
        weather: Arc<dyn WeatherProvider>,
    ) -> Result<Self, GraphError> {
        let meta = serde_json::from_str(base.metadata.get())
            .map_err(|source| GraphError::Metadata { kind: "integration", source })?;
        Ok(Self { base, meta, weather })
    }
}

#[async_trait]
impl Node for WeatherNode {
    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn validate(&self) -> Result<(), NodeError> {
        self.meta.check("weather", &self.base.id)
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

        debug!(city, lat = opt.lat, lon = opt.lon, "fetching weather");

        let temperature = self
            .weather
            .temperature(cancel, opt.lat, opt.lon)
            .await
            .map_err(|e| NodeError::failed(format!("weather lookup failed: {e}")))?;

        debug!(city, temperature, "weather result");

        Ok(ExecutionOutcome::with_output(output_map([
            ("temperature", json!(temperature)),
            ("location", json!(city)),
        ])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::{base, BrokenWeather, FixedWeather};
    use serde_json::json;

    const METADATA: &str = r#"{
        "apiEndpoint": "https://api.open-meteo.com/v1/forecast",
        "inputVariables": ["city"],
        "outputVariables": ["temperature"],
        "options": [
            {"city": "Sydney", "lat": -33.87, "lon": 151.21},
            {"city": "Brisbane", "lat": -27.47, "lon": 153.03}
        ]
    }"#;

    fn weather_node(metadata: &str, provider: Arc<dyn WeatherProvider>) -> WeatherNode {
        WeatherNode::parse(base("weather-api", "integration", metadata), provider).expect("parse")
    }

    fn city_ctx(city: &str) -> NodeContext {
        let mut ctx = NodeContext::default();
        ctx.variables.insert("city".into(), json!(city));
        ctx
    }

    #[tokio::test]
    async fn execute_emits_temperature_and_location() {
        let node = weather_node(METADATA, Arc::new(FixedWeather(28.5)));
        node.validate().expect("valid");
        let outcome = node
            .execute(&CancellationToken::new(), &city_ctx("Sydney"))
            .await
            .expect("execute");
        let output = outcome.output.expect("output");
        assert_eq!(output["temperature"], json!(28.5));
        assert_eq!(output["location"], json!("Sydney"));
    }

    #[tokio::test]
    async fn city_match_is_case_insensitive() {
        let node = weather_node(METADATA, Arc::new(FixedWeather(12.0)));
        let outcome = node
            .execute(&CancellationToken::new(), &city_ctx("bRiSbAnE"))
            .await
            .expect("execute");
        assert_eq!(outcome.output.expect("output")["location"], json!("bRiSbAnE"));
    }

    #[tokio::test]
    async fn unknown_city_is_an_error() {
        let node = weather_node(METADATA, Arc::new(FixedWeather(12.0)));
        let err = node
            .execute(&CancellationToken::new(), &city_ctx("Atlantis"))
            .await
            .expect_err("unsupported");
        assert_eq!(err.to_string(), "unsupported city: Atlantis");
    }

    #[tokio::test]
    async fn missing_city_is_an_error() {
        let node = weather_node(METADATA, Arc::new(FixedWeather(12.0)));
        let err = node
            .execute(&CancellationToken::new(), &NodeContext::default())
            .await
            .expect_err("missing");
        assert_eq!(err.to_string(), "missing required input variable: city");
    }

    #[tokio::test]
    async fn provider_failures_are_wrapped() {
        let node = weather_node(METADATA, Arc::new(BrokenWeather));
        let err = node
            .execute(&CancellationToken::new(), &city_ctx("Sydney"))
            .await
            .expect_err("broken provider");
        assert_eq!(
            err.to_string(),
            "weather lookup failed: request failed: connection refused"
        );
    }

    #[test]
    fn validate_rejects_out_of_range_coordinates() {
        let metadata = r#"{
            "apiEndpoint": "https://x",
            "inputVariables": ["city"],
            "outputVariables": [],
            "options": [{"city": "Nowhere", "lat": 91.0, "lon": 0.0}]
        }"#;
        let node = weather_node(metadata, Arc::new(FixedWeather(0.0)));
        let err = node.validate().expect_err("lat out of range");
        assert_eq!(
            err.to_string(),
            "weather node \"weather-api\": option \"Nowhere\" lat 91.00 out of range [-90, 90]"
        );
    }

    #[test]
    fn validate_accepts_boundary_coordinates() {
        let metadata = r#"{
            "apiEndpoint": "https://x",
            "inputVariables": ["city"],
            "outputVariables": [],
            "options": [
                {"city": "North Pole", "lat": 90.0, "lon": 180.0},
                {"city": "South Pole", "lat": -90.0, "lon": -180.0}
            ]
        }"#;
        weather_node(metadata, Arc::new(FixedWeather(0.0)))
            .validate()
            .expect("boundaries included");
    }

    #[test]
    fn validate_requires_endpoint_options_and_inputs() {
        let no_endpoint = r#"{"inputVariables":["city"],"outputVariables":[],"options":[{"city":"A","lat":0,"lon":0}]}"#;
        assert_eq!(
            weather_node(no_endpoint, Arc::new(FixedWeather(0.0)))
                .validate()
                .expect_err("endpoint")
                .to_string(),
            "weather node \"weather-api\": missing apiEndpoint"
        );

        let no_options = r#"{"apiEndpoint":"https://x","inputVariables":["city"],"outputVariables":[],"options":[]}"#;
        assert_eq!(
            weather_node(no_options, Arc::new(FixedWeather(0.0)))
                .validate()
                .expect_err("options")
                .to_string(),
            "weather node \"weather-api\": no city options configured"
        );

        let no_inputs = r#"{"apiEndpoint":"https://x","inputVariables":[],"outputVariables":[],"options":[{"city":"A","lat":0,"lon":0}]}"#;
        assert_eq!(
            weather_node(no_inputs, Arc::new(FixedWeather(0.0)))
                .validate()
                .expect_err("inputs")
                .to_string(),
            "weather node \"weather-api\": no input variables"
        );
    }
}

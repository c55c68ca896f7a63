//! Open-Meteo backed capability adapters.
//!
//! Both adapters share a `reqwest::Client` (cheap to clone, safe for
//! concurrent use) and race every request against the caller's
//! cancellation token.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::PortError;
use crate::traits::{FloodProvider, FloodReading, WeatherProvider};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const FLOOD_URL: &str = "https://flood-api.open-meteo.com/v1/flood";

/// Discharge thresholds (m³/s) separating the reported risk levels.
const DISCHARGE_MEDIUM: f64 = 3.0;
const DISCHARGE_HIGH: f64 = 10.0;

async fn get_json<T: for<'de> Deserialize<'de>>(
    http: &reqwest::Client,
    cancel: &CancellationToken,
    url: &str,
) -> Result<T, PortError> {
    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(PortError::Cancelled),
        result = http.get(url).send() => result.map_err(|e| PortError::Request {
            message: e.to_string(),
        })?,
    };

    let status = response.status();
    if !status.is_success() {
        return Err(PortError::Request {
            message: format!("API returned {status}"),
        });
    }

    response.json::<T>().await.map_err(|e| PortError::Payload {
        message: e.to_string(),
    })
}

/// Current-temperature lookups against the Open-Meteo forecast API.
pub struct OpenMeteoWeather {
    base_url: String,
    http: reqwest::Client,
}

impl OpenMeteoWeather {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(FORECAST_URL, http)
    }

    pub fn with_base_url(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }
}

#[derive(Deserialize)]
struct ForecastPayload {
    current_weather: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature: f64,
}

#[async_trait]
impl WeatherProvider for OpenMeteoWeather {
    async fn temperature(
        &self,
        cancel: &CancellationToken,
        lat: f64,
        lon: f64,
    ) -> Result<f64, PortError> {
        let url = format!(
            "{}?latitude={lat}&longitude={lon}&current_weather=true",
            self.base_url
        );
        info!(%url, "calling weather API");
        let payload: ForecastPayload = get_json(&self.http, cancel, &url).await?;
        Ok(payload.current_weather.temperature)
    }
}

/// River-discharge flood lookups against the Open-Meteo flood API.
pub struct OpenMeteoFlood {
    base_url: String,
    http: reqwest::Client,
}

impl OpenMeteoFlood {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(FLOOD_URL, http)
    }

    pub fn with_base_url(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }
}

#[derive(Deserialize)]
struct FloodPayload {
    daily: FloodDaily,
}

#[derive(Deserialize)]
struct FloodDaily {
    river_discharge: Vec<f64>,
}

/// Bucket a discharge reading into the coarse risk levels the workflow
/// nodes report.
fn risk_level(discharge: f64) -> &'static str {
    if discharge >= DISCHARGE_HIGH {
        "high"
    } else if discharge >= DISCHARGE_MEDIUM {
        "medium"
    } else {
        "low"
    }
}

#[async_trait]
impl FloodProvider for OpenMeteoFlood {
    async fn flood_risk(
        &self,
        cancel: &CancellationToken,
        lat: f64,
        lon: f64,
    ) -> Result<FloodReading, PortError> {
        let url = format!(
            "{}?latitude={lat}&longitude={lon}&daily=river_discharge",
            self.base_url
        );
        info!(%url, "calling flood API");
        let payload: FloodPayload = get_json(&self.http, cancel, &url).await?;
        let discharge = payload
            .daily
            .river_discharge
            .first()
            .copied()
            .ok_or(PortError::Payload {
                message: "no river_discharge values in response".into(),
            })?;
        Ok(FloodReading {
            discharge,
            risk_level: risk_level(discharge).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn weather_parses_current_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("current_weather", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current_weather": {"temperature": 28.5, "windspeed": 11.2}
            })))
            .mount(&server)
            .await;

        let adapter = OpenMeteoWeather::with_base_url(
            format!("{}/v1/forecast", server.uri()),
            reqwest::Client::new(),
        );
        let temp = adapter
            .temperature(&CancellationToken::new(), -33.87, 151.21)
            .await
            .expect("temperature");
        assert_eq!(temp, 28.5);
    }

    #[tokio::test]
    async fn weather_reports_http_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = OpenMeteoWeather::with_base_url(
            format!("{}/v1/forecast", server.uri()),
            reqwest::Client::new(),
        );
        let err = adapter
            .temperature(&CancellationToken::new(), 0.0, 0.0)
            .await
            .expect_err("http failure");
        assert!(err.to_string().contains("503"), "got: {err}");
    }

    #[tokio::test]
    async fn weather_reports_malformed_payloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nope": true})))
            .mount(&server)
            .await;

        let adapter = OpenMeteoWeather::with_base_url(
            format!("{}/v1/forecast", server.uri()),
            reqwest::Client::new(),
        );
        let err = adapter
            .temperature(&CancellationToken::new(), 0.0, 0.0)
            .await
            .expect_err("bad payload");
        assert!(matches!(err, PortError::Payload { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn cancelled_token_aborts_the_call() {
        // Point at a server that never answers quickly; the pre-cancelled
        // token must win the race.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(30)))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let adapter = OpenMeteoWeather::with_base_url(
            format!("{}/v1/forecast", server.uri()),
            reqwest::Client::new(),
        );
        let err = adapter
            .temperature(&cancel, 0.0, 0.0)
            .await
            .expect_err("cancelled");
        assert!(matches!(err, PortError::Cancelled));
    }

    #[tokio::test]
    async fn flood_reads_first_discharge_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/flood"))
            .and(query_param("daily", "river_discharge"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "daily": {"river_discharge": [12.4, 11.0, 9.8]}
            })))
            .mount(&server)
            .await;

        let adapter = OpenMeteoFlood::with_base_url(
            format!("{}/v1/flood", server.uri()),
            reqwest::Client::new(),
        );
        let reading = adapter
            .flood_risk(&CancellationToken::new(), -27.47, 153.03)
            .await
            .expect("reading");
        assert_eq!(reading.discharge, 12.4);
        assert_eq!(reading.risk_level, "high");
    }

    #[test]
    fn risk_levels_bucket_on_thresholds() {
        assert_eq!(risk_level(0.4), "low");
        assert_eq!(risk_level(3.0), "medium");
        assert_eq!(risk_level(10.0), "high");
    }
}

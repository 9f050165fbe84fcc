use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::{EngineError, EngineResult, ToolError, ToolResult};
use crate::tool::{Tool, ToolCall, ToolSet};

pub const GEOCODING_HOST: &str = "https://geocoding-api.open-meteo.com";
pub const FORECAST_HOST: &str = "https://api.open-meteo.com";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current_weather: Option<CurrentWeather>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentWeather {
    temperature: Option<f64>,
    windspeed: Option<f64>,
    winddirection: Option<f64>,
    time: Option<String>,
}

/// Current weather lookups backed by Open-Meteo, plus a small wellbeing check.
pub struct WeatherTools {
    client: Client,
    geocoding_host: String,
    forecast_host: String,
}

impl WeatherTools {
    pub fn new() -> EngineResult<Self> {
        Self::with_hosts(GEOCODING_HOST, FORECAST_HOST)
    }

    pub fn with_hosts<G, F>(geocoding_host: G, forecast_host: F) -> EngineResult<Self>
    where
        G: Into<String>,
        F: Into<String>,
    {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("relay-tools/1.0")
            .build()
            .map_err(|e| EngineError::Request(e.to_string()))?;

        Ok(Self {
            client,
            geocoding_host: geocoding_host.into(),
            forecast_host: forecast_host.into(),
        })
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> ToolResult<T> {
        let failed = |e: reqwest::Error| ToolError::ExecutionError(format!("Weather API error: {}", e));
        self.client
            .get(url)
            .query(query)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(failed)?
            .json()
            .await
            .map_err(failed)
    }

    async fn geocode(&self, city: &str) -> ToolResult<Option<(f64, f64)>> {
        let url = format!("{}/v1/search", self.geocoding_host.trim_end_matches('/'));
        let response: GeocodeResponse = self
            .fetch_json(url, &[("name", city.to_string()), ("count", "1".to_string())])
            .await?;
        Ok(response
            .results
            .first()
            .map(|place| (place.latitude, place.longitude)))
    }

    async fn current_weather(&self, city: &str) -> ToolResult<String> {
        let city = city.trim();
        let Some((latitude, longitude)) = self.geocode(city).await? else {
            return Ok(format!("Could not find city '{}'.", city));
        };

        let url = format!("{}/v1/forecast", self.forecast_host.trim_end_matches('/'));
        let forecast: ForecastResponse = self
            .fetch_json(
                url,
                &[
                    ("latitude", latitude.to_string()),
                    ("longitude", longitude.to_string()),
                    ("current_weather", "true".to_string()),
                ],
            )
            .await?;

        let current = forecast.current_weather.unwrap_or_default();
        let Some(temperature) = current.temperature else {
            return Ok(format!("Weather unavailable right now for {}.", city));
        };
        Ok(json!({
            "temperature": temperature,
            "wind": current.windspeed,
            "windDirection": current.winddirection,
            "time": current.time,
        })
        .to_string())
    }
}

#[async_trait]
impl ToolSet for WeatherTools {
    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "current_weather",
                "Get current weather for a city. Response formatted as JSON",
                json!({
                    "type": "object",
                    "properties": {
                        "city": {"type": "string", "description": "Name of the city"}
                    },
                    "required": ["city"]
                }),
            ),
            Tool::new(
                "how_are_you",
                "Responds briefly to a wellbeing check.",
                json!({"type": "object", "properties": {}}),
            ),
        ]
    }

    async fn call(&self, call: &ToolCall) -> ToolResult<String> {
        match call.name.as_str() {
            "current_weather" => {
                let city = call
                    .arguments
                    .get("city")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ToolError::InvalidParameters("city is required".to_string()))?;
                self.current_weather(city).await
            }
            "how_are_you" => Ok("I'm doing fine, how are you?".to_string()),
            other => Err(ToolError::ToolNotFound(other.to_string())),
        }
    }
}

//! Current weather lookup through the OpenWeatherMap API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use zeroize::Zeroizing;

use super::{ToolError, ToolHandler, ToolResult, string_argument};
use crate::core::realtime::openai::ToolDef;

/// OpenWeatherMap current weather endpoint.
pub const DEFAULT_OPEN_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Settings for [`WeatherTool`].
#[derive(Clone)]
pub struct WeatherConfig {
    pub api_key: Option<Zeroizing<String>>,
    pub url: String,
    /// ISO country code appended to every query, e.g. `JP`
    pub country: Option<String>,
    /// Language of the weather description
    pub lang: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: DEFAULT_OPEN_WEATHER_URL.to_string(),
            country: Some("JP".to_string()),
            lang: "ja".to_string(),
        }
    }
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("url", &self.url)
            .field("country", &self.country)
            .field("lang", &self.lang)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    weather: Vec<Condition>,
    main: Readings,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

/// Parsed current conditions for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: String,
    pub description: String,
    pub temperature: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

impl WeatherReport {
    /// One sentence suitable for reading aloud.
    pub fn summary(&self, date: time::Date) -> String {
        format!(
            "Weather in {} on {}/{}/{}: {}, currently {}°C (low {}°C, high {}°C), humidity {}%, wind {} m/s.",
            self.location,
            date.year(),
            u8::from(date.month()),
            date.day(),
            self.description,
            self.temperature,
            self.temp_min,
            self.temp_max,
            self.humidity,
            self.wind_speed,
        )
    }
}

/// `get_weather` tool.
#[derive(Debug, Clone)]
pub struct WeatherTool {
    client: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherTool {
    pub fn new(client: reqwest::Client, config: WeatherConfig) -> Self {
        Self { client, config }
    }

    /// Fetch current conditions for `location`.
    pub async fn fetch(&self, location: &str) -> ToolResult<WeatherReport> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ToolError::NotConfigured("OPEN_WEATHER_API_KEY".to_string()))?;

        let query = match &self.config.country {
            Some(country) if !country.is_empty() => format!("{location},{country}"),
            _ => location.to_string(),
        };

        let response = self
            .client
            .get(&self.config.url)
            .query(&[
                ("q", query.as_str()),
                ("appid", api_key.as_str()),
                ("units", "metric"),
                ("lang", self.config.lang.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(ToolError::NotFound(location.to_string())),
            status => return Err(ToolError::UpstreamStatus(status.as_u16())),
        }

        let body: CurrentWeather = response.json().await?;
        let description = body
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .unwrap_or_default();

        Ok(WeatherReport {
            location: location.to_string(),
            description,
            temperature: body.main.temp,
            temp_min: body.main.temp_min,
            temp_max: body.main.temp_max,
            humidity: body.main.humidity,
            wind_speed: body.wind.speed,
        })
    }

    /// Weather summary for `location`. Never fails: problems are described
    /// in the returned text.
    pub async fn lookup(&self, location: &str) -> String {
        tracing::debug!(location = %location, "Looking up weather");
        match self.fetch(location).await {
            Ok(report) => report.summary(OffsetDateTime::now_utc().date()),
            Err(ToolError::NotFound(_)) => format!(
                "No weather information was found for {location}. Please ask for a valid prefecture or city name."
            ),
            Err(e) => {
                tracing::error!(location = %location, error = %e, "Weather lookup failed");
                format!("Could not get the weather for {location}: {e}")
            }
        }
    }
}

#[async_trait]
impl ToolHandler for WeatherTool {
    fn name(&self) -> &'static str {
        "get_weather"
    }

    fn definition(&self) -> ToolDef {
        ToolDef::function(
            "get_weather",
            "Gets the current weather for a location",
            json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "Prefecture or city name, e.g. Tokyo, Osaka, Hokkaido"
                    }
                },
                "required": ["location"]
            }),
        )
    }

    async fn call(&self, arguments: Value) -> ToolResult<String> {
        let location = string_argument(&arguments, "location")?;
        Ok(self.lookup(location).await)
    }
}

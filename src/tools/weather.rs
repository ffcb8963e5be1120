//! Weather tools backed by WeatherAPI
//!
//! Two tools share one upstream client:
//! - `get_current_weather` - current conditions for a city
//! - `get_weather_forecast` - forecast for 1-3 days
//!
//! Raw upstream responses are normalized into stable payloads that match the
//! declared output schemas, so the model always sees a predictable shape.

use crate::tools::registry::Tool;
use crate::tools::types::{ObjectSchema, PropertySchema, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared WeatherAPI HTTP client used by both weather tools
#[derive(Clone)]
pub struct WeatherApi {
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    error: Option<UpstreamErrorBody>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: Option<String>,
}

impl WeatherApi {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        WeatherApi {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Issue one upstream request. The API key is sent as a query parameter
    /// and never written to logs.
    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, String> {
        if self.api_key.is_empty() {
            return Err("WEATHERAPI_KEY is not set".to_string());
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        let safe_params: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        log::info!(
            "[WEATHER] Upstream request: url={} params={}",
            url,
            safe_params.join("&")
        );

        let mut query: Vec<(&str, String)> = vec![("key", self.api_key.clone())];
        query.extend(params.iter().cloned());

        let response = crate::http::shared_client()
            .get(&url)
            .query(&query)
            .timeout(UPSTREAM_TIMEOUT)
            .send()
            .await
            .map_err(|e| format!("Weather API request failed: {}", e))?;

        let status = response.status();
        log::info!("[WEATHER] Upstream response: status={}", status.as_u16());

        let body = response
            .text()
            .await
            .map_err(|e| format!("Weather API read failed: {}", e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<UpstreamError>(&body)
                .ok()
                .and_then(|e| e.error.and_then(|b| b.message).or(e.message))
                .unwrap_or_else(|| body.trim().to_string());
            return Err(format!(
                "Weather API error ({}): {}",
                status.as_u16(),
                if message.is_empty() { "Unknown error" } else { message.as_str() }
            ));
        }

        serde_json::from_str(&body)
            .map_err(|_| "Weather API returned non-JSON response".to_string())
    }
}

fn location_property() -> PropertySchema {
    PropertySchema {
        schema_type: "object".to_string(),
        description: "Resolved location: name, region, country, localtime".to_string(),
        items: None,
    }
}

fn normalize_location(data: &Value) -> Value {
    let location = &data["location"];
    serde_json::json!({
        "name": location["name"],
        "region": location["region"],
        "country": location["country"],
        "localtime": location["localtime"],
    })
}

/// Flatten a raw `current.json` response into the declared output shape
fn normalize_current(data: &Value) -> Value {
    let current = &data["current"];
    serde_json::json!({
        "location": normalize_location(data),
        "temperature_c": current["temp_c"],
        "temperature_f": current["temp_f"],
        "feels_like_c": current["feelslike_c"],
        "feels_like_f": current["feelslike_f"],
        "humidity": current["humidity"],
        "condition": current["condition"]["text"],
        "wind_kph": current["wind_kph"],
        "wind_mph": current["wind_mph"],
    })
}

/// Flatten a raw `forecast.json` response into the declared output shape
fn normalize_forecast(data: &Value) -> Value {
    let empty = vec![];
    let forecast_days = data["forecast"]["forecastday"].as_array().unwrap_or(&empty);
    let days: Vec<Value> = forecast_days
        .iter()
        .map(|forecast_day| {
            let day = &forecast_day["day"];
            serde_json::json!({
                "date": forecast_day["date"],
                "condition": day["condition"]["text"],
                "max_temp_c": day["maxtemp_c"],
                "min_temp_c": day["mintemp_c"],
                "max_temp_f": day["maxtemp_f"],
                "min_temp_f": day["mintemp_f"],
                "avg_humidity": day["avghumidity"],
                "chance_of_rain": day["daily_chance_of_rain"],
            })
        })
        .collect();

    serde_json::json!({
        "location": normalize_location(data),
        "days": days,
    })
}

/// Clamp the requested forecast length to the supported 1..=3 range
fn clamp_days(days: i64) -> i64 {
    days.clamp(1, 3)
}

// =============================================================================
// CURRENT WEATHER
// =============================================================================

pub struct WeatherTool {
    api: WeatherApi,
    definition: ToolDefinition,
}

impl WeatherTool {
    pub const NAME: &'static str = "get_current_weather";

    pub fn new(api: WeatherApi) -> Self {
        let mut input_properties = HashMap::new();
        input_properties.insert(
            "location".to_string(),
            PropertySchema::string("City name, e.g. Boston, MA"),
        );

        let mut output_properties = HashMap::new();
        output_properties.insert("location".to_string(), location_property());
        output_properties.insert(
            "temperature_c".to_string(),
            PropertySchema::number("Current temperature in celsius"),
        );
        output_properties.insert(
            "temperature_f".to_string(),
            PropertySchema::number("Current temperature in fahrenheit"),
        );
        output_properties.insert(
            "feels_like_c".to_string(),
            PropertySchema::number("Feels-like temperature in celsius"),
        );
        output_properties.insert(
            "feels_like_f".to_string(),
            PropertySchema::number("Feels-like temperature in fahrenheit"),
        );
        output_properties.insert(
            "humidity".to_string(),
            PropertySchema::integer("Relative humidity percentage"),
        );
        output_properties.insert(
            "condition".to_string(),
            PropertySchema::string("Sky condition, e.g. Cloudy"),
        );
        output_properties.insert(
            "wind_kph".to_string(),
            PropertySchema::number("Wind speed in km/h"),
        );
        output_properties.insert(
            "wind_mph".to_string(),
            PropertySchema::number("Wind speed in mph"),
        );

        WeatherTool {
            api,
            definition: ToolDefinition {
                name: Self::NAME.to_string(),
                description: "Get the current weather for a city.".to_string(),
                input_schema: ObjectSchema::new(input_properties, vec!["location".to_string()]),
                output_schema: ObjectSchema::new(output_properties, vec![]),
            },
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        let location = params["location"].as_str().unwrap_or_default().to_string();
        log::info!("[WEATHER] get_current_weather location={}", location);

        let data = self
            .api
            .request(
                "current.json",
                &[("q", location), ("aqi", "no".to_string())],
            )
            .await?;
        Ok(normalize_current(&data))
    }
}

// =============================================================================
// FORECAST
// =============================================================================

pub struct ForecastTool {
    api: WeatherApi,
    definition: ToolDefinition,
}

impl ForecastTool {
    pub const NAME: &'static str = "get_weather_forecast";

    pub fn new(api: WeatherApi) -> Self {
        let mut input_properties = HashMap::new();
        input_properties.insert(
            "location".to_string(),
            PropertySchema::string("City name, e.g. Boston, MA"),
        );
        input_properties.insert(
            "days".to_string(),
            PropertySchema::integer("Number of days for forecast (1-3)"),
        );

        let mut output_properties = HashMap::new();
        output_properties.insert("location".to_string(), location_property());
        output_properties.insert(
            "days".to_string(),
            PropertySchema::array_of(
                PropertySchema {
                    schema_type: "object".to_string(),
                    description: "One forecast day: date, condition, temps, humidity, rain chance"
                        .to_string(),
                    items: None,
                },
                "Per-day forecast entries, soonest first",
            ),
        );

        ForecastTool {
            api,
            definition: ToolDefinition {
                name: Self::NAME.to_string(),
                description: "Get a weather forecast for up to 3 days for a city.".to_string(),
                input_schema: ObjectSchema::new(input_properties, vec!["location".to_string()]),
                output_schema: ObjectSchema::new(output_properties, vec!["days".to_string()]),
            },
        }
    }
}

#[async_trait]
impl Tool for ForecastTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        let location = params["location"].as_str().unwrap_or_default().to_string();
        // Out-of-range day counts from the model are clamped, not rejected
        let days = clamp_days(params["days"].as_i64().unwrap_or(3));
        log::info!(
            "[WEATHER] get_weather_forecast location={} days={}",
            location,
            days
        );

        let data = self
            .api
            .request(
                "forecast.json",
                &[
                    ("q", location),
                    ("days", days.to_string()),
                    ("aqi", "no".to_string()),
                    ("alerts", "no".to_string()),
                ],
            )
            .await?;
        Ok(normalize_forecast(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_current() -> Value {
        serde_json::json!({
            "location": {
                "name": "Tokyo",
                "region": "Tokyo",
                "country": "Japan",
                "localtime": "2025-11-02 09:00"
            },
            "current": {
                "temp_c": 8.0,
                "temp_f": 46.4,
                "feelslike_c": 6.5,
                "feelslike_f": 43.7,
                "humidity": 71,
                "condition": { "text": "Cloudy" },
                "wind_kph": 13.0,
                "wind_mph": 8.1
            }
        })
    }

    #[test]
    fn test_normalize_current_matches_output_schema() {
        let payload = normalize_current(&sample_current());
        assert_eq!(payload["condition"], "Cloudy");
        assert_eq!(payload["temperature_c"], 8.0);
        assert_eq!(payload["location"]["name"], "Tokyo");

        let tool = WeatherTool::new(WeatherApi::new("k", "https://example.test/v1"));
        assert!(tool.definition().output_schema.validate(&payload).is_ok());
    }

    #[test]
    fn test_normalize_current_tolerates_missing_fields() {
        let payload = normalize_current(&serde_json::json!({"location": {}, "current": {}}));
        assert!(payload["condition"].is_null());

        let tool = WeatherTool::new(WeatherApi::new("k", "https://example.test/v1"));
        assert!(tool.definition().output_schema.validate(&payload).is_ok());
    }

    #[test]
    fn test_normalize_forecast_matches_output_schema() {
        let raw = serde_json::json!({
            "location": { "name": "Tokyo" },
            "forecast": {
                "forecastday": [
                    {
                        "date": "2025-11-03",
                        "day": {
                            "maxtemp_c": 12.0,
                            "mintemp_c": 6.0,
                            "maxtemp_f": 53.6,
                            "mintemp_f": 42.8,
                            "avghumidity": 65.0,
                            "daily_chance_of_rain": 40,
                            "condition": { "text": "Light rain" }
                        }
                    }
                ]
            }
        });
        let payload = normalize_forecast(&raw);
        assert_eq!(payload["days"][0]["condition"], "Light rain");
        assert_eq!(payload["days"][0]["chance_of_rain"], 40);

        let tool = ForecastTool::new(WeatherApi::new("k", "https://example.test/v1"));
        assert!(tool.definition().output_schema.validate(&payload).is_ok());
    }

    #[test]
    fn test_clamp_days() {
        assert_eq!(clamp_days(-1), 1);
        assert_eq!(clamp_days(0), 1);
        assert_eq!(clamp_days(2), 2);
        assert_eq!(clamp_days(10), 3);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = WeatherApi::new("k", "https://example.test/v1/");
        assert_eq!(api.base_url, "https://example.test/v1");
    }
}

//! Current weather from OpenWeatherMap.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::{string_arg, Capability, CapabilityError};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    name: String,
    main: Readings,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

pub struct Weather {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl Weather {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, location: &str) -> Result<CurrentWeather, reqwest::Error> {
        self.http
            .get(format!("{}/weather", self.base_url))
            .query(&[("q", location), ("appid", self.api_key.as_str()), ("units", "imperial")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

fn render(report: &CurrentWeather) -> String {
    let description = report
        .weather
        .first()
        .map(|c| title_case(&c.description))
        .unwrap_or_else(|| "Unknown conditions".into());
    format!(
        "Weather in {}: {}\nTemperature: {:.0}°F (feels like {:.0}°F)\nHumidity: {:.0}%",
        report.name, description, report.main.temp, report.main.feels_like, report.main.humidity
    )
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Capability for Weather {
    fn name(&self) -> &'static str {
        "get_weather"
    }

    fn description(&self) -> &'static str {
        "Get current weather for a location. Provide a city name, optionally with state or country."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City, optionally with state or country"
                }
            },
            "required": ["location"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, CapabilityError> {
        let location = string_arg(&args, "location")?;
        match self.fetch(location).await {
            Ok(report) => Ok(render(&report)),
            Err(e) => {
                warn!(location, error = %e, "Weather lookup failed");
                Ok(format!(
                    "Sorry, I couldn't get weather information for {location}. Please try again later."
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_report() {
        let report: CurrentWeather = serde_json::from_value(json!({
            "name": "Portland",
            "main": { "temp": 61.7, "feels_like": 60.2, "humidity": 82 },
            "weather": [{ "description": "light rain" }]
        }))
        .unwrap();

        assert_eq!(
            render(&report),
            "Weather in Portland: Light Rain\nTemperature: 62°F (feels like 60°F)\nHumidity: 82%"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_yields_friendly_text() {
        let weather = Weather::new(reqwest::Client::new(), "key".into())
            .with_base_url("http://127.0.0.1:9");
        let text = weather
            .invoke(json!({ "location": "Paris" }))
            .await
            .unwrap();
        assert!(text.starts_with("Sorry, I couldn't get weather information for Paris"));
    }
}

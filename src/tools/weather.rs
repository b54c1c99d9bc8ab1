//! Mock weather tool.
//!
//! Returns randomized current conditions for a location. No external service
//! is contacted.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::mcp::handler::{get_optional_string_arg, get_string_arg, json_content, ToolHandler};
use crate::mcp::protocol::{Arguments, ContentBlock, Tool};

const CONDITIONS: [&str; 6] = [
    "Sunny",
    "Partly Cloudy",
    "Cloudy",
    "Rainy",
    "Snowy",
    "Stormy",
];

const FORECASTS: [&str; 6] = [
    "Clear skies expected for the next few days",
    "Partly cloudy with occasional sunshine",
    "Overcast conditions with light precipitation possible",
    "Rain expected throughout the week",
    "Cold weather with possible snow",
    "Stormy weather pattern moving through the area",
];

/// Temperature units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Celsius,
    Fahrenheit,
}

impl Units {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "celsius" => Ok(Self::Celsius),
            "fahrenheit" => Ok(Self::Fahrenheit),
            _ => Err(Error::InvalidToolArguments(format!(
                "Unsupported units: {} (expected celsius or fahrenheit)",
                s
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Conditions {
    temperature: i32,
    condition: &'static str,
    humidity: u32,
    wind_speed: u32,
    pressure: u32,
}

#[derive(Debug, Serialize)]
struct Forecast {
    summary: &'static str,
}

#[derive(Debug, Serialize)]
struct WeatherReport {
    location: String,
    units: Units,
    current: Conditions,
    forecast: Forecast,
    timestamp: String,
    source: &'static str,
}

fn mock_report(location: String, units: Units) -> WeatherReport {
    let mut rng = rand::thread_rng();
    let temperature = match units {
        Units::Fahrenheit => rng.gen_range(32..112),
        Units::Celsius => rng.gen_range(-10..25),
    };

    WeatherReport {
        location,
        units,
        current: Conditions {
            temperature,
            condition: CONDITIONS.choose(&mut rng).copied().unwrap_or("Sunny"),
            humidity: rng.gen_range(30..90),
            wind_speed: rng.gen_range(0..25),
            pressure: rng.gen_range(980..1040),
        },
        forecast: Forecast {
            summary: FORECASTS.choose(&mut rng).copied().unwrap_or(FORECASTS[0]),
        },
        timestamp: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        source: "Mock Weather Service",
    }
}

/// Weather tool.
#[derive(Debug, Default)]
pub struct WeatherTool;

impl WeatherTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolHandler for WeatherTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "weather".to_string(),
            description: "Get current weather information for a specified location (mock data for demonstration)".to_string(),
            input_schema: crate::tool_schema!(
                required: ["location"],
                "location": {
                    "type": "string",
                    "description": "Location to get weather for (city, country)"
                },
                "units": {
                    "type": "string",
                    "description": "Temperature units (celsius, fahrenheit)",
                    "default": "celsius",
                    "enum": ["celsius", "fahrenheit"]
                }
            ),
        }
    }

    async fn execute(&self, args: Arguments) -> Result<Vec<ContentBlock>> {
        let location = get_string_arg(&args, "location")?;
        if location.trim().is_empty() {
            return Err(Error::InvalidToolArguments(
                "Location cannot be empty".to_string(),
            ));
        }
        let units = match get_optional_string_arg(&args, "units") {
            Some(u) => Units::parse(&u)?,
            None => Units::Celsius,
        };

        tracing::info!("Getting weather for location: {} in {:?}", location, units);
        Ok(vec![json_content(&mock_report(location, units))?])
    }
}

//! Built-in demo tools: two mock weather tools with a deterministic
//! executor, for exercising the capture and optimization flows without any
//! real tooling.

use serde_json::{json, Value};

use rto_domain::message::ToolDefinition;
use rto_engine::ToolExecutor;

pub fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "get_weather",
            "Get current weather for a location. Returns temperature and conditions.",
            json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "City name, e.g., 'San Francisco, CA'",
                    }
                },
                "required": ["location"],
            }),
        ),
        ToolDefinition::new(
            "get_forecast",
            "Get 3-day weather forecast for a location.",
            json!({
                "type": "object",
                "properties": {
                    "location": {"type": "string", "description": "City name"},
                    "days": {
                        "type": "integer",
                        "description": "Number of days (1-3)",
                        "default": 3,
                    },
                },
                "required": ["location"],
            }),
        ),
    ]
}

/// Deterministic mock executor for the demo tools.
pub fn execute(name: &str, input: &Value) -> Result<String, String> {
    match name {
        "get_weather" => {
            let location = input["location"].as_str().unwrap_or("Unknown");
            let (temperature, conditions, humidity) =
                if location.to_lowercase().contains("san francisco") {
                    ("18°C", "Foggy", "85%")
                } else if location.to_lowercase().contains("new york") {
                    ("22°C", "Partly cloudy", "60%")
                } else {
                    ("20°C", "Clear", "50%")
                };
            Ok(json!({
                "location": location,
                "temperature": temperature,
                "conditions": conditions,
                "humidity": humidity,
            })
            .to_string())
        }
        "get_forecast" => {
            let location = input["location"].as_str().unwrap_or("Unknown");
            let days = input["days"].as_u64().unwrap_or(3).clamp(1, 3);
            let forecast: Vec<Value> = (0..days)
                .map(|i| {
                    let conditions = ["Sunny", "Cloudy", "Rainy"][(i % 3) as usize];
                    json!({
                        "day": i + 1,
                        "high": format!("{}°C", 20 + i * 2),
                        "low": format!("{}°C", 12 + i),
                        "conditions": conditions,
                    })
                })
                .collect();
            Ok(json!({"location": location, "forecast": forecast}).to_string())
        }
        other => Err(format!("unknown tool: {other}")),
    }
}

/// The tool set and executor to pass to the engine, empty when the demo
/// tools are not requested.
pub fn toolkit(enabled: bool) -> (Vec<ToolDefinition>, Option<&'static ToolExecutor>) {
    if enabled {
        (tools(), Some(&execute))
    } else {
        (Vec::new(), None)
    }
}

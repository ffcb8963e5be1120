pub mod registry;
pub mod types;
pub mod weather;

pub use registry::{RegistryError, Tool, ToolRegistry};
pub use types::{ObjectSchema, PropertySchema, ToolDefinition, ToolResult};
pub use weather::{ForecastTool, WeatherApi, WeatherTool};

use crate::config::Config;
use std::sync::Arc;

/// Build the registry with the built-in weather tools.
/// Tool names are unique by construction here, so registration cannot fail.
pub fn create_default_registry(config: &Config) -> ToolRegistry {
    let registry = ToolRegistry::with_timeout(config.tool_timeout);
    let api = WeatherApi::new(&config.weather_api_key, &config.weather_base_url);

    for result in [
        registry.register(Arc::new(WeatherTool::new(api.clone()))),
        registry.register(Arc::new(ForecastTool::new(api))),
    ] {
        if let Err(e) = result {
            log::error!("[REGISTRY] Failed to register built-in tool: {}", e);
        }
    }

    registry
}

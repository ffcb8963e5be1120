use std::env;
use std::time::Duration;

/// Immutable runtime configuration snapshot.
///
/// Built once at startup and passed into component constructors; no
/// component reads the environment directly.
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,

    // LLM settings
    pub model: String,
    pub llm_endpoint: String,
    pub llm_api_key: String,

    // Weather tool settings
    pub weather_base_url: String,
    pub weather_api_key: String,

    // Agent behavior
    pub agent_mode: String,
    pub max_turns: usize,
    pub memory_max_entries: usize,
    pub tool_timeout: Duration,
}

fn read_usize_env(name: &str, default: usize) -> usize {
    match env::var(name) {
        Err(_) => default,
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!(
                    "[CONFIG] Invalid integer {}={}. Using default={}",
                    name,
                    raw,
                    default
                );
                default
            }
        },
    }
}

impl Config {
    pub fn from_env() -> Self {
        let config = Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "./.db/agent.db".to_string()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            llm_endpoint: env::var("GEMINI_ENDPOINT")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            llm_api_key: env::var("GOOGLE_API_KEY").unwrap_or_default(),
            weather_base_url: env::var("WEATHERAPI_BASE_URL")
                .unwrap_or_else(|_| "https://api.weatherapi.com/v1".to_string()),
            weather_api_key: env::var("WEATHERAPI_KEY").unwrap_or_default(),
            agent_mode: env::var("AGENT_MODE")
                .unwrap_or_else(|_| "multi".to_string())
                .to_lowercase(),
            max_turns: read_usize_env("MAX_TURNS", 5).max(1),
            memory_max_entries: read_usize_env("MEMORY_MAX_ENTRIES", 10).max(1),
            tool_timeout: Duration::from_secs(read_usize_env("TOOL_TIMEOUT_SECS", 10).max(1) as u64),
        };

        // Never log secrets; warn early so misconfiguration is visible before
        // the first run fails.
        if config.llm_api_key.is_empty() {
            log::warn!("[CONFIG] GOOGLE_API_KEY is not set. LLM calls will fail.");
        }
        if config.weather_api_key.is_empty() {
            log::warn!("[CONFIG] WEATHERAPI_KEY is not set. Weather tools will fail.");
        }

        log::debug!(
            "[CONFIG] Loaded: model={} mode={} max_turns={} memory_max_entries={} database_url={}",
            config.model,
            config.agent_mode,
            config.max_turns,
            config.memory_max_entries,
            config.database_url
        );
        config
    }
}

use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Server configuration, read once from the environment at start-up
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Enables POST /ws/test-event
    pub test_events_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            test_events_enabled: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = lookup("BIND_ADDR")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.bind_addr);

        let test_events_enabled = match lookup("SENSORHUB_TEST_EVENTS") {
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Invalid SENSORHUB_TEST_EVENTS, using default");
                defaults.test_events_enabled
            }),
            None => defaults.test_events_enabled,
        };

        Self {
            bind_addr,
            test_events_enabled,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

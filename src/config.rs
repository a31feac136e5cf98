use std::env;

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Endpoint of the remote mover service.
    pub mover_url: String,
    /// Shared secret for the position loader; unset disables it.
    pub admin_key: Option<String>,
    /// Path of the JSON state file.
    pub state_file: String,
    /// Listen address for the HTTP server.
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            mover_url: env::var("GAMBITRON_MOVER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:9000/move".to_string()),
            admin_key: env::var("GAMBITRON_ADMIN_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            state_file: env::var("GAMBITRON_STATE_FILE")
                .unwrap_or_else(|_| "gambitron_state.json".to_string()),
            bind_addr: env::var("GAMBITRON_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

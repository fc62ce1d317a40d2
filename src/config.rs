// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Default trailing-edge debounce window for autosave writes.
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,

    /// Debounce window for the autosave scheduler, in milliseconds.
    pub autosave_debounce_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let autosave_debounce_ms = env::var("AUTOSAVE_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_AUTOSAVE_DEBOUNCE_MS);

        Self {
            database_url,
            rust_log,
            autosave_debounce_ms,
        }
    }
}

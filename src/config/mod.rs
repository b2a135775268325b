use std::env;
use std::path::PathBuf;

pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Transport gateway every outbound operation is POSTed to.
    pub gateway_url: String,
    pub currency: String,
    pub media_dir: PathBuf,
    pub rate_limit_max: usize,
    pub rate_limit_window_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:botteghino.db".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string()),
            gateway_url: env::var("GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "EUR".to_string()),
            media_dir: PathBuf::from(
                env::var("MEDIA_DIR").unwrap_or_else(|_| "event_images".to_string()),
            ),
            rate_limit_max: parse_env("RATE_LIMIT_MAX", 40),
            rate_limit_window_secs: parse_env("RATE_LIMIT_WINDOW_SECS", 60),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

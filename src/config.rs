use std::{env, path::PathBuf};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_PATH: &str = "data/cases.db";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub api_token: Option<String>,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            api_token: None,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unparseable numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: lookup("PORT")
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            db_path: lookup("APP_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            api_token: lookup("APP_API_TOKEN").filter(|token| !token.is_empty()),
            cors_origin: lookup("APP_CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            max_upload_bytes: lookup("APP_MAX_UPLOAD_BYTES")
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(defaults.max_upload_bytes),
        }
    }
}

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use agora_api::auth::ApiConfig;

/// Placeholder session secrets that should never reach production.
pub const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "your_secret_key"];

const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub api: ApiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: var("AGORA_HOST", "0.0.0.0"),
            port: parse(&lookup, "AGORA_PORT", 5001)?,
            db_path: var("AGORA_DB_PATH", "website.db").into(),
            api: ApiConfig {
                session_secret: var("AGORA_SESSION_SECRET", "dev-secret-change-me"),
                upload_dir: var("AGORA_UPLOAD_DIR", "static/uploads").into(),
                secure_cookies: parse(&lookup, "AGORA_SECURE_COOKIES", false)?,
                max_upload_bytes: parse(&lookup, "AGORA_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            },
        })
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        self.api.session_secret.is_empty()
            || PLACEHOLDER_SECRETS.contains(&self.api.session_secret.as_str())
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

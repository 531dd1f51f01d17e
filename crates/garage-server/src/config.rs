use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me", "secret"];

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("GARAGE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!(
                "GARAGE_JWT_SECRET is unset or still a placeholder; it must match the identity service's signing secret"
            );
        }

        let port = match var("GARAGE_PORT") {
            Some(v) => v.parse().with_context(|| format!("invalid GARAGE_PORT '{}'", v))?,
            None => 5000,
        };
        let max_upload_bytes = match var("GARAGE_MAX_UPLOAD_BYTES") {
            Some(v) => v
                .parse()
                .with_context(|| format!("invalid GARAGE_MAX_UPLOAD_BYTES '{}'", v))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            host: var("GARAGE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("GARAGE_DB_PATH").unwrap_or_else(|| "garage.db".into()).into(),
            upload_dir: var("GARAGE_UPLOAD_DIR").unwrap_or_else(|| "uploads".into()).into(),
            jwt_secret,
            max_upload_bytes,
        })
    }
}

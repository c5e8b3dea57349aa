// Process-wide settings, loaded once at startup.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Value of the `X-N8N-API-KEY` header.
    pub api_key: String,
    /// Instance root, e.g. `https://n8n.example.com`, without trailing slash.
    pub base_url: String,
    pub workflows_dir: PathBuf,
    pub backups_dir: PathBuf,
    pub timeout: Duration,
}

impl Config {
    /// Read the configuration from the process environment. Callers load
    /// `.env` beforehand (see `main.rs`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (api_key, base_url) = match (get("API_KEY"), get("N8N_URL")) {
            (Some(key), Some(url)) => (key, url),
            _ => bail!("API_KEY or N8N_URL not found in the environment or .env file"),
        };
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            bail!("N8N_URL must start with http:// or https://, got '{}'", base_url);
        }

        let workflows_dir = get("N8N_WORKFLOWS_DIR")
            .map(|d| expand_home(&d))
            .unwrap_or_else(|| PathBuf::from("workflows"));
        let backups_dir = get("N8N_BACKUPS_DIR")
            .map(|d| expand_home(&d))
            .unwrap_or_else(|| PathBuf::from("backups"));
        let timeout = match get("N8N_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("N8N_TIMEOUT_SECS is not a number: '{}'", raw))?;
                if secs == 0 {
                    bail!("N8N_TIMEOUT_SECS must be at least 1 second");
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Config {
            api_key,
            base_url,
            workflows_dir,
            backups_dir,
            timeout,
        })
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(dir: &str) -> PathBuf {
    match dir.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| Path::new(dir).to_path_buf()),
        None => PathBuf::from(dir),
    }
}

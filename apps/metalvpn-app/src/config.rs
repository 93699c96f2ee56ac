use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_PATHS: [&str; 2] = ["/etc/metalvpn/app.toml", "./metalvpn.toml"];

fn default_poll_interval_secs() -> u64 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_url: String,
    /// Telegram user id handed over by the WebApp bridge.
    pub user_id: i64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    pub storage_path: Option<PathBuf>,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub platform: String,
}

impl AppConfig {
    pub fn new(api_url: &str, user_id: i64) -> Self {
        Self {
            api_url: normalize_api_url(api_url),
            user_id,
            poll_interval_secs: default_poll_interval_secs(),
            storage_path: None,
            user_agent: String::new(),
            platform: String::new(),
        }
    }

    pub fn load() -> Result<Self> {
        for path in CONFIG_PATHS {
            if let Ok(contents) = fs::read_to_string(path) {
                tracing::info!("Loading config from {}", path);
                return Self::from_toml(&contents).with_context(|| format!("Invalid config {}", path));
            }
        }

        tracing::info!("Loading config from environment");
        Ok(Self {
            api_url: normalize_api_url(&std::env::var("API_URL").context("API_URL is not set")?),
            user_id: std::env::var("TG_USER_ID")
                .context("TG_USER_ID is not set")?
                .trim()
                .parse()
                .context("TG_USER_ID must be an integer")?,
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(default_poll_interval_secs),
            storage_path: std::env::var("STORAGE_PATH").ok().map(PathBuf::from),
            user_agent: std::env::var("USER_AGENT").unwrap_or_default(),
            platform: std::env::var("DEVICE_PLATFORM").unwrap_or_default(),
        })
    }

    /// Applies command line values on top of `loaded`. When loading failed
    /// and both the URL and the user id were given, the failure is logged and
    /// the command line values are used alone.
    pub fn with_overrides(
        loaded: Result<Self>,
        api_url: Option<&str>,
        user_id: Option<i64>,
    ) -> Result<Self> {
        let mut config = match (loaded, api_url, user_id) {
            (Ok(config), _, _) => config,
            (Err(e), Some(url), Some(id)) => {
                tracing::warn!("Config not loaded ({:#}), using command line values", e);
                Self::new(url, id)
            }
            (Err(e), _, _) => return Err(e),
        };
        if let Some(url) = api_url {
            config.api_url = normalize_api_url(url);
        }
        if let Some(id) = user_id {
            config.user_id = id;
        }
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(contents)?;
        config.api_url = normalize_api_url(&config.api_url);
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Adds a scheme when missing and drops the trailing slash.
pub fn normalize_api_url(raw: &str) -> String {
    let mut url = raw.trim().to_string();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        url = format!("https://{}", url);
    }
    while url.ends_with('/') {
        url.pop();
    }
    url
}

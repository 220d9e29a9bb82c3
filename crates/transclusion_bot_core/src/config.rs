use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, BotResult};

pub const DEFAULT_USER_AGENT: &str = "transclusion-bot/0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_READ_RETRIES: usize = 2;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// On-disk configuration. Every key is optional.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub wiki: WikiSection,
    #[serde(default)]
    pub auth: AuthSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiSection {
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_read_retries: Option<usize>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct AuthSection {
    pub username: Option<String>,
}

/// Load and parse a config file. Returns default if the file doesn't exist.
pub fn load_config_file(config_path: &Path) -> Result<ConfigFile> {
    if !config_path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Values given on the command line; they win over env and file.
/// Credentials are never taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
}

/// Fully resolved, immutable settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub max_read_retries: usize,
    pub retry_delay_ms: u64,
    pub credentials: Option<Credentials>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BotConfig {
    /// Resolve settings: overrides > env > file > defaults. The username
    /// comes from env or file, the password from env only.
    pub fn resolve(file: &ConfigFile, overrides: &ConfigOverrides) -> BotResult<Self> {
        Self::resolve_with(file, overrides, |key| env::var(key).ok())
    }

    fn resolve_with(
        file: &ConfigFile,
        overrides: &ConfigOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> BotResult<Self> {
        let env_value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_url = overrides
            .api_url
            .clone()
            .or_else(|| env_value("WIKI_API_URL"))
            .or_else(|| file.wiki.api_url.clone())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| BotError::Config("wiki API URL is required".to_string()))?;
        validate_api_url(&api_url)?;

        let user_agent = env_value("WIKI_USER_AGENT")
            .or_else(|| file.wiki.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let timeout_ms =
            parse_env::<u64>("WIKI_HTTP_TIMEOUT_MS", env_value("WIKI_HTTP_TIMEOUT_MS"))?
                .or(file.wiki.timeout_ms)
                .unwrap_or(DEFAULT_TIMEOUT_MS);
        let max_read_retries =
            parse_env::<usize>("WIKI_HTTP_RETRIES", env_value("WIKI_HTTP_RETRIES"))?
                .or(file.wiki.max_read_retries)
                .unwrap_or(DEFAULT_READ_RETRIES);
        let retry_delay_ms = parse_env::<u64>(
            "WIKI_HTTP_RETRY_DELAY_MS",
            env_value("WIKI_HTTP_RETRY_DELAY_MS"),
        )?
        .or(file.wiki.retry_delay_ms)
        .unwrap_or(DEFAULT_RETRY_DELAY_MS);

        let username = env_value("WIKI_BOT_USERNAME")
            .or_else(|| file.auth.username.clone())
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let password = env_value("WIKI_BOT_PASSWORD");

        let credentials = if username.is_empty() {
            None
        } else {
            let password = password.filter(|value| !value.is_empty()).ok_or_else(|| {
                BotError::Config(format!(
                    "a password is required for user {username} (set WIKI_BOT_PASSWORD)"
                ))
            })?;
            Some(Credentials { username, password })
        };

        Ok(Self {
            api_url,
            user_agent,
            timeout_ms,
            max_read_retries,
            retry_delay_ms,
            credentials,
        })
    }

    pub fn is_anonymous(&self) -> bool {
        self.credentials.is_none()
    }
}

fn validate_api_url(value: &str) -> BotResult<()> {
    let url = Url::parse(value)
        .map_err(|error| BotError::Config(format!("invalid wiki API URL {value}: {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BotError::Config(format!(
            "wiki API URL must use http or https: {value}"
        )));
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: Option<String>) -> BotResult<Option<T>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| BotError::Config(format!("{key} is not a valid number: {raw}"))),
    }
}

use std::cell::Cell;
use std::thread::sleep;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::api::{ApiParams, WikiSession};
use crate::config::BotConfig;

const REDACTED_PARAMS: &[&str] = &["lgpassword", "lgtoken", "token", "text"];

/// Blocking MediaWiki API client holding the session cookies.
pub struct MediaWikiClient {
    client: Client,
    api_url: Url,
    user_agent: String,
    max_read_retries: usize,
    retry_delay_ms: u64,
    request_count: Cell<usize>,
}

impl MediaWikiClient {
    pub fn new(config: &BotConfig) -> Result<Self> {
        let api_url = Url::parse(&config.api_url)
            .with_context(|| format!("invalid wiki API URL: {}", config.api_url))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .cookie_store(true)
            .build()
            .context("failed to build MediaWiki HTTP client")?;

        Ok(Self {
            client,
            api_url,
            user_agent: config.user_agent.clone(),
            max_read_retries: config.max_read_retries,
            retry_delay_ms: config.retry_delay_ms,
            request_count: Cell::new(0),
        })
    }

    /// GET request. Retried on transient transport failures.
    pub fn request_json_get(&self, params: &ApiParams<'_>) -> Result<Value> {
        let pairs = build_pairs(params);
        log_request("GET", &pairs);

        for attempt in 0..=self.max_read_retries {
            self.request_count.set(self.request_count.get() + 1);
            let response = self
                .client
                .get(self.api_url.clone())
                .header("User-Agent", self.user_agent.clone())
                .query(&pairs)
                .send();

            match response {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        if attempt < self.max_read_retries && is_retryable_status(status) {
                            self.wait_before_retry(attempt);
                            continue;
                        }
                        bail!("MediaWiki API request failed with HTTP {status}");
                    }
                    return response
                        .json()
                        .context("failed to decode MediaWiki API JSON response");
                }
                Err(error) => {
                    if attempt < self.max_read_retries && is_retryable_error(&error) {
                        self.wait_before_retry(attempt);
                        continue;
                    }
                    return Err(error).context("failed to call MediaWiki API");
                }
            }
        }

        bail!("MediaWiki API request exhausted retry budget")
    }

    /// POST request, sent exactly once.
    pub fn request_json_post(&self, params: &ApiParams<'_>) -> Result<Value> {
        let pairs = build_pairs(params);
        log_request("POST", &pairs);

        self.request_count.set(self.request_count.get() + 1);
        let response = self
            .client
            .post(self.api_url.clone())
            .header("User-Agent", self.user_agent.clone())
            .form(&pairs)
            .send()
            .context("failed to call MediaWiki API")?;

        let status = response.status();
        if !status.is_success() {
            bail!("MediaWiki API request failed with HTTP {status}");
        }
        response
            .json()
            .context("failed to decode MediaWiki API JSON response")
    }

    fn wait_before_retry(&self, attempt: usize) {
        let exponent = u32::try_from(attempt).unwrap_or(16);
        let base = self
            .retry_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent));
        let jitter = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| u64::from(duration.subsec_millis() % 100))
            .unwrap_or(0);
        sleep(Duration::from_millis(base.saturating_add(jitter)));
    }
}

impl WikiSession for MediaWikiClient {
    fn query(&self, params: &ApiParams<'_>) -> Result<Value> {
        let mut full = Vec::with_capacity(params.len() + 1);
        full.push(("action", "query".to_string()));
        full.extend(params.iter().cloned());
        self.request_json_get(&full)
    }

    fn edit(&self, params: &ApiParams<'_>) -> Result<Value> {
        let mut full = Vec::with_capacity(params.len() + 1);
        full.push(("action", "edit".to_string()));
        full.extend(params.iter().cloned());
        self.request_json_post(&full)
    }

    fn request_count(&self) -> usize {
        self.request_count.get()
    }
}

fn build_pairs(params: &ApiParams<'_>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len() + 2);
    pairs.push(("format".to_string(), "json".to_string()));
    pairs.push(("formatversion".to_string(), "2".to_string()));
    for (key, value) in params {
        if !value.is_empty() {
            pairs.push(((*key).to_string(), value.clone()));
        }
    }
    pairs
}

fn log_request(method: &str, pairs: &[(String, String)]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let rendered = pairs
        .iter()
        .map(|(key, value)| {
            if REDACTED_PARAMS.contains(&key.as_str()) {
                format!("{key}=<{} bytes>", value.len())
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join("&");
    debug!("{method} {rendered}");
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

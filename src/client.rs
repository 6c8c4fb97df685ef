use std::{collections::HashMap, thread, time::Duration};

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Attempts per request chain, including the first one
pub const MAX_ATTEMPTS: u8 = 3;

/// First backoff delay, doubled for every following attempt
pub const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Added on top of the rate limit reset time before retrying
pub const RATE_LIMIT_BUFFER: Duration = Duration::from_millis(1000);

/// A raw HTTP response. Header names are lowercase.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends GET requests. The error is a description of a transport failure.
pub trait Transport {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse, String>;
}

/// Suspends the current run, for backoff, rate limits and throttling.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse, String> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        let response = request.send().map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().map_err(|e| e.to_string())?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Quota information GitHub attaches to its responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitState {
    pub remaining: Option<u64>,
    /// Epoch seconds
    pub reset: Option<i64>,
}

impl RateLimitState {
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            remaining: response
                .header("x-ratelimit-remaining")
                .and_then(|v| v.trim().parse().ok()),
            reset: response
                .header("x-ratelimit-reset")
                .and_then(|v| v.trim().parse().ok()),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.reset.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Delay before the attempt following `attempt` (1-based): base * 2^(attempt - 1)
pub fn backoff_delay(base: Duration, attempt: u8) -> Duration {
    let exponent = u32::from(attempt.max(1) - 1);
    base.saturating_mul(2u32.saturating_pow(exponent))
}

/// How long to wait for the quota to reset. A reset in the past (or a
/// missing one) only waits for the buffer.
pub fn rate_limit_wait(reset: Option<i64>, now_ms: i64, buffer: Duration) -> Duration {
    let until_reset = reset
        .map(|secs| secs.saturating_mul(1000).saturating_sub(now_ms))
        .unwrap_or(0)
        .max(0);
    Duration::from_millis(until_reset as u64) + buffer
}

pub struct GitHubClient {
    token: Option<String>,
    api_base: String,
    transport: Box<dyn Transport>,
    sleeper: Box<dyn Sleeper>,
}

impl GitHubClient {
    /// A client backed by reqwest and real sleeps
    pub fn new(token: Option<String>, api_base: &str) -> Result<Self, ApiError> {
        Ok(Self::with_parts(
            token,
            api_base,
            Box::new(ReqwestTransport::new()?),
            Box::new(ThreadSleeper),
        ))
    }

    pub fn with_parts(
        token: Option<String>,
        api_base: &str,
        transport: Box<dyn Transport>,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            transport,
            sleeper,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    pub fn pause(&self, duration: Duration) {
        self.sleeper.sleep(duration);
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("User-Agent", "gh-member-snapshot".to_string()),
            ("Accept", "application/vnd.github+json".to_string()),
            ("X-GitHub-Api-Version", "2022-11-28".to_string()),
        ];
        if let Some(token) = &self.token {
            headers.push(("Authorization", format!("Bearer {token}")));
        }
        headers
    }

    /// GET an absolute URL and decode its JSON body, retrying on failure
    pub fn request<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let headers = self.headers();
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            println!(
                "{} {} ({attempt}/{MAX_ATTEMPTS})",
                "Requesting".yellow(),
                url.white()
            );

            match self.transport.get(url, &headers) {
                Ok(response) => {
                    let rate_limit = RateLimitState::from_response(&response);
                    if let Some(remaining) = rate_limit.remaining {
                        println!(
                            "{} {}",
                            "Remaining API quota:".green(),
                            remaining.to_string().white()
                        );
                    }

                    if response.status == 403 && rate_limit.is_exhausted() {
                        if attempt >= MAX_ATTEMPTS {
                            println!("{}", "Retries exhausted".red());
                            return Err(ApiError::RateLimitExceeded {
                                reset_at: rate_limit.reset_at(),
                            });
                        }
                        let wait = rate_limit_wait(
                            rate_limit.reset,
                            Utc::now().timestamp_millis(),
                            RATE_LIMIT_BUFFER,
                        );
                        println!(
                            "{} {}s {}",
                            "Rate limited by GitHub, waiting".yellow(),
                            wait.as_secs().to_string().white(),
                            "before retrying".yellow()
                        );
                        self.sleeper.sleep(wait);
                        continue;
                    }

                    if response.is_success() {
                        match serde_json::from_str::<T>(&response.body) {
                            Ok(value) => return Ok(value),
                            Err(e) => {
                                last_error = format!("Could not deserialize GitHub's response: {e}")
                            }
                        }
                    } else {
                        last_error = format!("HTTP {}", response.status);
                    }
                }
                Err(e) => last_error = e,
            }

            println!(
                "{} ({attempt}/{MAX_ATTEMPTS}): {}",
                "Request failed".red(),
                last_error.red()
            );

            if attempt < MAX_ATTEMPTS {
                let wait = backoff_delay(BASE_DELAY, attempt);
                println!(
                    "{} {}ms",
                    "Going to retry after".yellow(),
                    wait.as_millis().to_string().white()
                );
                self.sleeper.sleep(wait);
            }
        }

        println!("{}", "Retries exhausted".red());
        Err(ApiError::RequestFailed {
            url: url.to_string(),
            attempts: MAX_ATTEMPTS,
            last_error,
        })
    }
}

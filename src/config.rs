//! Checker configuration and the per-run request profile

use crate::error::{CheckError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use rand::seq::SliceRandom;
use reqwest::Url;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Default timeout for a single verification attempt in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default pause applied after every attempt in milliseconds
const DEFAULT_THROTTLE_MILLIS: u64 = 100;

/// Default number of concurrent workers
const DEFAULT_CONCURRENCY: usize = 10;

/// Default directory receiving `live.txt` and `dead.txt`
const DEFAULT_OUTPUT_DIR: &str = "result";

/// Default service used to report the egress IP
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";

/// Default JSON field carrying the item in the request body
const DEFAULT_BODY_FIELD: &str = "email";

/// Browser user agents a run picks its identity from
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
];

/// Pick a user agent at random
fn random_user_agent() -> String {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
        .to_string()
}

/// Fixed request shape shared by every attempt of a run.
///
/// Assembled once at startup. The user agent is drawn at random per run and
/// then stays fixed; the run id lets requests from one run be correlated on
/// the endpoint side.
#[derive(Debug, Clone)]
pub struct RequestProfile {
    /// JSON field name holding the item
    pub body_field: String,
    pub user_agent: String,
    /// Extra `(name, value)` headers supplied by the operator
    pub extra_headers: Vec<(String, String)>,
    pub run_id: Uuid,
}

impl Default for RequestProfile {
    fn default() -> Self {
        Self {
            body_field: DEFAULT_BODY_FIELD.to_string(),
            user_agent: random_user_agent(),
            extra_headers: Vec::new(),
            run_id: Uuid::new_v4(),
        }
    }
}

impl RequestProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body_field(mut self, field: String) -> Self {
        self.body_field = field;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_header(mut self, name: String, value: String) -> Self {
        self.extra_headers.push((name, value));
        self
    }

    /// Parse a `Name: value` header argument
    pub fn parse_header_arg(arg: &str) -> Result<(String, String)> {
        let (name, value) = arg
            .split_once(':')
            .ok_or_else(|| CheckError::InvalidHeader(format!("expected 'Name: value', got '{}'", arg)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CheckError::InvalidHeader(format!("empty header name in '{}'", arg)));
        }
        Ok((name.to_string(), value.trim().to_string()))
    }

    /// Value of the client identification header
    pub fn client_header(&self) -> String {
        format!(
            "app=bulk-checker; platform={}; version={}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        )
    }

    /// Build the header set sent with every verification request
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(USER_AGENT, header_value(&self.user_agent)?);
        headers.insert(
            HeaderName::from_static("x-client"),
            header_value(&self.client_header())?,
        );
        headers.insert(
            HeaderName::from_static("x-run-id"),
            header_value(&self.run_id.to_string())?,
        );

        for (name, value) in &self.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| CheckError::InvalidHeader(format!("{}: {}", name, e)))?;
            headers.insert(name, header_value(value)?);
        }

        Ok(headers)
    }

    /// JSON body for one item
    pub fn body(&self, item: &str) -> Value {
        let mut body = Map::new();
        body.insert(self.body_field.clone(), Value::String(item.to_string()));
        Value::Object(body)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| CheckError::InvalidHeader(format!("{}: {}", value, e)))
}

/// Configuration for a bulk check run
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Verification endpoint receiving one POST per attempt
    pub endpoint: String,
    /// Timeout for each attempt
    pub timeout: Duration,
    /// Pause after every attempt, whatever the outcome
    pub throttle: Duration,
    /// Number of items in flight at once
    pub concurrency: usize,
    /// Diagnostic egress IP lookup, `None` disables it
    pub ip_lookup_url: Option<String>,
    /// Directory receiving the result files
    pub output_dir: PathBuf,
    /// Optional ceiling on attempts per item, `None` retries forever
    pub max_attempts: Option<u32>,
    pub profile: RequestProfile,
}

impl CheckerConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            throttle: Duration::from_millis(DEFAULT_THROTTLE_MILLIS),
            concurrency: DEFAULT_CONCURRENCY,
            ip_lookup_url: Some(DEFAULT_IP_LOOKUP_URL.to_string()),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_attempts: None,
            profile: RequestProfile::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_ip_lookup_url(mut self, url: Option<String>) -> Self {
        self.ip_lookup_url = url;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_profile(mut self, profile: RequestProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Reject configurations that cannot start a run
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(CheckError::InvalidConfig(
                "number of threads must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(CheckError::InvalidConfig(
                "max attempts must be greater than 0".to_string(),
            ));
        }
        Url::parse(&self.endpoint)
            .map_err(|e| CheckError::InvalidConfig(format!("endpoint '{}': {}", self.endpoint, e)))?;
        if let Some(url) = &self.ip_lookup_url {
            Url::parse(url)
                .map_err(|e| CheckError::InvalidConfig(format!("ip lookup url '{}': {}", url, e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checker_config_default() {
        let config = CheckerConfig::new("https://example.com/verify");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.throttle, Duration::from_millis(DEFAULT_THROTTLE_MILLIS));
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.output_dir, PathBuf::from("result"));
        assert_eq!(config.ip_lookup_url.as_deref(), Some(DEFAULT_IP_LOOKUP_URL));
        assert!(config.max_attempts.is_none());
    }

    #[test]
    fn test_checker_config_builder() {
        let config = CheckerConfig::new("https://example.com/verify")
            .with_timeout(Duration::from_secs(3))
            .with_throttle(Duration::from_millis(5))
            .with_concurrency(120)
            .with_ip_lookup_url(None)
            .with_output_dir("out")
            .with_max_attempts(Some(4));

        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.throttle, Duration::from_millis(5));
        assert_eq!(config.concurrency, 120);
        assert!(config.ip_lookup_url.is_none());
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.max_attempts, Some(4));
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let config = CheckerConfig::new("https://example.com/verify").with_concurrency(0);
        assert!(matches!(config.validate(), Err(CheckError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let config = CheckerConfig::new("not a url");
        assert!(config.validate().is_err());
        assert!(CheckerConfig::new("https://example.com/verify").validate().is_ok());
    }

    #[test]
    fn test_profile_body_uses_configured_field() {
        let profile = RequestProfile::new().with_body_field("login".to_string());
        assert_eq!(profile.body("a@b.c"), serde_json::json!({ "login": "a@b.c" }));
        assert_eq!(RequestProfile::new().body("x"), serde_json::json!({ "email": "x" }));
    }

    #[test]
    fn test_profile_headers() {
        let profile = RequestProfile::new()
            .with_user_agent("agent/1".to_string())
            .with_header("X-Api-Key".to_string(), "secret".to_string());
        let headers = profile.headers().unwrap();

        assert_eq!(headers[USER_AGENT], "agent/1");
        assert_eq!(headers["x-api-key"], "secret");
        assert_eq!(headers["x-run-id"], profile.run_id.to_string().as_str());
        assert!(headers["x-client"].to_str().unwrap().contains("app=bulk-checker"));
    }

    #[test]
    fn test_user_agent_is_random_per_profile() {
        let agents: std::collections::HashSet<_> =
            (0..64).map(|_| RequestProfile::new().user_agent).collect();
        assert!(agents.len() > 1);
        assert!(agents.iter().all(|ua| USER_AGENTS.contains(&ua.as_str())));
    }

    #[test]
    fn test_user_agent_fixed_within_profile() {
        let profile = RequestProfile::new();
        let first = profile.headers().unwrap();
        let second = profile.headers().unwrap();
        assert_eq!(first[USER_AGENT], profile.user_agent.as_str());
        assert_eq!(first[USER_AGENT], second[USER_AGENT]);
        assert_eq!(profile.clone().user_agent, profile.user_agent);
    }

    #[test]
    fn test_run_id_differs_per_profile() {
        assert_ne!(RequestProfile::new().run_id, RequestProfile::new().run_id);
    }

    #[test]
    fn test_parse_header_arg() {
        let (name, value) = RequestProfile::parse_header_arg("Authorization: Bearer abc").unwrap();
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Bearer abc");
        assert!(RequestProfile::parse_header_arg("no-colon").is_err());
        assert!(RequestProfile::parse_header_arg(": value").is_err());
    }
}

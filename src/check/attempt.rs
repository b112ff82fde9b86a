//! A single verification round-trip

use crate::config::{CheckerConfig, RequestProfile};
use crate::error::{CheckError, Result};
use crate::proxy::{EgressPool, Proxy};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info};

/// Reason recorded for a rejected item whose body carries no description
pub const FALLBACK_REASON: &str = "Description not available.";

/// Outcome of one attempt. Only `Live` and `Dead` end an item's retry loop.
#[derive(Debug)]
pub enum Attempt {
    Live,
    Dead { reason: String },
    /// Any status other than 200 or 400
    Indeterminate { status: StatusCode },
    /// The transport failed before a status was received
    Fault(CheckError),
}

impl Attempt {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Attempt::Live | Attempt::Dead { .. })
    }
}

/// Performs one classification attempt for an item over an optional proxy
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Diagnostics for the route, run before each attempt and outside its
    /// timed window
    async fn before_attempt(&self, _proxy: Option<&Proxy>) {}

    async fn attempt(&self, item: &str, proxy: Option<&Proxy>) -> Attempt;
}

#[derive(Deserialize)]
struct Rejection {
    details: Option<RejectionDetails>,
}

#[derive(Deserialize)]
struct RejectionDetails {
    description: Option<String>,
}

#[derive(Deserialize)]
struct IpLookup {
    ip: String,
}

/// Extract `details.description` from a rejection body
pub fn rejection_reason(body: &[u8]) -> String {
    serde_json::from_slice::<Rejection>(body)
        .ok()
        .and_then(|r| r.details)
        .and_then(|d| d.description)
        .unwrap_or_else(|| FALLBACK_REASON.to_string())
}

/// Verifier posting items to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    endpoint: String,
    ip_lookup_url: Option<String>,
    profile: RequestProfile,
    headers: HeaderMap,
    egress: EgressPool,
}

impl HttpVerifier {
    /// Build the verifier and its client pool. Fails on invalid headers or
    /// proxy URLs, never on unreachable proxies.
    pub fn new(config: &CheckerConfig, proxies: &[Proxy]) -> Result<Self> {
        let egress = EgressPool::build(proxies, config.timeout)?;
        debug!(routes = egress.routes(), "Egress pool ready");

        Ok(Self {
            endpoint: config.endpoint.clone(),
            ip_lookup_url: config.ip_lookup_url.clone(),
            profile: config.profile.clone(),
            headers: config.profile.headers()?,
            egress,
        })
    }

    /// Public IP seen through `proxy`: `None` when the lookup is disabled,
    /// "Unknown" when it fails
    pub async fn public_ip(&self, proxy: Option<&Proxy>) -> Option<String> {
        let url = self.ip_lookup_url.as_deref()?;
        let lookup = async {
            let response = self.egress.client_for(proxy)?.get(url).send().await?;
            Ok::<_, CheckError>(response.json::<IpLookup>().await?)
        };

        match lookup.await {
            Ok(found) => Some(found.ip),
            Err(e) => {
                error!(error = %e, "Error fetching IP");
                Some("Unknown".to_string())
            }
        }
    }

    async fn interpret(response: Response) -> Attempt {
        match response.status() {
            StatusCode::OK => Attempt::Live,
            StatusCode::BAD_REQUEST => match response.bytes().await {
                Ok(body) => Attempt::Dead {
                    reason: rejection_reason(&body),
                },
                Err(e) => Attempt::Fault(e.into()),
            },
            status => Attempt::Indeterminate { status },
        }
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn before_attempt(&self, proxy: Option<&Proxy>) {
        if let Some(ip) = self.public_ip(proxy).await {
            info!(ip = %ip, "Using IP");
        }
    }

    async fn attempt(&self, item: &str, proxy: Option<&Proxy>) -> Attempt {
        let client = match self.egress.client_for(proxy) {
            Ok(client) => client,
            Err(e) => return Attempt::Fault(e),
        };

        let sent = client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(&self.profile.body(item))
            .send()
            .await;

        match sent {
            Ok(response) => Self::interpret(response).await,
            Err(e) => Attempt::Fault(e.into()),
        }
    }
}

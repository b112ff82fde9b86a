//! Pooled HTTP clients, one per egress route

use crate::error::{CheckError, Result};
use crate::proxy::models::Proxy;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Connection pools for the direct route and for every distinct proxy.
///
/// Built once per run and shared by reference across workers; a
/// `reqwest::Client` is internally reference counted and reentrant.
#[derive(Debug, Clone)]
pub struct EgressPool {
    direct: Client,
    proxied: HashMap<Proxy, Client>,
}

impl EgressPool {
    /// Build clients for `proxies` with the shared per-request timeout
    pub fn build(proxies: &[Proxy], timeout: Duration) -> Result<Self> {
        let direct = Self::create_client(None, timeout)?;

        let mut proxied = HashMap::new();
        for proxy in proxies {
            if !proxied.contains_key(proxy) {
                let client = Self::create_client(Some(proxy), timeout)?;
                proxied.insert(proxy.clone(), client);
            }
        }

        Ok(Self { direct, proxied })
    }

    /// Client for a route. A proxy the pool was not built with is an error,
    /// never a silent switch to the direct route.
    pub fn client_for(&self, proxy: Option<&Proxy>) -> Result<&Client> {
        match proxy {
            None => Ok(&self.direct),
            Some(proxy) => self.proxied.get(proxy).ok_or_else(|| {
                warn!(proxy = %proxy, "No client for proxy route");
                CheckError::InvalidProxy(format!("{}: not in egress pool", proxy))
            }),
        }
    }

    /// Number of distinct proxied routes
    pub fn routes(&self) -> usize {
        self.proxied.len()
    }

    fn create_client(proxy: Option<&Proxy>, timeout: Duration) -> Result<Client> {
        let mut builder = Client::builder().timeout(timeout);

        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy.to_reqwest()?);
        } else {
            builder = builder.no_proxy();
        }

        Ok(builder.build()?)
    }
}

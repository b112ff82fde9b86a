//! Proxy list parsing

use crate::error::Result;
use crate::proxy::models::{Proxy, ProxyType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// scheme://[user:pass@]host:port
static URL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?|socks5)://(?:([^:@]+):([^@]+)@)?([^:@/]+):(\d+)/?$")
        .expect("Invalid proxy URL regex")
});

/// user:pass@host:port
static AUTH_AT_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^:@]+):([^@]+)@([^:@]+):(\d+)$").expect("Invalid proxy auth regex")
});

/// Proxy parser for proxy list files
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a single proxy line
    ///
    /// Supports formats:
    /// - HOST:PORT
    /// - USER:PASS@HOST:PORT
    /// - HOST:PORT:USER:PASS
    /// - scheme://[USER:PASS@]HOST:PORT
    ///
    /// Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str, default_type: ProxyType) -> Option<Proxy> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        Self::parse_url_format(line)
            .or_else(|| Self::parse_auth_at_format(line, default_type))
            .or_else(|| Self::parse_colon_format(line, default_type))
    }

    fn parse_url_format(line: &str) -> Option<Proxy> {
        let caps = URL_FORMAT.captures(line)?;
        let proxy_type = caps[1].parse().ok()?;
        let host = caps[4].to_string();
        let port = parse_port(&caps[5])?;

        match (caps.get(2), caps.get(3)) {
            (Some(user), Some(pass)) => Some(Proxy::with_auth(
                host,
                port,
                proxy_type,
                user.as_str().to_string(),
                pass.as_str().to_string(),
            )),
            _ => Some(Proxy::new(host, port, proxy_type)),
        }
    }

    fn parse_auth_at_format(line: &str, default_type: ProxyType) -> Option<Proxy> {
        let caps = AUTH_AT_FORMAT.captures(line)?;
        let port = parse_port(&caps[4])?;

        Some(Proxy::with_auth(
            caps[3].to_string(),
            port,
            default_type,
            caps[1].to_string(),
            caps[2].to_string(),
        ))
    }

    fn parse_colon_format(line: &str, default_type: ProxyType) -> Option<Proxy> {
        match line.split(':').collect::<Vec<_>>().as_slice() {
            [host, port] if !host.is_empty() => {
                Some(Proxy::new(host.to_string(), parse_port(port)?, default_type))
            }
            [host, port, user, pass] if !host.is_empty() => Some(Proxy::with_auth(
                host.to_string(),
                parse_port(port)?,
                default_type,
                user.to_string(),
                pass.to_string(),
            )),
            _ => None,
        }
    }

    /// Parse proxies from multi-line content, skipping lines that do not parse
    /// or that no HTTP client could be routed through
    pub fn parse_string(content: &str, default_type: ProxyType) -> Vec<Proxy> {
        content
            .lines()
            .filter_map(|line| {
                let trimmed = line.trim();
                let proxy = match Self::parse_line(line, default_type) {
                    Some(proxy) => proxy,
                    None => {
                        if !trimmed.is_empty() && !trimmed.starts_with('#') {
                            warn!(line = trimmed, "Skipping unparseable proxy line");
                        }
                        return None;
                    }
                };

                if let Err(e) = proxy.to_reqwest() {
                    warn!(proxy = %proxy, error = %e, "Skipping unusable proxy");
                    return None;
                }
                Some(proxy)
            })
            .collect()
    }

    /// Parse proxies from a file
    pub fn parse_file<P: AsRef<Path>>(path: P, default_type: ProxyType) -> Result<Vec<Proxy>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse_string(&content, default_type))
    }

    /// Load the proxy list, degrading to direct connections when the file is
    /// missing or unreadable.
    pub fn load_or_empty<P: AsRef<Path>>(path: P, default_type: ProxyType) -> Vec<Proxy> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Proxy file not found, continuing without proxies");
            return Vec::new();
        }

        match Self::parse_file(path, default_type) {
            Ok(proxies) => {
                info!(path = %path.display(), total = proxies.len(), "Proxy list loaded");
                proxies
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Error reading proxy file, continuing without proxies");
                Vec::new()
            }
        }
    }
}

fn parse_port(s: &str) -> Option<u16> {
    match s.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

//! URL validation for SSRF protection.
//!
//! Validates URLs before any outbound fetch to prevent:
//! - Access to internal services (localhost, 127.0.0.1)
//! - Access to private IP ranges (10.x, 172.16.x, 192.168.x)
//! - Access to cloud metadata services (169.254.x)
//! - Non-HTTP(S) schemes (file://, ftp://)
//!
//! Screening is pattern-based (scheme, hostname literals, CIDR checks on
//! IP literals) and does not resolve DNS. A hostname that resolves to a
//! private address post-check slips through; this is a best-effort
//! defense, not a complete one.

use std::collections::HashSet;
use std::net::IpAddr;

use url::Url;

use crate::error::{SecurityError, SecurityResult};

/// URL guard applied before every outbound request.
#[derive(Debug, Clone)]
pub struct UrlGuard {
    /// Allowed URL schemes
    allowed_schemes: HashSet<String>,

    /// Blocked hostnames
    blocked_hosts: HashSet<String>,

    /// Blocked hostname suffixes (e.g. `.local`)
    blocked_suffixes: Vec<String>,

    /// Blocked CIDR ranges
    blocked_cidrs: Vec<ipnet::IpNet>,

    /// Additional allowed hosts (bypass normal validation)
    allowed_hosts: HashSet<String>,
}

impl Default for UrlGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlGuard {
    /// Create a new guard with default security rules.
    pub fn new() -> Self {
        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            blocked_hosts: [
                "localhost",
                "local",
                "internal",
                "127.0.0.1",
                "::1",
                "[::1]",
                "0.0.0.0",
                "metadata.google.internal",
                "instance-data",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocked_suffixes: vec![".local".to_string()],
            blocked_cidrs: vec![
                "10.0.0.0/8".parse().unwrap(),
                "172.16.0.0/12".parse().unwrap(),
                "192.168.0.0/16".parse().unwrap(),
                "169.254.0.0/16".parse().unwrap(), // Link-local / cloud metadata
                "127.0.0.0/8".parse().unwrap(),    // Loopback
                "::1/128".parse().unwrap(),        // IPv6 loopback
                "fc00::/7".parse().unwrap(),       // IPv6 unique-local
                "fe80::/10".parse().unwrap(),      // IPv6 link-local
            ],
            allowed_hosts: HashSet::new(),
        }
    }

    /// Add an allowed host (bypasses validation).
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into());
        self
    }

    /// Block an additional host.
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.insert(host.into());
        self
    }

    /// Validate a raw URL, returning the parsed form on success.
    pub fn validate(&self, raw: &str) -> SecurityResult<Url> {
        let parsed = Url::parse(raw)?;

        // Check scheme
        if !self.allowed_schemes.contains(parsed.scheme()) {
            return Err(SecurityError::DisallowedScheme(parsed.scheme().to_string()));
        }

        // Get host
        let host = parsed.host_str().ok_or(SecurityError::NoHost)?;
        let host_lower = host.to_ascii_lowercase();

        // Check allowed hosts first (bypass other checks)
        if self.allowed_hosts.contains(&host_lower) {
            return Ok(parsed);
        }

        // Check blocked hostnames and suffixes
        if self.blocked_hosts.contains(&host_lower) {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }
        if self
            .blocked_suffixes
            .iter()
            .any(|suffix| host_lower.ends_with(suffix))
        {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }

        // Check blocked CIDRs for IP literals (bracketed IPv6 included)
        let bare = host_lower.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            for cidr in &self.blocked_cidrs {
                if cidr.contains(&ip) {
                    return Err(SecurityError::BlockedCidr(ip.to_string()));
                }
            }
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_localhost() {
        let guard = UrlGuard::new();
        assert!(guard.validate("http://localhost/").is_err());
        assert!(guard.validate("http://127.0.0.1/").is_err());
        assert!(guard.validate("http://[::1]/").is_err());
    }

    #[test]
    fn test_blocks_private_ips() {
        let guard = UrlGuard::new();
        assert!(guard.validate("http://10.1.2.3/").is_err());
        assert!(guard.validate("http://172.16.0.1/").is_err());
        assert!(guard.validate("http://192.168.0.5/").is_err());
    }

    #[test]
    fn test_blocks_metadata_and_link_local() {
        let guard = UrlGuard::new();
        assert!(guard.validate("http://169.254.169.254/").is_err());
        assert!(guard.validate("http://metadata.google.internal/").is_err());
        assert!(guard.validate("http://[fe80::1]/").is_err());
    }

    #[test]
    fn test_blocks_internal_hostnames() {
        let guard = UrlGuard::new();
        assert!(guard.validate("http://internal/").is_err());
        assert!(guard.validate("http://printer.local/").is_err());
    }

    #[test]
    fn test_blocks_non_http() {
        let guard = UrlGuard::new();
        assert!(guard.validate("file:///etc/passwd").is_err());
        assert!(guard.validate("ftp://example.com/").is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        let guard = UrlGuard::new();
        assert!(guard.validate("not a url").is_err());
        assert!(guard.validate("").is_err());
    }

    #[test]
    fn test_allows_public_urls() {
        let guard = UrlGuard::new();
        assert!(guard.validate("https://example.com/").is_ok());
        assert!(guard.validate("http://news.ycombinator.com/item?id=1").is_ok());
    }

    #[test]
    fn test_allowed_hosts_bypass() {
        let guard = UrlGuard::new().allow_host("localhost");
        assert!(guard.validate("http://localhost:8080/fixture").is_ok());
    }
}

//! Network endpoint value object.

use std::fmt;

/// A host with an optional port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: Option<u16>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
        }
    }

    pub fn with_port(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port: Some(port),
        }
    }

    /// Loopback endpoint for a local tunnel port
    pub fn loopback(port: u16) -> Self {
        Self::with_port("127.0.0.1", port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

/// A parsed `scheme://host[:port][/path]` server URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUrl {
    pub scheme: String,
    pub endpoint: Endpoint,
    pub path: String,
}

impl ServerUrl {
    /// Parse a kubeconfig `server:` value. Returns `None` for anything that is
    /// not `scheme://authority[/path]`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (scheme, rest) = raw.trim().split_once("://")?;
        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return None;
        }

        let endpoint = if let Some(bracketed) = authority.strip_prefix('[') {
            // IPv6 literal: [::1]:6443
            let (host, tail) = bracketed.split_once(']')?;
            let port = match tail.strip_prefix(':') {
                Some(p) => Some(p.parse().ok()?),
                None => None,
            };
            Endpoint {
                host: format!("[{}]", host),
                port,
            }
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => Endpoint::with_port(host, port.parse().ok()?),
                None => Endpoint::new(authority),
            }
        };

        Some(Self {
            scheme: scheme.to_string(),
            endpoint,
            path: path.to_string(),
        })
    }

    /// Replace the host and, if given, the port; scheme and path are kept.
    pub fn retarget(&self, target: &Endpoint) -> Self {
        Self {
            scheme: self.scheme.clone(),
            endpoint: Endpoint {
                host: target.host.clone(),
                port: target.port.or(self.endpoint.port),
            },
            path: self.path.clone(),
        }
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.endpoint, self.path)
    }
}

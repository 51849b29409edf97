//! Bridge endpoint addresses.
//!
//! Endpoint format: `ws://host[:port][/path][?query]`, or the same with
//! `wss://`. The bridge only speaks WebSocket, so any other scheme is
//! rejected before a connection attempt is made. A port equal to the
//! scheme default is not kept.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::{Host, ParseError, Url};

/// A validated WebSocket address of a print bridge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    secure: bool,
    host: String,
    port: Option<u16>,
    path: String,
}

impl Endpoint {
    /// Plain `ws://` endpoint on the given host and port.
    pub fn local(port: u16) -> Self {
        Self {
            secure: false,
            host: "127.0.0.1".to_string(),
            port: Some(port),
            path: "/".to_string(),
        }
    }

    /// Replace the path component, dropping any query.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if the address carried one.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "wss" } else { "ws" };
        write!(f, "{scheme}://{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str(&self.path)
    }
}

impl FromStr for Endpoint {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigurationError::Empty);
        }
        // `Url::parse` silently strips tabs and newlines, so check first.
        if s.chars().any(char::is_whitespace) {
            return Err(ConfigurationError::Whitespace(s.to_string()));
        }

        let url = Url::parse(s).map_err(|e| match e {
            ParseError::RelativeUrlWithoutBase => ConfigurationError::MissingScheme(s.to_string()),
            ParseError::EmptyHost => ConfigurationError::MissingHost(s.to_string()),
            ParseError::InvalidPort => ConfigurationError::InvalidPort(s.to_string()),
            source => ConfigurationError::Malformed {
                endpoint: s.to_string(),
                source,
            },
        })?;

        let secure = match url.scheme() {
            "ws" => false,
            "wss" => true,
            other => return Err(ConfigurationError::UnsupportedScheme(other.to_string())),
        };
        if url.fragment().is_some() {
            return Err(ConfigurationError::Fragment(s.to_string()));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) if !is_valid_hostname(domain) => {
                return Err(ConfigurationError::InvalidHost(domain.to_string()));
            }
            Some(_) => url.host_str().unwrap_or_default().to_string(),
            None => return Err(ConfigurationError::MissingHost(s.to_string())),
        };
        if host.is_empty() {
            return Err(ConfigurationError::MissingHost(s.to_string()));
        }

        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        Ok(Self {
            secure,
            host,
            port: url.port(),
            path,
        })
    }
}

/// DNS names only: letters, digits, `-`, `_` and dots.
fn is_valid_hostname(domain: &str) -> bool {
    !domain.is_empty()
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl TryFrom<String> for Endpoint {
    type Error = ConfigurationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

/// A bridge address that cannot be connected to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("bridge endpoint is empty")]
    Empty,
    #[error("bridge endpoint contains whitespace: {0:?}")]
    Whitespace(String),
    #[error("bridge endpoint must start with ws:// or wss://, got: {0}")]
    MissingScheme(String),
    #[error("unsupported bridge scheme {0:?}, expected ws or wss")]
    UnsupportedScheme(String),
    #[error("bridge endpoint has no host: {0}")]
    MissingHost(String),
    #[error("invalid bridge port in {0}")]
    InvalidPort(String),
    #[error("invalid bridge host name {0:?}")]
    InvalidHost(String),
    #[error("bridge endpoint must not carry a fragment: {0}")]
    Fragment(String),
    #[error("malformed bridge endpoint {endpoint}: {source}")]
    Malformed {
        endpoint: String,
        #[source]
        source: ParseError,
    },
}

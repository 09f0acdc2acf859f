use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

/// Everything that can stop a single measurement from completing.
///
/// Display strings describe the failing step only; the underlying cause is
/// reachable through `source()` (see [`crate::http_probe::report`]).
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("URL '{0}' has no host")]
    MissingHost(String),
    #[error("failed to resolve '{host}'")]
    Resolve {
        host: String,
        #[source]
        source: ResolveError,
    },
    #[error("'{0}' resolved to no addresses")]
    NoAddress(String),
    #[error("failed to connect to {addr}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("TLS handshake with '{host}' failed")]
    Tls {
        host: String,
        #[source]
        source: native_tls::Error,
    },
    #[error("failed to build request")]
    Request(#[source] hyper::http::Error),
    #[error("HTTP exchange failed")]
    Http(#[source] hyper::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Startup errors. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),
    #[error("at least one concurrent worker is required")]
    NoWorkers,
    #[error("invalid DNS host '{host}'")]
    InvalidDnsHost {
        host: String,
        #[source]
        source: AddrParseError,
    },
    #[error("failed to read system resolver configuration: {0}")]
    SystemResolver(String),
    #[error("failed to build TLS connector")]
    Tls(#[source] native_tls::Error),
}

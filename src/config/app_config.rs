use std::net::IpAddr;
use std::time::Duration;

use tokio_native_tls::TlsConnector as TokioTlsConnector;
use tracing::level_filters::LevelFilter;
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts},
    system_conf::read_system_conf,
};

use super::cli::Cli;
use crate::error::ConfigError;
use crate::logging;
use crate::output::OutputFormat;

pub struct AppConfig {
    pub url: String,
    pub output: OutputFormat,
    pub log_level: LevelFilter,
    pub concurrent: usize,
    pub total: usize,
    pub timeout: Duration,
    pub dns_hosts: Vec<String>,
}

/// What the process should do after reading its flags.
pub enum Startup {
    Run(AppConfig),
    /// No URL was given: print usage and exit successfully.
    Usage,
}

/// Validate the parsed flags into an [`AppConfig`].
/// The log level is checked first, so an invalid level is fatal even when no URL is given.
pub fn load_config(cli: Cli) -> Result<Startup, ConfigError> {
    let log_level = logging::parse_level(&cli.log)?;

    let Some(url) = cli.url.filter(|url| !url.is_empty()) else {
        return Ok(Startup::Usage);
    };
    if cli.concurrent == 0 {
        return Err(ConfigError::NoWorkers);
    }

    let dns_hosts = cli
        .dns_hosts
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    Ok(Startup::Run(AppConfig {
        url,
        output: OutputFormat::from(cli.out.as_str()),
        log_level,
        concurrent: cli.concurrent,
        total: cli.total,
        timeout: cli.timeout,
        dns_hosts,
    }))
}

/// Setup a TLS connector with the platform's default certificate validation
pub fn setup_tls_connector() -> Result<TokioTlsConnector, ConfigError> {
    let connector = native_tls::TlsConnector::builder()
        .build()
        .map_err(ConfigError::Tls)?;
    Ok(TokioTlsConnector::from(connector))
}

/// Setup a DNS resolver.
///
/// With `dns_hosts` given, those servers are queried over TCP with 2 attempts
/// and a 2 second timeout; otherwise the system configuration is used.
/// The record cache is disabled either way so every probe performs a real lookup.
/// # Arguments
///     * `dns_hosts` - DNS server IPs (e.g., "1.1.1.1"), may be empty
pub fn setup_resolver(dns_hosts: &[String]) -> Result<TokioAsyncResolver, ConfigError> {
    let (resolver_config, mut opts) = if dns_hosts.is_empty() {
        read_system_conf().map_err(|err| ConfigError::SystemResolver(err.to_string()))?
    } else {
        let mut name_servers = NameServerConfigGroup::new();
        for host in dns_hosts {
            let ip: IpAddr = host
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidDnsHost {
                    host: host.clone(),
                    source,
                })?;
            name_servers.push(NameServerConfig {
                socket_addr: (ip, 53).into(),
                protocol: Protocol::Tcp,
                tls_dns_name: None,
                trust_negative_responses: false,
                bind_addr: None,
            });
        }

        let mut opts = ResolverOpts::default();
        opts.attempts = 2;
        opts.timeout = Duration::from_secs(2);
        (ResolverConfig::from_parts(None, vec![], name_servers), opts)
    };
    opts.cache_size = 0;

    Ok(TokioAsyncResolver::tokio(resolver_config, opts))
}

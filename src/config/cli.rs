use std::time::Duration;

use clap::Parser;

/// Command line flags. Validation happens in [`super::app_config::load_config`].
#[derive(Debug, Clone, Parser)]
#[command(
    version,
    about = "Measure per-phase HTTP latency (DNS, connect, TLS, TTFB, total) of a URL."
)]
pub struct Cli {
    /// URL to test
    #[arg(long, env = "OXYTIME_URL")]
    pub url: Option<String>,

    /// Output format (jsonl, csv)
    #[arg(long = "out", default_value = "jsonl")]
    pub out: String,

    /// Log level (trace, debug, info, warn, error, fatal)
    #[arg(long = "log", default_value = "info")]
    pub log: String,

    /// Concurrent tests to run
    #[arg(long, default_value_t = 10)]
    pub concurrent: usize,

    /// Total tests to run
    #[arg(long, default_value_t = 10)]
    pub total: usize,

    /// Deadline for a single test (e.g. 500ms, 30s)
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Comma separated DNS servers to query; the system configuration is used when empty
    #[arg(long = "dns-hosts", env = "DNS_HOSTS", value_delimiter = ',')]
    pub dns_hosts: Vec<String>,
}

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tracing::debug;

use super::result::TimingResult;

/// Hooks invoked by the prober at each point of the request lifecycle.
///
/// Every hook receives the instant the event happened. Hooks that never fire
/// leave their phase unmeasured: plain HTTP has no TLS handshake and IP
/// literal hosts skip DNS.
pub trait ClientTrace {
    fn dns_start(&mut self, _host: &str, _at: Instant) {}
    fn dns_done(&mut self, _at: Instant) {}
    fn connect_start(&mut self, _addr: SocketAddr, _at: Instant) {}
    fn connect_done(&mut self, _addr: SocketAddr, _at: Instant) {}
    fn tls_handshake_start(&mut self, _at: Instant) {}
    fn tls_handshake_done(&mut self, _at: Instant) {}
    fn got_first_response_byte(&mut self, _at: Instant) {}
}

/// Records hook instants relative to the start of an attempt.
#[derive(Debug, Clone)]
pub struct PhaseTimings {
    start: Instant,
    dns: (Option<Instant>, Option<Instant>),
    connect: (Option<Instant>, Option<Instant>),
    tls: (Option<Instant>, Option<Instant>),
    first_byte: Option<Instant>,
}

impl PhaseTimings {
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            dns: (None, None),
            connect: (None, None),
            tls: (None, None),
            first_byte: None,
        }
    }

    pub fn into_result(self, url: &str, total: Duration) -> TimingResult {
        TimingResult {
            url: url.to_string(),
            dns: span(self.dns),
            tls: span(self.tls),
            connect: span(self.connect),
            ttfb: self
                .first_byte
                .map(|at| at.saturating_duration_since(self.start))
                .unwrap_or_default(),
            total,
        }
    }
}

fn span((start, end): (Option<Instant>, Option<Instant>)) -> Duration {
    match (start, end) {
        (Some(start), Some(end)) => end.saturating_duration_since(start),
        _ => Duration::ZERO,
    }
}

impl ClientTrace for PhaseTimings {
    fn dns_start(&mut self, _host: &str, at: Instant) {
        self.dns = (Some(at), None);
    }

    fn dns_done(&mut self, at: Instant) {
        self.dns.1 = Some(at);
        debug!(dns = ?span(self.dns), "DNS done");
    }

    // A new connect attempt replaces the previous one.
    fn connect_start(&mut self, _addr: SocketAddr, at: Instant) {
        self.connect = (Some(at), None);
    }

    fn connect_done(&mut self, addr: SocketAddr, at: Instant) {
        self.connect.1 = Some(at);
        debug!(%addr, connect = ?span(self.connect), "connect done");
    }

    fn tls_handshake_start(&mut self, at: Instant) {
        self.tls = (Some(at), None);
    }

    fn tls_handshake_done(&mut self, at: Instant) {
        self.tls.1 = Some(at);
        debug!(tls = ?span(self.tls), "TLS handshake done");
    }

    fn got_first_response_byte(&mut self, at: Instant) {
        self.first_byte = Some(at);
        debug!(ttfb = ?at.saturating_duration_since(self.start), "first response byte");
    }
}

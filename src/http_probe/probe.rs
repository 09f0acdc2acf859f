use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::Empty;
use hyper::Request;
use hyper::header::{HOST, USER_AGENT};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio_native_tls::TlsConnector as TokioTlsConnector;
use tracing::debug;
use tracing::instrument::WithSubscriber;
use trust_dns_resolver::TokioAsyncResolver;
use url::{Host, Position, Url};

use super::report;
use super::result::TimingResult;
use super::stream::{FirstByte, ProbeStream};
use super::trace::{ClientTrace, PhaseTimings};
use crate::error::ProbeError;

const USER_AGENT_VALUE: &str = concat!("oxytime/", env!("CARGO_PKG_VERSION"));

/// A URL broken down into what the prober needs to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: Host<String>,
    port: u16,
    tls: bool,
    /// `Host` header value.
    authority: String,
    /// Origin-form request target, path plus query.
    path: String,
}

impl Target {
    pub fn parse(url: &str) -> Result<Self, ProbeError> {
        let parsed = Url::parse(url).map_err(|source| ProbeError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let tls = match parsed.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(ProbeError::UnsupportedScheme(other.to_string())),
        };
        let host = parsed
            .host()
            .map(|host| host.to_owned())
            .ok_or_else(|| ProbeError::MissingHost(url.to_string()))?;
        let port = parsed
            .port_or_known_default()
            .unwrap_or(if tls { 443 } else { 80 });
        // `port()` is None when the URL uses the scheme default
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let path = parsed[Position::BeforePath..Position::AfterQuery].to_string();

        Ok(Self {
            host,
            port,
            tls,
            authority,
            path,
        })
    }

    /// Name presented for the TLS handshake.
    fn server_name(&self) -> String {
        match &self.host {
            Host::Domain(name) => name.clone(),
            Host::Ipv4(ip) => ip.to_string(),
            Host::Ipv6(ip) => ip.to_string(),
        }
    }
}

/// Performs one instrumented GET per call.
///
/// Nothing is reused between calls except the resolver (built without a
/// record cache) and the TLS connector configuration: every measurement
/// resolves, connects and handshakes from scratch so each phase is observed.
pub struct Prober {
    resolver: TokioAsyncResolver,
    connector: TokioTlsConnector,
    timeout: Duration,
}

impl Prober {
    pub fn new(
        resolver: TokioAsyncResolver,
        connector: TokioTlsConnector,
        timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            connector,
            timeout,
        }
    }

    /// Measures a single round trip to `url`.
    ///
    /// Total time runs from just before resolution starts until the response
    /// headers are in. The body is not read.
    pub async fn measure(&self, url: &str) -> Result<TimingResult, ProbeError> {
        let target = Target::parse(url)?;
        debug!(action = "measure", url, "starting");

        let start = Instant::now();
        let mut timings = PhaseTimings::new(start);
        match tokio::time::timeout(self.timeout, self.round_trip(&target, &mut timings)).await {
            Ok(result) => result?,
            Err(_) => return Err(ProbeError::Timeout(self.timeout)),
        }
        let total = start.elapsed();
        debug!(action = "measure", url, ?total, "round trip done");

        Ok(timings.into_result(url, total))
    }

    /// Runs the request lifecycle against `target`, reporting each phase to `trace`.
    pub async fn round_trip(
        &self,
        target: &Target,
        trace: &mut (dyn ClientTrace + Send),
    ) -> Result<(), ProbeError> {
        let addrs = self.resolve(target, trace).await?;
        let tcp = connect(target, &addrs, trace).await?;

        let stream = if target.tls {
            let server_name = target.server_name();
            trace.tls_handshake_start(Instant::now());
            let handshake = self.connector.connect(&server_name, tcp).await;
            trace.tls_handshake_done(Instant::now());
            let tls = handshake.map_err(|source| ProbeError::Tls {
                host: server_name,
                source,
            })?;
            ProbeStream::Tls(tls)
        } else {
            ProbeStream::Plain(tcp)
        };

        let (stream, first_byte) = FirstByte::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(ProbeError::Http)?;
        tokio::spawn(
            async move {
                if let Err(err) = conn.await {
                    debug!(error = %report(&err), "connection closed with error");
                }
            }
            .with_current_subscriber(),
        );

        let request = Request::get(target.path.as_str())
            .header(HOST, target.authority.as_str())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(Empty::<Bytes>::new())
            .map_err(ProbeError::Request)?;
        let response = sender.send_request(request).await.map_err(ProbeError::Http)?;
        if let Some(at) = first_byte.get() {
            trace.got_first_response_byte(*at);
        }
        debug!(
            status = %response.status(),
            version = ?response.version(),
            "response headers received"
        );

        Ok(())
    }

    async fn resolve(
        &self,
        target: &Target,
        trace: &mut (dyn ClientTrace + Send),
    ) -> Result<Vec<IpAddr>, ProbeError> {
        let name = match &target.host {
            Host::Ipv4(ip) => return Ok(vec![IpAddr::V4(*ip)]),
            Host::Ipv6(ip) => return Ok(vec![IpAddr::V6(*ip)]),
            Host::Domain(name) => name,
        };

        trace.dns_start(name, Instant::now());
        let lookup = self.resolver.lookup_ip(name.as_str()).await;
        trace.dns_done(Instant::now());

        let addrs: Vec<IpAddr> = lookup
            .map_err(|source| ProbeError::Resolve {
                host: name.clone(),
                source,
            })?
            .iter()
            .collect();
        if addrs.is_empty() {
            return Err(ProbeError::NoAddress(name.clone()));
        }
        Ok(addrs)
    }
}

/// Tries each address in turn; the first successful connection wins.
async fn connect(
    target: &Target,
    addrs: &[IpAddr],
    trace: &mut (dyn ClientTrace + Send),
) -> Result<TcpStream, ProbeError> {
    let mut last_err = None;
    for ip in addrs {
        let addr = SocketAddr::new(*ip, target.port);
        trace.connect_start(addr, Instant::now());
        let attempt = TcpStream::connect(addr).await;
        trace.connect_done(addr, Instant::now());
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(source) => {
                debug!(%addr, error = %source, "connect attempt failed");
                last_err = Some(ProbeError::Connect { addr, source });
            }
        }
    }
    Err(last_err.unwrap_or_else(|| ProbeError::NoAddress(target.server_name())))
}

//! Port Discovery Probe
//!
//! Tries a plain TCP connect against every (host, port) pair of a small
//! matrix and reports which ones accepted. This is a best-effort,
//! non-authoritative hint: firewalled or slow hosts show up as closed, and
//! an open port says nothing about what is listening on it. It is not a
//! substitute for real service discovery.
//!
//! Probes run concurrently; the report keeps host-major, port-minor order.
//! Credentials are never inferred: suggested URLs carry placeholders only.

use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::net::TcpStream;
use tracing::debug;

/// Hosts a local database commonly answers on (plain, loopback, Docker, compose service names)
pub const DEFAULT_HOSTS: &[&str] = &["localhost", "127.0.0.1", "host.docker.internal", "postgres", "db"];

/// Default `PostgreSQL` port, common side-by-side ports and PgBouncer
pub const DEFAULT_PORTS: &[u16] = &[5432, 5433, 5434, 6543];

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(250);

pub const DISCOVERY_NOTE: &str = "Best-effort TCP probe: closed ports may be firewalled or slow, open ports \
     are not verified to be PostgreSQL. Suggested URLs use placeholder credentials.";

/// A (host, port) pair that accepted a TCP connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Example connection URL with placeholder credentials
    #[must_use]
    pub fn suggested_url(&self) -> String {
        format!("postgres://<user>:<password>@{}:{}/<database>", self.host, self.port)
    }
}

/// Result of a discovery run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiscoveryReport {
    pub open: Vec<Endpoint>,
    pub suggested_urls: Vec<String>,
}

/// The matrix and timeout a discovery run uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub hosts: Vec<String>,
    pub ports: Vec<u16>,
    pub timeout: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            hosts: DEFAULT_HOSTS.iter().map(|h| (*h).to_string()).collect(),
            ports: DEFAULT_PORTS.to_vec(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl DiscoverySettings {
    pub async fn run(&self) -> DiscoveryReport {
        discover(&self.hosts, &self.ports, self.timeout).await
    }
}

/// Whether `host:port` accepts a TCP connection within `timeout`
///
/// Resolution failures, refusals and timeouts all count as closed.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "probe refused");
            false
        }
        Err(_) => {
            debug!(host, port, "probe timed out");
            false
        }
    }
}

/// Probe every (host, port) pair; never fails
pub async fn discover<H: AsRef<str>>(hosts: &[H], ports: &[u16], timeout: Duration) -> DiscoveryReport {
    let pairs: Vec<(&str, u16)> = hosts
        .iter()
        .flat_map(|host| ports.iter().map(move |port| (host.as_ref(), *port)))
        .collect();

    let results = join_all(pairs.iter().map(|(host, port)| probe(host, *port, timeout))).await;

    let open: Vec<Endpoint> = pairs
        .into_iter()
        .zip(results)
        .filter(|(_, is_open)| *is_open)
        .map(|((host, port), _)| Endpoint { host: host.to_string(), port })
        .collect();
    let suggested_urls = open.iter().map(Endpoint::suggested_url).collect();

    DiscoveryReport { open, suggested_urls }
}

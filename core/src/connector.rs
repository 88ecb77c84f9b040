//! Session establishment against the column store.
//!
//! The policy is a fixed sequence of at most two dial attempts:
//!
//! 1. Probe the configured host with a short raw TCP connect. If the probe
//!    fails, retarget to [`FALLBACK_HOST`] before dialing.
//! 2. Dial the (possibly retargeted) host with the full client timeout.
//! 3. If that dial fails, dial [`FALLBACK_HOST`] once more, even if step 2
//!    already targeted it.
//!
//! There is no backoff and no further retry. [`Connected::route`] records
//! which of the attempts produced the session.

use crate::{Error, Result};
use std::time::Duration;
use tokio::net::TcpStream;

pub const DEFAULT_HOST: &str = "cassandra-server";
pub const DEFAULT_PORT: u16 = 9042;
pub const FALLBACK_HOST: &str = "localhost";
pub const DEFAULT_KEYSPACE: &str = "search_keyspace";

/// Where and how to reach the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub probe_timeout: Duration,
    pub connect_timeout: Duration,
    pub keyspace: String,
    pub replication_factor: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            probe_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(30),
            keyspace: DEFAULT_KEYSPACE.to_string(),
            replication_factor: 1,
        }
    }
}

/// Which attempt of the policy produced the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The configured host answered the probe and accepted the dial.
    Preferred,
    /// The probe failed and the fallback host accepted the first dial.
    ProbeFallback,
    /// The first dial failed and the fallback host accepted the second.
    LastResort,
}

#[derive(Debug)]
pub struct Connected<S> {
    pub session: S,
    pub host: String,
    pub route: Route,
}

/// Network operations the policy is built from.
#[allow(async_fn_in_trait)]
pub trait Dialer {
    type Session;

    /// Cheap reachability check; `false` on refusal or timeout.
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> bool;

    /// Full client connection.
    async fn dial(&self, host: &str, port: u16, timeout: Duration) -> std::result::Result<Self::Session, String>;
}

/// Run the connection policy described in the module documentation.
pub async fn connect<D: Dialer>(dialer: &D, config: &StoreConfig) -> Result<Connected<D::Session>> {
    tracing::info!(host = %config.host, port = config.port, "establishing store connection");

    let (host, route) = if dialer.probe(&config.host, config.port, config.probe_timeout).await {
        (config.host.as_str(), Route::Preferred)
    } else {
        tracing::error!(host = %config.host, port = config.port, "store host unreachable, trying {FALLBACK_HOST}");
        (FALLBACK_HOST, Route::ProbeFallback)
    };

    tracing::info!(host, "connecting to store");
    match dialer.dial(host, config.port, config.connect_timeout).await {
        Ok(session) => {
            tracing::info!(host, ?route, "connected to store");
            return Ok(Connected { session, host: host.to_string(), route });
        }
        Err(reason) => tracing::error!(host, %reason, "store connection failed"),
    }

    tracing::info!("trying {FALLBACK_HOST} as last resort");
    match dialer.dial(FALLBACK_HOST, config.port, config.connect_timeout).await {
        Ok(session) => {
            tracing::info!(host = FALLBACK_HOST, "connected to store via {FALLBACK_HOST}");
            Ok(Connected { session, host: FALLBACK_HOST.to_string(), route: Route::LastResort })
        }
        Err(reason) => {
            tracing::error!(host = FALLBACK_HOST, %reason, "store connection failed");
            Err(Error::Connection { attempts: 2 })
        }
    }
}

/// Raw TCP connect bounded by `timeout`.
pub async fn tcp_probe(host: &str, port: u16, timeout: Duration) -> bool {
    matches!(tokio::time::timeout(timeout, TcpStream::connect((host, port))).await, Ok(Ok(_)))
}

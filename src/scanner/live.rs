use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::debug;

use super::http::HttpProbe;
use super::icmp::{IcmpPinger, PingOutcome};
use super::port::{ConnectOutcome, tcp_connect};
use super::{Credentials, NetworkProbe, Service};
use crate::config::EngineConfig;
use crate::error::SetupError;

/// [`NetworkProbe`] that talks to the real network
#[derive(Debug, Clone)]
pub struct LiveProbe {
    pinger: IcmpPinger,
    http: HttpProbe,
    connect_timeout: Duration,
}

impl LiveProbe {
    pub fn new(config: &EngineConfig) -> Result<Self, SetupError> {
        Ok(Self {
            pinger: IcmpPinger::new()
                .with_timeout(config.ping_timeout())
                .with_attempts(config.ping_attempts),
            http: HttpProbe::new(config.http_timeout())?,
            connect_timeout: config.connect_timeout(),
        })
    }

    /// Without ICMP, a host that accepts or actively refuses a TCP connection on any
    /// management port is up.
    async fn tcp_reachable(&self, ip: Ipv4Addr) -> bool {
        let attempts = Service::ALL
            .iter()
            .map(|service| tcp_connect(ip, service.port(), self.connect_timeout));
        join_all(attempts)
            .await
            .into_iter()
            .any(|outcome| outcome != ConnectOutcome::Silent)
    }
}

#[async_trait]
impl NetworkProbe for LiveProbe {
    async fn is_reachable(&self, ip: Ipv4Addr) -> bool {
        match self.pinger.ping(ip).await {
            PingOutcome::Alive => true,
            PingOutcome::Silent => false,
            PingOutcome::Unavailable => {
                debug!(%ip, "ICMP unavailable, checking reachability over TCP");
                self.tcp_reachable(ip).await
            }
        }
    }

    async fn tcp_open(&self, ip: Ipv4Addr, port: u16) -> bool {
        tcp_connect(ip, port, self.connect_timeout).await == ConnectOutcome::Open
    }

    async fn http_status(&self, url: &str, credentials: Option<&Credentials>) -> Option<u16> {
        self.http.status(url, credentials).await
    }

    async fn http_body(&self, url: &str) -> Option<String> {
        self.http.body(url).await
    }
}

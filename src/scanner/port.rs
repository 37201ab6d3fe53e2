//! Capability probing. A device must pass the reachability check before any port is
//! touched; the four management ports are then checked concurrently.

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{NetworkProbe, PortProbeResult, Service};
use crate::error::HandshakeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Open,
    /// The host answered with a reset: it is up, the port is closed
    Refused,
    Silent,
}

/// TCP connect with a timeout
pub async fn tcp_connect(ip: Ipv4Addr, port: u16, limit: Duration) -> ConnectOutcome {
    let addr = SocketAddr::from((ip, port));

    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => ConnectOutcome::Open,
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => ConnectOutcome::Refused,
        Ok(Err(_)) => ConnectOutcome::Silent,
        Err(_) => ConnectOutcome::Silent,
    }
}

/// Probes devices through a [`NetworkProbe`]
#[derive(Clone)]
pub struct PortScanner {
    probe: Arc<dyn NetworkProbe>,
    max_concurrent: usize,
}

impl PortScanner {
    pub fn new(probe: Arc<dyn NetworkProbe>) -> Self {
        Self {
            probe,
            max_concurrent: 32,
        }
    }

    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Reachability check, then the four port checks. Unreachable devices fail fast
    /// without any port being probed.
    pub async fn probe_device(&self, ip: Ipv4Addr) -> Result<PortProbeResult, HandshakeError> {
        if !self.probe.is_reachable(ip).await {
            debug!(%ip, "Device did not answer reachability check");
            return Err(HandshakeError::DeviceUnreachable(ip));
        }
        Ok(self.probe_ports(ip).await)
    }

    /// The four port checks, run concurrently. Web ports count as open when any status
    /// code comes back.
    pub async fn probe_ports(&self, ip: Ipv4Addr) -> PortProbeResult {
        let http_url = format!("http://{}/", ip);
        let https_url = format!("https://{}/", ip);

        let (http_status, https_status, telnet, ssh) = tokio::join!(
            self.probe.http_status(&http_url, None),
            self.probe.http_status(&https_url, None),
            self.probe.tcp_open(ip, Service::Telnet.port()),
            self.probe.tcp_open(ip, Service::Ssh.port()),
        );

        let result = PortProbeResult {
            ip,
            http: http_status.is_some(),
            https: https_status.is_some(),
            ssh,
            telnet,
            http_status,
            https_status,
        };
        debug!(%ip, open = ?result.open_ports(), "Port probe complete");
        result
    }

    /// Probe many devices with bounded concurrency. Unreachable devices are left out.
    ///
    /// Dropping the returned future aborts every probe still in flight.
    pub async fn probe_many(&self, ips: Vec<Ipv4Addr>) -> HashMap<Ipv4Addr, PortProbeResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for ip in ips {
            let sem = semaphore.clone();
            let scanner = self.clone();
            tasks.spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return (ip, None);
                };
                (ip, scanner.probe_device(ip).await.ok())
            });
        }

        let mut results = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((ip, Some(result))) => {
                    results.insert(ip, result);
                }
                Ok((_, None)) => {}
                Err(e) => warn!(error = %e, "Probe task failed"),
            }
        }

        results
    }
}

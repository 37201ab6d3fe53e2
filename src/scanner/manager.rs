//! Scan orchestration. Runs full-network scans (one at a time, a newer scan supersedes
//! an older one) and single-device handshakes, and keeps the handshake history.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::live::LiveProbe;
use super::port::PortScanner;
use super::{Credentials, NetworkProbe, ScanResult};
use crate::access::{self, AccessMethod, AccessPolicy, ConnectionAttempt, HandshakeReport};
use crate::config::EngineConfig;
use crate::error::{HandshakeError, ScanError, SetupError};
use crate::history::{HandshakeHistory, HandshakeRecord};
use crate::network::identity::resolve;
use crate::network::{
    Device, DeviceClassifier, DeviceType, NeighborTable, NetworkPlatform, RouterPrefixTable,
    SystemPlatform,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Idle,
    Resolving,
    Enumerating,
    Classifying,
    Probing,
    Assembling,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakePhase {
    Probing,
    Recommending,
    AutoConnecting,
    Done,
}

/// Scan status for API responses
#[derive(Debug, Clone, Serialize)]
pub struct ScanStatus {
    pub running: bool,
    pub phase: ScanPhase,
    pub discovered_count: usize,
    pub last_scan_time: Option<i64>,
}

impl Default for ScanStatus {
    fn default() -> Self {
        Self {
            running: false,
            phase: ScanPhase::Idle,
            discovered_count: 0,
            last_scan_time: None,
        }
    }
}

struct ActiveScan {
    generation: u64,
    abort: AbortHandle,
}

/// Everything one scan task needs, detached from the manager
#[derive(Clone)]
struct ScanJob {
    config: EngineConfig,
    platform: Arc<dyn NetworkPlatform>,
    probe: Arc<dyn NetworkProbe>,
    classifier: DeviceClassifier,
    status: Arc<RwLock<ScanStatus>>,
    current_generation: Arc<AtomicU64>,
    generation: u64,
}

impl ScanJob {
    /// Status writes from a superseded scan are dropped
    async fn set_phase(&self, phase: ScanPhase, running: bool) {
        let mut status = self.status.write().await;
        if self.current_generation.load(Ordering::SeqCst) != self.generation {
            return;
        }
        debug!(generation = self.generation, ?phase, "Scan phase");
        status.phase = phase;
        status.running = running;
    }

    async fn finish(&self, phase: ScanPhase, discovered: usize) {
        let mut status = self.status.write().await;
        if self.current_generation.load(Ordering::SeqCst) != self.generation {
            return;
        }
        status.phase = phase;
        status.running = false;
        status.discovered_count = discovered;
        status.last_scan_time = Some(chrono::Utc::now().timestamp());
    }

    async fn run(self) -> Result<ScanResult, ScanError> {
        self.set_phase(ScanPhase::Resolving, true).await;
        let identity = match resolve(self.platform.as_ref(), self.config.route_probe_addr) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Scan failed");
                self.finish(ScanPhase::Failed, 0).await;
                return Err(e);
            }
        };
        info!(
            local_ip = %identity.local_ip,
            interface = %identity.interface_name,
            range = %identity.cidr_range,
            "Resolved network identity"
        );

        self.set_phase(ScanPhase::Enumerating, true).await;
        let table = NeighborTable::read(self.platform.as_ref());
        let neighbors: Vec<_> = table
            .candidates(identity.local_ip, identity.gateway_ip)
            .collect();

        self.set_phase(ScanPhase::Classifying, true).await;
        let mut devices = Vec::with_capacity(neighbors.len() + 2);
        devices.push(Device::local(
            identity.local_ip,
            identity.local_mac.as_deref(),
            self.platform.hostname(),
        ));
        if let Some(gateway) = identity.distinct_gateway() {
            devices.push(Device::gateway(gateway, table.mac_of(gateway)));
        }

        let mut hostnames = if self.config.resolve_hostnames {
            self.reverse_lookups(neighbors.iter().map(|n| n.ip).collect())
                .await
        } else {
            HashMap::new()
        };
        for neighbor in neighbors {
            let class = self.classifier.classify(&neighbor.mac);
            let hostname = hostnames
                .remove(&neighbor.ip)
                .unwrap_or_else(|| Device::neighbor_hostname(neighbor.ip));
            devices.push(Device::new(neighbor.ip, neighbor.mac, hostname, class));
        }

        if self.config.probe_devices {
            self.set_phase(ScanPhase::Probing, true).await;
            let targets = devices
                .iter()
                .filter(|d| !d.is_local)
                .map(|d| d.ip)
                .collect();
            let results = PortScanner::new(self.probe.clone())
                .with_concurrency(self.config.max_concurrent_probes)
                .probe_many(targets)
                .await;
            for device in devices.iter_mut() {
                if let Some(ports) = results.get(&device.ip) {
                    device.open_ports = ports.open_ports();
                }
            }
        }

        self.set_phase(ScanPhase::Assembling, true).await;
        let result = ScanResult::new(identity, devices);
        self.finish(ScanPhase::Done, result.summary.total_devices)
            .await;

        info!(
            devices = result.summary.total_devices,
            router_found = result.summary.router_found,
            "Scan complete"
        );
        Ok(result)
    }

    /// Reverse DNS for each address, each bounded by the hostname timeout
    async fn reverse_lookups(&self, ips: Vec<Ipv4Addr>) -> HashMap<Ipv4Addr, String> {
        let limit = self.config.hostname_timeout();
        stream::iter(ips)
            .map(|ip| {
                let platform = self.platform.clone();
                async move {
                    let lookup = tokio::task::spawn_blocking(move || platform.reverse_lookup(ip));
                    match tokio::time::timeout(limit, lookup).await {
                        Ok(Ok(Some(name))) => Some((ip, name)),
                        _ => None,
                    }
                }
            })
            .buffer_unordered(16)
            .filter_map(|found| async move { found })
            .collect()
            .await
    }
}

/// Manages scans, handshakes and auto-connect attempts
pub struct ScanManager {
    config: EngineConfig,
    platform: Arc<dyn NetworkPlatform>,
    probe: Arc<dyn NetworkProbe>,
    classifier: DeviceClassifier,
    policy: AccessPolicy,
    history: Arc<HandshakeHistory>,
    status: Arc<RwLock<ScanStatus>>,
    active_scan: Mutex<Option<ActiveScan>>,
    generation: Arc<AtomicU64>,
}

impl ScanManager {
    pub fn new(
        config: EngineConfig,
        platform: Arc<dyn NetworkPlatform>,
        probe: Arc<dyn NetworkProbe>,
    ) -> Self {
        let mut routers = RouterPrefixTable::default();
        for (prefix, brand) in &config.extra_router_prefixes {
            if !routers.add(prefix, brand) {
                warn!(%prefix, "Ignoring malformed router prefix");
            }
        }

        Self {
            classifier: DeviceClassifier::new(routers),
            policy: AccessPolicy::from_config(&config),
            config,
            platform,
            probe,
            history: Arc::new(HandshakeHistory::default()),
            status: Arc::new(RwLock::new(ScanStatus::default())),
            active_scan: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Manager wired to the running host and the real network
    pub fn live(config: EngineConfig) -> Result<Self, SetupError> {
        let probe = LiveProbe::new(&config)?;
        Ok(Self::new(
            config,
            Arc::new(SystemPlatform::new()),
            Arc::new(probe),
        ))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get current scan status
    pub async fn status(&self) -> ScanStatus {
        self.status.read().await.clone()
    }

    /// Shared handle to the handshake history
    pub fn history(&self) -> Arc<HandshakeHistory> {
        self.history.clone()
    }

    /// Newest first, at most 50
    pub async fn handshake_history(&self) -> Vec<HandshakeRecord> {
        self.history.snapshot().await
    }

    fn port_scanner(&self) -> PortScanner {
        PortScanner::new(self.probe.clone()).with_concurrency(self.config.max_concurrent_probes)
    }

    /// Run a full-network scan. A scan still in flight is aborted and its caller gets
    /// [`ScanError::Superseded`].
    pub async fn scan(&self) -> Result<ScanResult, ScanError> {
        // Generation order must match the order scans take over the slot
        let (generation, handle) = {
            let mut active = self.active_scan.lock().await;
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let job = ScanJob {
                config: self.config.clone(),
                platform: self.platform.clone(),
                probe: self.probe.clone(),
                classifier: self.classifier.clone(),
                status: self.status.clone(),
                current_generation: self.generation.clone(),
                generation,
            };

            let handle = tokio::spawn(job.run());
            let previous = active.replace(ActiveScan {
                generation,
                abort: handle.abort_handle(),
            });
            if let Some(previous) = previous {
                info!(
                    previous = previous.generation,
                    generation, "Superseding in-flight scan"
                );
                previous.abort.abort();
            }
            (generation, handle)
        };

        let outcome = handle.await;

        {
            let mut active = self.active_scan.lock().await;
            if active.as_ref().is_some_and(|a| a.generation == generation) {
                *active = None;
            }
        }

        match outcome {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                debug!(generation, "Scan cancelled");
                Err(ScanError::Superseded)
            }
            Err(e) => Err(ScanError::Aborted(e.to_string())),
        }
    }

    /// Probe one device and recommend how to access it. Every call lands in the
    /// handshake history, unreachable devices included.
    pub async fn handshake(
        &self,
        ip: Ipv4Addr,
        device_type: &str,
    ) -> Result<HandshakeReport, HandshakeError> {
        info!(%ip, device_type, "Starting handshake");
        let kind = DeviceType::from(device_type);
        debug!(%ip, phase = ?HandshakePhase::Probing, "Handshake phase");

        let ports = match self.port_scanner().probe_device(ip).await {
            Ok(ports) => ports,
            Err(e) => {
                warn!(%ip, "Handshake failed: device unreachable");
                self.history
                    .record(HandshakeRecord::new(
                        ip,
                        kind.as_str(),
                        false,
                        AccessMethod::Unknown,
                    ))
                    .await;
                return Err(e);
            }
        };

        debug!(%ip, phase = ?HandshakePhase::Recommending, "Handshake phase");
        let access = self.policy.recommend(&kind, &ports);

        self.history
            .record(HandshakeRecord::new(ip, kind.as_str(), true, access.method))
            .await;
        debug!(%ip, phase = ?HandshakePhase::Done, method = %access.method, "Handshake phase");

        Ok(HandshakeReport {
            ip,
            device_type: kind.to_string(),
            ports,
            access,
        })
    }

    /// Probe, recommend, then try the supplied credentials once over the recommended
    /// method. Web ports answering 404 are not considered for authentication.
    pub async fn auto_connect(
        &self,
        ip: Ipv4Addr,
        device_type: &str,
        credentials: &Credentials,
    ) -> Result<ConnectionAttempt, HandshakeError> {
        info!(%ip, device_type, username = %credentials.username, "Starting auto-connect");
        debug!(%ip, phase = ?HandshakePhase::Probing, "Handshake phase");
        let ports = self.port_scanner().probe_device(ip).await?.authenticable();

        debug!(%ip, phase = ?HandshakePhase::Recommending, "Handshake phase");
        let access = self.policy.recommend(&DeviceType::from(device_type), &ports);

        debug!(%ip, phase = ?HandshakePhase::AutoConnecting, method = %access.method, "Handshake phase");
        let result = access::attempt(self.probe.as_ref(), ip, &access, &ports, credentials).await;

        info!(%ip, status = ?result.status, "Auto-connect finished");
        Ok(result)
    }
}

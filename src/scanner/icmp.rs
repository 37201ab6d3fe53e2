//! ICMP echo reachability check. Tries a raw socket first, then an unprivileged
//! datagram ICMP socket; if neither can be opened the caller is told so it can fall
//! back to another reachability test.

use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, warn};

const ICMP_ECHO_REPLY: u8 = 0;
const ICMP_ECHO_REQUEST: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    Alive,
    /// No echo reply within the attempt budget
    Silent,
    /// No ICMP socket could be opened (typically missing privileges)
    Unavailable,
}

/// ICMP echo pinger
#[derive(Debug, Clone)]
pub struct IcmpPinger {
    timeout: Duration,
    attempts: u32,
}

impl IcmpPinger {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            attempts: 3,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Build an ICMP echo request packet
    fn build_echo_request(identifier: u16, sequence: u16) -> Vec<u8> {
        let mut packet = vec![0u8; 8];

        packet[0] = ICMP_ECHO_REQUEST;
        packet[1] = 0;
        packet[4..6].copy_from_slice(&identifier.to_be_bytes());
        packet[6..8].copy_from_slice(&sequence.to_be_bytes());

        let checksum = Self::calculate_checksum(&packet);
        packet[2..4].copy_from_slice(&checksum.to_be_bytes());

        packet
    }

    /// Internet checksum over 16-bit big-endian words
    fn calculate_checksum(data: &[u8]) -> u16 {
        let mut sum: u32 = 0;

        for chunk in data.chunks(2) {
            let word = match chunk {
                [hi, lo] => ((*hi as u32) << 8) | (*lo as u32),
                [hi] => (*hi as u32) << 8,
                _ => 0,
            };
            sum = sum.wrapping_add(word);
        }

        while (sum >> 16) != 0 {
            sum = (sum & 0xffff) + (sum >> 16);
        }

        !sum as u16
    }

    /// Raw sockets deliver the IP header too; datagram ICMP sockets do not.
    /// Echo reply to our request. DGRAM sockets have the kernel rewrite the identifier,
    /// so it is only compared on raw sockets.
    fn is_echo_reply(data: &[u8], includes_ip_header: bool, identifier: u16, sequence: u16) -> bool {
        let icmp = if includes_ip_header {
            let Some(first) = data.first() else {
                return false;
            };
            let header_len = ((first & 0x0f) as usize) * 4;
            data.get(header_len..).unwrap_or_default()
        } else {
            data
        };
        if icmp.len() < 8 || icmp[0] != ICMP_ECHO_REPLY {
            return false;
        }
        let id = u16::from_be_bytes([icmp[4], icmp[5]]);
        let seq = u16::from_be_bytes([icmp[6], icmp[7]]);
        seq == sequence && (!includes_ip_header || id == identifier)
    }

    fn open_socket() -> Option<(Socket, bool)> {
        if let Ok(socket) = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)) {
            return Some((socket, true));
        }
        match Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4)) {
            Ok(socket) => Some((socket, false)),
            Err(e) => {
                debug!(error = %e, "No ICMP socket available");
                None
            }
        }
    }

    /// One echo request and wait for its reply
    fn echo_once(&self, ip: Ipv4Addr, sequence: u16) -> PingOutcome {
        let Some((socket, includes_ip_header)) = Self::open_socket() else {
            return PingOutcome::Unavailable;
        };

        let _ = socket.set_write_timeout(Some(self.timeout));

        let identifier = std::process::id() as u16;
        let packet = Self::build_echo_request(identifier, sequence);
        let target = SocketAddr::new(IpAddr::V4(ip), 0);

        if socket.send_to(&packet, &target.into()).is_err() {
            return PingOutcome::Silent;
        }

        let deadline = Instant::now() + self.timeout;
        let mut buffer = [MaybeUninit::<u8>::uninit(); 1024];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || socket.set_read_timeout(Some(remaining)).is_err() {
                return PingOutcome::Silent;
            }

            match socket.recv_from(&mut buffer) {
                Ok((len, from)) => {
                    // Raw sockets see every ICMP packet on the host
                    if from.as_socket_ipv4().map(|addr| *addr.ip()) != Some(ip) {
                        continue;
                    }
                    // Safety: recv_from initialized the first `len` bytes
                    let data: &[u8] =
                        unsafe { std::slice::from_raw_parts(buffer.as_ptr() as *const u8, len) };
                    if Self::is_echo_reply(data, includes_ip_header, identifier, sequence) {
                        return PingOutcome::Alive;
                    }
                }
                Err(_) => return PingOutcome::Silent,
            }
        }
    }

    /// Ping `ip` up to the configured number of attempts
    pub async fn ping(&self, ip: Ipv4Addr) -> PingOutcome {
        let pinger = self.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut outcome = PingOutcome::Silent;
            for attempt in 0..pinger.attempts {
                outcome = pinger.echo_once(ip, attempt as u16);
                if outcome != PingOutcome::Silent {
                    break;
                }
                debug!(%ip, attempt = attempt + 1, "No echo reply");
            }
            outcome
        })
        .await;

        outcome.unwrap_or_else(|e| {
            warn!(%ip, error = %e, "Ping task failed");
            PingOutcome::Silent
        })
    }
}

impl Default for IcmpPinger {
    fn default() -> Self {
        Self::new()
    }
}

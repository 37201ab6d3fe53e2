//! Bounded in-memory record of handshakes, newest first. Lives as long as the process.

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::access::AccessMethod;

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandshakeRecord {
    pub ip: Ipv4Addr,
    pub device_type: String,
    pub requested_at: DateTime<Utc>,
    pub success: bool,
    pub access_method: AccessMethod,
}

impl HandshakeRecord {
    pub fn new(ip: Ipv4Addr, device_type: &str, success: bool, access_method: AccessMethod) -> Self {
        Self {
            ip,
            device_type: device_type.to_string(),
            requested_at: Utc::now(),
            success,
            access_method,
        }
    }
}

#[derive(Debug)]
pub struct HandshakeHistory {
    entries: RwLock<VecDeque<HandshakeRecord>>,
    capacity: usize,
}

impl Default for HandshakeHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl HandshakeHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Insert at the front and evict from the back, under one write lock
    pub async fn record(&self, record: HandshakeRecord) {
        let mut entries = self.entries.write().await;
        entries.push_front(record);
        entries.truncate(self.capacity);
    }

    /// Newest first
    pub async fn snapshot(&self) -> Vec<HandshakeRecord> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(last_octet: u8) -> HandshakeRecord {
        HandshakeRecord::new(
            Ipv4Addr::new(10, 0, 0, last_octet),
            "Router/Gateway",
            true,
            AccessMethod::Http,
        )
    }

    #[tokio::test]
    async fn test_evicts_oldest_past_capacity() {
        let history = HandshakeHistory::default();
        for i in 0..51u8 {
            history.record(record(i)).await;
        }

        let entries = history.snapshot().await;
        assert_eq!(entries.len(), HISTORY_CAPACITY);
        assert_eq!(entries[0].ip, Ipv4Addr::new(10, 0, 0, 50));
        assert_eq!(entries[49].ip, Ipv4Addr::new(10, 0, 0, 1));
        assert!(entries.iter().all(|e| e.ip != Ipv4Addr::new(10, 0, 0, 0)));
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let history = Arc::new(HandshakeHistory::with_capacity(100));
        let mut tasks = Vec::new();
        for i in 0..40u8 {
            let history = history.clone();
            tasks.push(tokio::spawn(async move { history.record(record(i)).await }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(history.len().await, 40);
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let history = HandshakeHistory::default();
        assert!(history.is_empty().await);
        assert!(history.snapshot().await.is_empty());
    }
}

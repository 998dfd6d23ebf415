use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use jiff::Timestamp;
use serde::Serialize;
use tokio::time::Instant;

/// A connected user who was authorized when the snapshot was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub nickname: String,
    pub ip_address: String,
    pub client_id: String,
    pub client_db_id: String,
    /// The user's server groups that grant access.
    pub groups: BTreeSet<String>,
}

/// Immutable view of all authorized users at one point in time, keyed by IP address.
#[derive(Debug)]
pub struct Snapshot {
    entries: HashMap<String, Arc<UserRecord>>,
    built_at: Instant,
    timestamp: Timestamp,
}

impl Snapshot {
    pub fn new(entries: HashMap<String, Arc<UserRecord>>) -> Self {
        Self {
            entries,
            built_at: Instant::now(),
            timestamp: Timestamp::now(),
        }
    }

    pub fn get(&self, ip: &str) -> Option<&Arc<UserRecord>> {
        self.entries.get(ip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &HashMap<String, Arc<UserRecord>> {
        &self.entries
    }

    /// When the build completed, on the monotonic clock.
    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    /// When the build completed, as wall-clock time for reporting.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn age(&self) -> Duration {
        self.built_at.elapsed()
    }
}

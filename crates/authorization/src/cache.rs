use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::{Snapshot, UserRecord};

/// The currently installed snapshot, or `None` before the first successful refresh.
pub type CurrentSnapshot = Option<Arc<Snapshot>>;

/// Shared holder of the current snapshot.
///
/// Readers never block on a refresh in progress: a new snapshot replaces the old one in a
/// single swap, and every read works on whichever snapshot it picked up.
#[derive(Debug)]
pub struct AuthorizationCache {
    current: watch::Sender<CurrentSnapshot>,
}

impl Default for AuthorizationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationCache {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    pub fn lookup(&self, ip: &str) -> Option<Arc<UserRecord>> {
        self.current.borrow().as_ref()?.get(ip).cloned()
    }

    /// Replace the current snapshot with `snapshot`.
    pub fn install(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.send_replace(Some(snapshot.clone()));

        snapshot
    }

    pub fn snapshot(&self) -> CurrentSnapshot {
        self.current.borrow().clone()
    }

    /// Time since the current snapshot was built.
    pub fn age(&self) -> Option<Duration> {
        self.current.borrow().as_ref().map(|snapshot| snapshot.age())
    }

    pub fn count(&self) -> usize {
        self.current.borrow().as_ref().map_or(0, |snapshot| snapshot.len())
    }

    /// Get notified whenever a new snapshot is installed.
    pub fn subscribe(&self) -> watch::Receiver<CurrentSnapshot> {
        self.current.subscribe()
    }
}

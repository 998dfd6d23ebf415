use std::{sync::Arc, time::Duration};

use serverquery::{QueryConnector, QueryError, QuerySession};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{AuthorizationCache, RefreshError, Snapshot, SnapshotBuilder};

/// Upper bound for the `quit` sent before dropping a session.
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of a refresh trigger that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot with `count` entries was installed.
    Refreshed { count: usize },
    /// Another refresh was in flight, so this trigger was dropped.
    AlreadyRunning,
}

/// Rebuilds the cache periodically and on demand.
///
/// At most one refresh runs at a time. The ServerQuery session is kept open between
/// refreshes and only re-established after a failure.
pub struct RefreshScheduler {
    cache: Arc<AuthorizationCache>,
    connector: Arc<dyn QueryConnector>,
    builder: SnapshotBuilder,
    ttl: Duration,
    timeout: Duration,
    session: Mutex<Option<Box<dyn QuerySession>>>,
}

impl RefreshScheduler {
    pub fn new(
        cache: Arc<AuthorizationCache>,
        connector: Arc<dyn QueryConnector>,
        builder: SnapshotBuilder,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            cache,
            connector,
            builder,
            ttl,
            timeout,
            session: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Build a new snapshot and install it.
    ///
    /// If a refresh is already running the trigger is dropped and the caller sees the
    /// result of the running one through the cache. On failure the installed snapshot
    /// stays untouched and the session is discarded.
    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let Ok(mut session) = self.session.try_lock() else {
            log::debug!("Refresh already in progress, dropping trigger");
            return Ok(RefreshOutcome::AlreadyRunning);
        };

        log::debug!("Refreshing authorized users");

        match time::timeout(self.timeout, self.build(&mut session)).await {
            Ok(Ok(snapshot)) => {
                let snapshot = self.cache.install(snapshot);
                log::info!("Updated authorized users: {} IPs authorized", snapshot.len());

                Ok(RefreshOutcome::Refreshed { count: snapshot.len() })
            }
            Ok(Err(error)) => {
                if let Some(open) = session.take()
                    && !error.is_connection_error()
                {
                    close(open).await;
                }

                let error = RefreshError::from(error);
                log::error!("Failed to update authorized users: {error}");

                Err(error)
            }
            Err(_) => {
                if let Some(open) = session.take() {
                    close(open).await;
                }

                let error = RefreshError::Timeout(self.timeout);
                log::error!("Failed to update authorized users: {error}");

                Err(error)
            }
        }
    }

    async fn build(&self, slot: &mut Option<Box<dyn QuerySession>>) -> Result<Snapshot, QueryError> {
        if slot.is_none() {
            *slot = Some(self.connector.connect().await?);
        }

        match slot.as_deref_mut() {
            Some(session) => self.builder.build(session).await,
            None => Err(QueryError::Closed),
        }
    }

    /// Run the first refresh, then keep refreshing every `ttl` until `shutdown` fires.
    ///
    /// A failed first refresh is logged and leaves the cache empty, the periodic loop
    /// retries on its next tick.
    pub async fn start(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        log::info!(
            "Starting authorization cache refresh, interval {}s",
            self.ttl.as_secs_f64()
        );

        if let Err(error) = self.refresh().await {
            log::warn!("Initial refresh failed, serving with an empty cache: {error}");
        }

        self.spawn(shutdown)
    }

    fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + self.ttl, self.ttl);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        // Failures are logged by `refresh`, the next tick retries.
                        let _ = self.refresh().await;
                    }
                }
            }

            log::debug!("Authorization cache refresh loop stopped");
            self.disconnect().await;
        })
    }

    /// Close the ServerQuery session, if one is open.
    pub async fn disconnect(&self) {
        let session = self.session.lock().await.take();

        if let Some(session) = session {
            close(session).await;
            log::info!("Disconnected from TeamSpeak server");
        }
    }
}

async fn close(mut session: Box<dyn QuerySession>) {
    if time::timeout(QUIT_TIMEOUT, session.quit()).await.is_err() {
        log::warn!("Timed out saying goodbye to the TeamSpeak server");
    }
}

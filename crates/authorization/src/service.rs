use std::{net::IpAddr, sync::Arc, time::Duration};

use config::Config;
use ipnet::IpNet;
use jiff::Timestamp;
use serverquery::QueryConnector;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    AuthorizationCache, RefreshError, RefreshOutcome, RefreshScheduler, SnapshotBuilder, SubnetAllowlist, UserRecord,
    canonical_ip,
};

/// User name reported for requests authorized by network rather than by a TeamSpeak client.
pub const SUBNET_USER: &str = "localuser";

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The address is inside a configured network.
    Subnet(IpNet),
    /// The address belongs to a connected client in a required group.
    User(Arc<UserRecord>),
    Denied,
}

impl Decision {
    pub fn is_authorized(&self) -> bool {
        !matches!(self, Self::Denied)
    }

    /// Name to report upstream for an authorized request.
    pub fn user_name(&self) -> Option<&str> {
        match self {
            Self::Subnet(_) => Some(SUBNET_USER),
            Self::User(user) => Some(&user.nickname),
            Self::Denied => None,
        }
    }
}

/// Everything the HTTP surface needs: authorization decisions, refresh triggers and cache stats.
pub struct AuthorizationService {
    cache: Arc<AuthorizationCache>,
    scheduler: Arc<RefreshScheduler>,
    subnets: SubnetAllowlist,
}

impl AuthorizationService {
    pub fn new(config: &Config, connector: Arc<dyn QueryConnector>) -> Self {
        let cache = Arc::new(AuthorizationCache::new());
        let builder = SnapshotBuilder::new(config.authorization.required_server_groups.clone());

        let scheduler = RefreshScheduler::new(
            cache.clone(),
            connector,
            builder,
            config.cache.ttl,
            config.teamspeak.timeout,
        );

        Self {
            cache,
            scheduler: Arc::new(scheduler),
            subnets: SubnetAllowlist::new(config.authorization.authorized_subnets.clone()),
        }
    }

    /// Fill the cache and keep it fresh until `shutdown` fires.
    pub async fn start(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.scheduler.clone().start(shutdown).await
    }

    /// Decide whether requests from `ip` are allowed. Configured networks are checked first.
    pub fn authorize(&self, ip: &str) -> Decision {
        if let Ok(address) = ip.parse::<IpAddr>()
            && let Some(network) = self.subnets.find(address)
        {
            log::debug!("IP {ip} authorized by subnet {network}");
            return Decision::Subnet(*network);
        }

        match self.lookup(ip) {
            Some(user) => {
                log::debug!("IP {ip} authorized for user {}", user.nickname);
                Decision::User(user)
            }
            None => {
                log::debug!("IP {ip} not authorized");
                Decision::Denied
            }
        }
    }

    /// The connected user behind `ip`, ignoring configured networks.
    pub fn lookup(&self, ip: &str) -> Option<Arc<UserRecord>> {
        self.cache.lookup(&canonical_ip(ip))
    }

    pub async fn trigger_refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        self.scheduler.refresh().await
    }

    pub fn age(&self) -> Option<Duration> {
        self.cache.age()
    }

    pub fn count(&self) -> usize {
        self.cache.count()
    }

    pub fn ttl(&self) -> Duration {
        self.scheduler.ttl()
    }

    /// Wall-clock time of the current snapshot.
    pub fn last_refresh(&self) -> Option<Timestamp> {
        self.cache.snapshot().map(|snapshot| snapshot.timestamp())
    }

    /// All addresses in the current snapshot, sorted.
    pub fn authorized_ips(&self) -> Vec<String> {
        let mut ips = self
            .cache
            .snapshot()
            .map(|snapshot| snapshot.entries().keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();

        ips.sort();
        ips
    }
}

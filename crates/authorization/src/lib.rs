//! IP-based authorization backed by the set of users connected to a TeamSpeak server.
//!
//! A [`RefreshScheduler`] periodically asks the ServerQuery interface who is connected,
//! keeps the clients that belong to a required server group, and installs the result
//! into the [`AuthorizationCache`] as one immutable [`Snapshot`]. Lookups only ever read
//! the installed snapshot and never wait on the network.

mod builder;
mod cache;
mod error;
mod scheduler;
mod service;
mod snapshot;
mod subnet;


use std::net::IpAddr;

pub use builder::SnapshotBuilder;
pub use cache::{AuthorizationCache, CurrentSnapshot};
pub use error::RefreshError;
pub use scheduler::{RefreshOutcome, RefreshScheduler};
pub use service::{AuthorizationService, Decision, SUBNET_USER};
pub use snapshot::{Snapshot, UserRecord};
pub use subnet::SubnetAllowlist;

/// Normalized textual form of an address, so `::ffff:10.0.0.1` and `10.0.0.1` share a key.
/// Strings that are not addresses are returned as they are.
pub(crate) fn canonical_ip(ip: &str) -> String {
    match ip.parse::<IpAddr>() {
        Ok(address) => address.to_canonical().to_string(),
        Err(_) => ip.to_string(),
    }
}

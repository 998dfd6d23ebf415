use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use serverquery::{QueryError, QuerySession};

use crate::{Snapshot, UserRecord, canonical_ip};

/// Turns the connected-client listing of a session into a snapshot of authorized users.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    required_groups: Arc<BTreeSet<String>>,
}

impl SnapshotBuilder {
    pub fn new(required_groups: BTreeSet<String>) -> Self {
        Self {
            required_groups: Arc::new(required_groups),
        }
    }

    pub fn required_groups(&self) -> &BTreeSet<String> {
        &self.required_groups
    }

    /// Query every connected client and keep the ones in at least one required group.
    ///
    /// Clients sharing an IP address overwrite each other in listing order. Any failed
    /// call aborts the build, so a snapshot is always complete.
    pub async fn build(&self, session: &mut dyn QuerySession) -> Result<Snapshot, QueryError> {
        let clients = session.list_connected_clients().await?;
        let mut entries: HashMap<String, Arc<UserRecord>> = HashMap::with_capacity(clients.len());

        for client in clients {
            log::trace!("Processing client: {client:?}");

            let Some(ip_address) = client.ip_address else {
                log::warn!(
                    "Client {} (ID: {}) missing IP address, skipping",
                    client.nickname,
                    client.client_id
                );
                continue;
            };

            let ip_address = canonical_ip(&ip_address);

            let Some(client_db_id) = client.client_db_id else {
                log::warn!("Client {} missing database ID, skipping", client.nickname);
                continue;
            };

            let groups = session.list_client_groups(&client_db_id).await?;
            log::debug!("Client {} ({ip_address}) groups: {groups:?}", client.nickname);

            let granted = self.granted_groups(groups);

            if granted.is_empty() {
                continue;
            }

            log::debug!("Authorized client: {} ({ip_address})", client.nickname);

            let record = UserRecord {
                nickname: client.nickname,
                ip_address: ip_address.clone(),
                client_id: client.client_id,
                client_db_id,
                groups: granted,
            };

            if let Some(previous) = entries.insert(ip_address, Arc::new(record)) {
                log::debug!(
                    "IP {} is shared with {}, keeping the later client",
                    previous.ip_address,
                    previous.nickname
                );
            }
        }

        log::info!("Found {} authorized clients", entries.len());

        Ok(Snapshot::new(entries))
    }

    /// The subset of `groups` that grant access.
    fn granted_groups(&self, groups: Vec<String>) -> BTreeSet<String> {
        groups
            .into_iter()
            .filter(|group| self.required_groups.contains(group))
            .collect()
    }
}

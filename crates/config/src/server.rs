//! HTTP server configuration settings.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::{ClientIpConfig, HealthConfig};

/// HTTP server configuration settings.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// The socket address the server should listen on.
    pub listen_address: Option<SocketAddr>,
    /// How the client IP of a forwarded request is determined.
    pub client_ip: ClientIpConfig,
    /// Health endpoint configuration.
    pub health: HealthConfig,
}

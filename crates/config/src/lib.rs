//! Configuration for the tsauth service.

mod authorization;
mod cache;
mod client_ip;
mod error;
mod health;
mod loader;
mod server;
mod teamspeak;

use std::path::Path;

use serde::Deserialize;

pub use authorization::AuthorizationConfig;
pub use cache::CacheConfig;
pub use client_ip::ClientIpConfig;
pub use error::Error;
pub use health::HealthConfig;
pub use server::ServerConfig;
pub use teamspeak::TeamspeakConfig;

pub(crate) type Result<T> = std::result::Result<T, error::Error>;

/// Main configuration structure for the tsauth application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    pub server: ServerConfig,
    /// Connection settings for the TeamSpeak ServerQuery interface.
    pub teamspeak: TeamspeakConfig,
    /// Which server groups and networks are authorized.
    pub authorization: AuthorizationConfig,
    /// Authorization cache settings.
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from a file path, expanding environment placeholders and validating the result.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }
}

//! TeamSpeak ServerQuery connection settings.

use std::time::Duration;

use duration_str::deserialize_duration;
use secrecy::SecretString;
use serde::Deserialize;

/// Connection settings for the TeamSpeak ServerQuery interface.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TeamspeakConfig {
    /// Hostname of the TeamSpeak server.
    pub host: String,
    /// ServerQuery port (raw telnet interface).
    pub port: u16,
    /// ServerQuery login name.
    pub username: String,
    /// ServerQuery login password.
    pub password: SecretString,
    /// Virtual server to select after login.
    pub server_id: u32,
    /// Upper bound for one complete refresh against the server.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for TeamspeakConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 10011,
            username: "serveradmin".to_string(),
            password: SecretString::from(""),
            server_id: 1,
            timeout: Duration::from_secs(10),
        }
    }
}

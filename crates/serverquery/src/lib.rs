//! Client for the TeamSpeak 3 ServerQuery interface.
//!
//! Only the handful of commands needed to find out who is connected, and with
//! which server groups, are implemented. The [`QueryConnector`] and
//! [`QuerySession`] traits are the seam used by the authorization cache, so it
//! can be driven by a fake in tests.

mod codec;
mod error;
mod escape;
mod response;
mod session;

use async_trait::async_trait;

pub use codec::QueryCodec;
pub use error::QueryError;
pub use escape::{escape, unescape};
pub use response::{Record, Status, parse_records, parse_status};
pub use session::{ServerQuerySession, TcpConnector};

/// A voice client currently connected to the virtual server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedClient {
    /// Per-connection client id (`clid`).
    pub client_id: String,
    /// Persistent database id (`client_database_id`), missing for clients still joining.
    pub client_db_id: Option<String>,
    pub nickname: String,
    /// Remote address as reported by the server, missing for clients still joining.
    pub ip_address: Option<String>,
}

/// Opens authenticated sessions against the configured virtual server.
#[async_trait]
pub trait QueryConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn QuerySession>, QueryError>;
}

/// An open, logged-in session.
#[async_trait]
pub trait QuerySession: Send {
    /// Voice clients in listing order. ServerQuery clients are excluded.
    async fn list_connected_clients(&mut self) -> Result<Vec<ConnectedClient>, QueryError>;

    /// Server group ids the client with the given database id belongs to.
    async fn list_client_groups(&mut self, client_db_id: &str) -> Result<Vec<String>, QueryError>;

    /// Say goodbye to the server. Errors are logged and swallowed.
    async fn quit(&mut self);
}

use std::io;

/// Errors returned by the ServerQuery client.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The TCP connection could not be established.
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to an established connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server closed the connection.
    #[error("Connection closed by server")]
    Closed,

    /// The server rejected the login or the virtual server selection.
    #[error("Authentication failed ({id}): {message}")]
    Authentication { id: u32, message: String },

    /// A command returned a non-zero status.
    #[error("Command '{command}' failed ({id}): {message}")]
    Command { command: String, id: u32, message: String },

    /// The server sent something we could not understand.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A single line exceeded the codec limit.
    #[error("Line too long: {actual} bytes (limit {limit})")]
    LineTooLong { actual: usize, limit: usize },
}

impl QueryError {
    /// Whether the failure means the server could not be reached or refused our credentials,
    /// as opposed to an unexpected answer mid-listing.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Io(_) | Self::Closed | Self::Authentication { .. }
        )
    }
}

use std::time::Duration;

use serverquery::QueryError;

/// Why a refresh did not install a new snapshot.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The server could not be reached or refused our credentials.
    #[error("TeamSpeak server unavailable: {0}")]
    Unavailable(#[source] QueryError),

    /// The server answered, but a listing or group query failed.
    #[error("TeamSpeak query failed: {0}")]
    Query(#[source] QueryError),

    #[error("Refresh did not complete within {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

impl From<QueryError> for RefreshError {
    fn from(error: QueryError) -> Self {
        if error.is_connection_error() {
            Self::Unavailable(error)
        } else {
            Self::Query(error)
        }
    }
}

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_util::codec::Framed;

use crate::{
    ConnectedClient, QueryConnector, QueryError, QuerySession,
    codec::QueryCodec,
    escape::escape,
    response::{Record, Status, parse_records, parse_status},
};

use config::TeamspeakConfig;
use secrecy::ExposeSecret;

/// Status id for "database empty result set", returned instead of an empty list.
const EMPTY_RESULT_SET: u32 = 1281;

/// Client type of ServerQuery connections, which are never voice users.
const QUERY_CLIENT_TYPE: &str = "1";

/// A logged-in ServerQuery connection over any byte stream.
pub struct ServerQuerySession<T> {
    framed: Framed<T, QueryCodec>,
}

impl<T> ServerQuerySession<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Consume the greeting the server sends right after the connection opens.
    pub async fn handshake(transport: T) -> Result<Self, QueryError> {
        let mut session = Self {
            framed: Framed::new(transport, QueryCodec::new()),
        };

        let greeting = session.next_line().await?;

        if greeting != "TS3" {
            return Err(QueryError::Protocol(format!(
                "unexpected greeting '{greeting}', is this a ServerQuery port?"
            )));
        }

        let welcome = session.next_line().await?;
        log::debug!("ServerQuery greeting: {welcome}");

        Ok(session)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), QueryError> {
        let command = format!(
            "login client_login_name={} client_login_password={}",
            escape(username),
            escape(password)
        );

        let (_, status) = self.execute_raw(command).await?;

        if !status.is_ok() {
            return Err(QueryError::Authentication {
                id: status.id,
                message: status.message,
            });
        }

        Ok(())
    }

    pub async fn select_server(&mut self, server_id: u32) -> Result<(), QueryError> {
        let (_, status) = self.execute_raw(format!("use sid={server_id}")).await?;

        if !status.is_ok() {
            return Err(QueryError::Authentication {
                id: status.id,
                message: status.message,
            });
        }

        Ok(())
    }

    /// Run a command, failing on any non-zero status.
    async fn execute(&mut self, command: String) -> Result<Vec<Record>, QueryError> {
        let (records, status) = self.execute_raw(command.clone()).await?;

        if !status.is_ok() {
            return Err(QueryError::Command {
                command: command_name(&command).to_string(),
                id: status.id,
                message: status.message,
            });
        }

        Ok(records)
    }

    /// Run a command and return its data records together with the final status.
    async fn execute_raw(&mut self, command: String) -> Result<(Vec<Record>, Status), QueryError> {
        log::trace!("ServerQuery command: {}", command_name(&command));

        self.framed.send(command).await?;

        let mut records = Vec::new();

        loop {
            let line = self.next_line().await?;

            if let Some(status) = parse_status(&line) {
                return Ok((records, status?));
            }

            records.extend(parse_records(&line));
        }
    }

    /// Next line from the server, skipping asynchronous notifications.
    async fn next_line(&mut self) -> Result<String, QueryError> {
        loop {
            let line = match self.framed.next().await {
                Some(line) => line?,
                None => return Err(QueryError::Closed),
            };

            if line.starts_with("notify") {
                log::trace!("Ignoring ServerQuery notification");
                continue;
            }

            return Ok(line);
        }
    }
}

#[async_trait]
impl<T> QuerySession for ServerQuerySession<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn list_connected_clients(&mut self) -> Result<Vec<ConnectedClient>, QueryError> {
        let records = self.execute("clientlist -ip".to_string()).await?;
        let mut clients = Vec::with_capacity(records.len());

        for mut record in records {
            if record.get("client_type").map(String::as_str) == Some(QUERY_CLIENT_TYPE) {
                continue;
            }

            let Some(client_id) = record.remove("clid") else {
                return Err(QueryError::Protocol("client entry without clid".to_string()));
            };

            clients.push(ConnectedClient {
                client_id,
                client_db_id: record.remove("client_database_id").filter(|id| !id.is_empty()),
                nickname: record.remove("client_nickname").unwrap_or_default(),
                ip_address: record.remove("connection_client_ip").filter(|ip| !ip.is_empty()),
            });
        }

        log::debug!("Retrieved {} connected clients", clients.len());

        Ok(clients)
    }

    async fn list_client_groups(&mut self, client_db_id: &str) -> Result<Vec<String>, QueryError> {
        let command = format!("servergroupsbyclientid cldbid={}", escape(client_db_id));
        let (records, status) = self.execute_raw(command).await?;

        match status.id {
            0 => Ok(records.into_iter().filter_map(|mut record| record.remove("sgid")).collect()),
            EMPTY_RESULT_SET => Ok(Vec::new()),
            id => Err(QueryError::Command {
                command: "servergroupsbyclientid".to_string(),
                id,
                message: status.message,
            }),
        }
    }

    async fn quit(&mut self) {
        if let Err(error) = self.framed.send("quit".to_string()).await {
            log::debug!("Failed to send quit to TeamSpeak server: {error}");
        }
    }
}

/// Opens ServerQuery sessions over TCP using the configured credentials.
pub struct TcpConnector {
    config: TeamspeakConfig,
}

impl TcpConnector {
    pub fn new(config: TeamspeakConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl QueryConnector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn QuerySession>, QueryError> {
        let address = format!("{}:{}", self.config.host, self.config.port);

        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| QueryError::Connect {
                address: address.clone(),
                source,
            })?;

        let mut session = ServerQuerySession::handshake(stream).await?;

        session
            .login(&self.config.username, self.config.password.expose_secret())
            .await?;

        session.select_server(self.config.server_id).await?;

        log::info!(
            "Connected to TeamSpeak server at {address} (virtual server {})",
            self.config.server_id
        );

        Ok(Box::new(session))
    }
}

fn command_name(command: &str) -> &str {
    command.split(' ').next().unwrap_or(command)
}

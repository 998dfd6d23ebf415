//! In-process TeamSpeak ServerQuery server speaking just enough of the protocol for tsauth.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use serverquery::{escape, parse_records};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};
use tokio_util::sync::CancellationToken;

pub const USERNAME: &str = "serveradmin";
pub const PASSWORD: &str = "hunter2";

const OK: &str = "error id=0 msg=ok";

/// A client as the fake server lists it.
#[derive(Debug, Clone)]
pub struct FakeClient {
    client_id: u32,
    database_id: u32,
    nickname: String,
    ip: Option<String>,
    groups: Vec<u32>,
    query: bool,
}

impl FakeClient {
    /// A voice client with database id `100 + id` and no server groups.
    pub fn new(id: u32, nickname: &str, ip: &str) -> Self {
        Self {
            client_id: id,
            database_id: 100 + id,
            nickname: nickname.to_string(),
            ip: Some(ip.to_string()),
            groups: Vec::new(),
            query: false,
        }
    }

    pub fn groups(mut self, groups: &[u32]) -> Self {
        self.groups = groups.to_vec();
        self
    }

    /// Listed without `connection_client_ip`, like a client that is still joining.
    pub fn without_ip(mut self) -> Self {
        self.ip = None;
        self
    }

    /// Listed as a ServerQuery connection (`client_type=1`).
    pub fn query(mut self) -> Self {
        self.query = true;
        self
    }

    fn render(&self) -> String {
        let mut record = format!(
            "clid={} cid=1 client_database_id={} client_nickname={} client_type={}",
            self.client_id,
            self.database_id,
            escape(&self.nickname),
            u8::from(self.query)
        );

        if let Some(ip) = &self.ip {
            record.push_str(&format!(" connection_client_ip={}", escape(ip)));
        }

        record
    }
}

#[derive(Default)]
struct State {
    clients: Vec<FakeClient>,
    failing: bool,
    listing_delay: Option<Duration>,
    connections: usize,
    commands: Vec<String>,
}

/// Fake ServerQuery endpoint, shut down when dropped.
pub struct FakeTeamspeak {
    address: SocketAddr,
    state: Arc<Mutex<State>>,
    shutdown: CancellationToken,
}

impl FakeTeamspeak {
    pub async fn spawn(clients: Vec<FakeClient>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let state = Arc::new(Mutex::new(State {
            clients,
            ..Default::default()
        }));

        let shutdown = CancellationToken::new();

        tokio::spawn({
            let state = state.clone();
            let shutdown = shutdown.clone();

            async move {
                loop {
                    let stream = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        accepted = listener.accept() => match accepted {
                            Ok((stream, _)) => stream,
                            Err(_) => break,
                        },
                    };

                    let state = state.clone();
                    let shutdown = shutdown.clone();

                    tokio::spawn(async move {
                        tokio::select! {
                            _ = shutdown.cancelled() => {}
                            _ = handle_connection(stream, state) => {}
                        }
                    });
                }
            }
        });

        Self {
            address,
            state,
            shutdown,
        }
    }

    /// `[teamspeak]` section pointing at this server.
    pub fn config(&self) -> String {
        indoc::formatdoc! {r#"

            [teamspeak]
            host = "{}"
            port = {}
            username = "{USERNAME}"
            password = "{PASSWORD}"
            timeout = "2s"
        "#, self.address.ip(), self.address.port()}
    }

    pub fn set_clients(&self, clients: Vec<FakeClient>) {
        self.state.lock().unwrap().clients = clients;
    }

    /// Make `clientlist` fail with a command error.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Hold back the `clientlist` answer.
    pub fn set_listing_delay(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().listing_delay = delay;
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    /// Commands received so far, with the login password masked.
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }
}

impl Drop for FakeTeamspeak {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<Mutex<State>>) -> std::io::Result<()> {
    state.lock().unwrap().connections += 1;

    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write
        .write_all(b"TS3\n\rWelcome to the TeamSpeak 3 ServerQuery interface, type \"help\" for a list of commands and \"help <command>\" for information on a specific command.\n\r")
        .await?;

    let mut logged_in = false;

    while let Some(line) = lines.next_line().await? {
        let command = line.trim_matches(['\r', '\n']);

        if command.is_empty() {
            continue;
        }

        let delay = {
            let state = state.lock().unwrap();
            command.starts_with("clientlist").then_some(state.listing_delay).flatten()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = respond(&state, command, &mut logged_in);

        write.write_all(reply.as_bytes()).await?;

        if command == "quit" {
            break;
        }
    }

    Ok(())
}

fn respond(state: &Mutex<State>, command: &str, logged_in: &mut bool) -> String {
    let mut state = state.lock().unwrap();

    let (name, arguments) = command.split_once(' ').unwrap_or((command, ""));
    let arguments = parse_records(arguments).into_iter().next().unwrap_or_default();

    let logged = match name {
        "login" => format!(
            "login client_login_name={} client_login_password=***",
            arguments.get("client_login_name").map(String::as_str).unwrap_or_default()
        ),
        _ => command.to_string(),
    };

    state.commands.push(logged);

    let lines: Vec<String> = match name {
        "login" => {
            let valid = arguments.get("client_login_name").map(String::as_str) == Some(USERNAME)
                && arguments.get("client_login_password").map(String::as_str) == Some(PASSWORD);

            if valid {
                *logged_in = true;
                vec![OK.to_string()]
            } else {
                vec![r"error id=520 msg=invalid\sloginname\sor\spassword".to_string()]
            }
        }
        "quit" => vec![OK.to_string()],
        _ if !*logged_in => vec![r"error id=518 msg=not\slogged\sin".to_string()],
        "use" => vec![OK.to_string()],
        "clientlist" if state.failing => vec![r"error id=2568 msg=insufficient\sclient\spermissions".to_string()],
        "clientlist" => {
            let mut records = vec![
                // Our own connection always shows up in the listing.
                FakeClient::new(0, "serveradmin from 127.0.0.1:40000", "127.0.0.1")
                    .query()
                    .render(),
            ];

            records.extend(state.clients.iter().map(FakeClient::render));

            vec![records.join("|"), OK.to_string()]
        }
        "servergroupsbyclientid" => {
            let groups = arguments
                .get("cldbid")
                .and_then(|id| id.parse::<u32>().ok())
                .and_then(|id| state.clients.iter().find(|client| client.database_id == id))
                .map(|client| client.groups.clone())
                .unwrap_or_default();

            if groups.is_empty() {
                vec![r"error id=1281 msg=database\sempty\sresult\sset".to_string()]
            } else {
                let records = groups
                    .iter()
                    .map(|group| format!("name=Group\\s{group} sgid={group}"))
                    .collect::<Vec<_>>()
                    .join("|");

                vec![records, OK.to_string()]
            }
        }
        _ => vec![r"error id=256 msg=command\snot\sfound".to_string()],
    };

    lines.iter().map(|line| format!("{line}\n\r")).collect()
}

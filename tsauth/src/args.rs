use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// ForwardAuth backend authorizing the IP addresses of TeamSpeak users.
#[derive(Debug, Parser)]
#[command(name = "tsauth", version, about)]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "TSAUTH_CONFIG", default_value = "tsauth.toml")]
    pub config: PathBuf,

    /// Address to listen on, overrides `server.listen_address`.
    #[arg(long, env = "TSAUTH_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,

    /// Log filter, e.g. "info" or "server=debug,serverquery=trace".
    #[arg(long, env = "TSAUTH_LOG", default_value = "info")]
    pub log: String,
}

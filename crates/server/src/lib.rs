//! HTTP surface of tsauth: ForwardAuth, check, refresh, status and the OvenMediaEngine webhook.

mod auth;
mod client_ip;
mod error;
mod logger;
mod ome;
mod status;

use std::{net::SocketAddr, sync::Arc};

use authorization::AuthorizationService;
use axum::{
    Router,
    routing::{any, get, post},
};
use config::{ClientIpConfig, Config};
use serverquery::{QueryConnector, TcpConnector};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::Error;

pub(crate) type Result<T> = std::result::Result<T, error::Error>;

pub struct ServeConfig {
    pub listen_address: SocketAddr,
    pub config: Config,
    /// Stops the HTTP server and the refresh loop when cancelled.
    pub shutdown_signal: CancellationToken,
    /// Filter for the logger, like "info" or "server=debug".
    pub log_filter: String,
}

#[derive(Clone)]
pub(crate) struct AppState {
    service: Arc<AuthorizationService>,
    client_ip: ClientIpConfig,
}

pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        log_filter,
    }: ServeConfig,
) -> crate::Result<()> {
    logger::init(&log_filter);

    let listener = TcpListener::bind(listen_address).await.map_err(Error::Bind)?;

    let connector: Arc<dyn QueryConnector> = Arc::new(TcpConnector::new(config.teamspeak.clone()));
    let service = Arc::new(AuthorizationService::new(&config, connector));

    log::info!(
        "Authorizing members of server groups {:?} on {}:{}",
        config.authorization.required_server_groups,
        config.teamspeak.host,
        config.teamspeak.port
    );

    let refresh_task = service.start(shutdown_signal.clone()).await;

    let state = AppState {
        service,
        client_ip: config.server.client_ip.clone(),
    };

    let app = router(&config, state);

    log::info!("ForwardAuth endpoint available at: http://{listen_address}/auth");

    let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal.clone().cancelled_owned())
        .await
        .map_err(Error::Server);

    // The refresh loop shares the token; make sure it stops even if the server exited on its own.
    shutdown_signal.cancel();

    if let Err(e) = refresh_task.await {
        log::error!("Refresh task ended abnormally: {e}");
    }

    log::info!("Server stopped");

    result
}

fn router(config: &Config, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(status::root))
        .route("/auth", any(auth::forward_auth))
        .route("/auth/check", get(auth::check_peer))
        .route("/auth/check/{ip}", get(auth::check_ip))
        .route("/auth/refresh", post(auth::refresh))
        .route("/status", get(status::status))
        .route("/ome/admission", post(ome::admission));

    if config.server.health.enabled {
        app = app.route(&config.server.health.path, get(status::health));
    }

    app.with_state(state)
}

//! ForwardAuth and authorization check endpoints.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use authorization::{RefreshOutcome, UserRecord};
use axum::{
    Json,
    extract::{ConnectInfo, Path, State},
    response::{IntoResponse, Response},
};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::{AppState, client_ip::extract_client_ip, error::ApiError};

static X_AUTH_USER: HeaderName = HeaderName::from_static("x-auth-user");

#[derive(Serialize)]
struct ForwardAuthResponse<'a> {
    status: &'static str,
    ip: &'a str,
    user: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckResponse {
    authorized: bool,
    ip_address: String,
    user_info: Option<UserRecord>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshResponse {
    status: &'static str,
    authorized_users_count: usize,
    cache_age_seconds: Option<f64>,
}

/// ForwardAuth target for reverse proxies. Answers any method.
pub(crate) async fn forward_auth(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ip = extract_client_ip(&state.client_ip, &headers, peer).to_string();
    let decision = state.service.authorize(&ip);

    let Some(user) = decision.user_name() else {
        log::warn!("Unauthorized request from {ip}");
        return Err(ApiError::Forbidden);
    };

    log::info!("Authorized request from {ip} (user: {user})");

    let body = ForwardAuthResponse {
        status: "authorized",
        ip: &ip,
        user,
    };

    let mut response = Json(body).into_response();

    match HeaderValue::from_bytes(user.as_bytes()) {
        Ok(value) => {
            response.headers_mut().insert(X_AUTH_USER.clone(), value);
        }
        Err(_) => log::warn!("Nickname of {ip} is not a valid header value, omitting X-Auth-User"),
    }

    Ok(response)
}

/// Authorization state of the connecting peer. Forwarding headers are not consulted.
pub(crate) async fn check_peer(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Json<CheckResponse> {
    Json(check(&state, peer.ip().to_canonical().to_string()))
}

pub(crate) async fn check_ip(State(state): State<AppState>, Path(ip): Path<String>) -> Json<CheckResponse> {
    Json(check(&state, ip))
}

fn check(state: &AppState, ip_address: String) -> CheckResponse {
    let authorized = state.service.authorize(&ip_address).is_authorized();

    let user_info = authorized
        .then(|| state.service.lookup(&ip_address))
        .flatten()
        .map(Arc::unwrap_or_clone);

    CheckResponse {
        authorized,
        ip_address,
        user_info,
    }
}

/// Rebuild the cache now instead of waiting for the next scheduled refresh.
pub(crate) async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    let status = match state.service.trigger_refresh().await? {
        RefreshOutcome::Refreshed { .. } => "refreshed",
        RefreshOutcome::AlreadyRunning => "already_refreshing",
    };

    Ok(Json(RefreshResponse {
        status,
        authorized_users_count: state.service.count(),
        cache_age_seconds: state.service.age().as_ref().map(Duration::as_secs_f64),
    }))
}

//! OvenMediaEngine admission webhook.
//!
//! See <https://docs.ovenmediaengine.com/access-control/admission-webhooks>.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct AdmissionRequest {
    client: ClientInfo,
    request: RequestInfo,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    address: String,
    /// Set when the stream arrived through a proxy.
    #[serde(default)]
    real_ip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequestInfo {
    /// `incoming` for publishing, `outgoing` for playback.
    direction: String,
    protocol: String,
    /// `opening` or `closing`.
    status: String,
    url: String,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct AdmissionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed: Option<bool>,
    /// Milliseconds the admission stays valid, 0 for unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    lifetime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

pub(crate) async fn admission(
    State(state): State<AppState>,
    Json(payload): Json<AdmissionRequest>,
) -> Json<AdmissionResponse> {
    let AdmissionRequest { client, request } = payload;

    if request.status == "closing" {
        log::debug!(
            "OME closing: {} - {} {} {}",
            client.address,
            request.direction,
            request.protocol,
            request.url
        );

        return Json(AdmissionResponse::default());
    }

    let ip = client
        .real_ip
        .filter(|ip| !ip.is_empty())
        .unwrap_or(client.address);

    let decision = state.service.authorize(&ip);

    match decision.user_name() {
        Some(user) => {
            log::info!(
                "OME authorized: {ip} (user: {user}) - {} {} {}",
                request.direction,
                request.protocol,
                request.url
            );

            Json(AdmissionResponse {
                allowed: Some(true),
                lifetime: Some(0),
                ..Default::default()
            })
        }
        None => {
            log::warn!(
                "OME rejected: {ip} - {} {} {}",
                request.direction,
                request.protocol,
                request.url
            );

            Json(AdmissionResponse {
                allowed: Some(false),
                reason: Some("IP address not authorized"),
                ..Default::default()
            })
        }
    }
}

use std::time::Duration;

use axum::{Json, extract::State};
use jiff::Timestamp;
use serde::Serialize;
use serde_json::{Value, json};

use crate::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct StatusResponse {
    status: &'static str,
    authorized_users_count: usize,
    cache_age_seconds: Option<f64>,
    cache_ttl_seconds: u64,
    last_refresh: Option<Timestamp>,
}

pub(crate) async fn root() -> Json<Value> {
    Json(json!({
        "service": "tsauth",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/auth": "ForwardAuth endpoint for reverse proxies (Traefik, etc.)",
            "/auth/check": "Check if requesting IP is authorized",
            "/auth/check/{ip}": "Check if specific IP is authorized",
            "/auth/refresh": "Refresh authorized users now",
            "/ome/admission": "OvenMediaEngine Admission Webhook endpoint",
            "/status": "Service status and statistics",
        },
    }))
}

pub(crate) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running",
        authorized_users_count: state.service.count(),
        cache_age_seconds: state.service.age().as_ref().map(Duration::as_secs_f64),
        cache_ttl_seconds: state.service.ttl().as_secs(),
        last_refresh: state.service.last_refresh(),
    })
}

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

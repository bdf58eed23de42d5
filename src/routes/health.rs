//! Liveness endpoint

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;

use super::helpers::{json_response, FullBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// "development" or "production"
    pub mode: &'static str,
    pub timestamp: String,
}

/// GET /health
pub fn health_check(state: &AppState) -> Response<FullBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            mode: if state.args.dev_mode {
                "development"
            } else {
                "production"
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}

pub fn handle_health_request(req: &Request<Bytes>, state: &AppState) -> Option<Response<FullBody>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") | (&Method::GET, "/") => Some(health_check(state)),
        _ => None,
    }
}

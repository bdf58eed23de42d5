//! Shared request and response helpers for the route handlers

use bson::oid::ObjectId;
use bytes::Bytes;
use chrono::NaiveDate;
use http_body_util::Full;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::auth::{extract_token_from_header, Actor};
use crate::server::AppState;
use crate::types::{Result, TrackerError};

pub type FullBody = Full<Bytes>;

/// Standard error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, PATCH, DELETE, OPTIONS",
        )
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub fn error_response(status: StatusCode, error: &str, code: Option<&str>) -> Response<FullBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
            code: code.map(|c| c.to_string()),
        },
    )
}

/// Map a tracker error to its JSON response
pub fn error_from(err: &TrackerError) -> Response<FullBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    }
    error_response(status, &err.to_string(), Some(err.code()))
}

/// Collapse a handler result into a response
pub fn respond(result: Result<Response<FullBody>>) -> Response<FullBody> {
    result.unwrap_or_else(|e| error_from(&e))
}

pub fn no_content() -> Response<FullBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub fn cors_preflight() -> Response<FullBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, PATCH, DELETE, OPTIONS",
        )
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub fn not_found_response(path: &str) -> Response<FullBody> {
    error_response(
        StatusCode::NOT_FOUND,
        &format!("No route for {}", path),
        Some("NOT_FOUND"),
    )
}

pub fn parse_json_body<T: DeserializeOwned>(req: &Request<Bytes>) -> Result<T> {
    serde_json::from_slice(req.body())
        .map_err(|e| TrackerError::InvalidInput(format!("Invalid JSON body: {}", e)))
}

fn get_auth_header(req: &Request<Bytes>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Authenticate the bearer token and return the caller
pub fn require_actor(req: &Request<Bytes>, state: &AppState) -> Result<Actor> {
    let token = extract_token_from_header(get_auth_header(req))
        .ok_or_else(|| TrackerError::Unauthorized("No token provided".into()))?;

    let result = state.users.jwt().verify_token(token);
    match result.claims {
        Some(claims) if result.valid => Actor::from_claims(&claims),
        _ => {
            let reason = result.error.unwrap_or_else(|| "Invalid token".into());
            warn!(reason = %reason, "Rejected bearer token");
            Err(TrackerError::Unauthorized(reason))
        }
    }
}

pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| TrackerError::InvalidInput(format!("Invalid {} id", what)))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| TrackerError::InvalidInput(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

/// `?year=YYYY&month=M`
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}

pub fn parse_month_query(req: &Request<Bytes>) -> Result<MonthQuery> {
    let query = req.uri().query().unwrap_or("");
    serde_urlencoded::from_str(query)
        .map_err(|e| TrackerError::InvalidInput(format!("Invalid month query: {}", e)))
}

/// Non-empty path segments
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("/habits/abc/"), vec!["habits", "abc"]);
        assert!(path_segments("/").is_empty());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-07-08").unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 8).unwrap()
        );
        assert!(matches!(parse_date("08/07/2024"), Err(TrackerError::InvalidInput(_))));
    }

    #[test]
    fn test_month_query() {
        let req = Request::builder()
            .uri("/calendar?year=2024&month=7")
            .body(Bytes::new())
            .unwrap();
        let q = parse_month_query(&req).unwrap();
        assert_eq!((q.year, q.month), (2024, 7));

        let bad = Request::builder()
            .uri("/calendar?year=2024")
            .body(Bytes::new())
            .unwrap();
        assert!(parse_month_query(&bad).is_err());
    }

    #[test]
    fn test_error_from_uses_status_and_code() {
        let resp = error_from(&TrackerError::Forbidden("nope".into()));
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

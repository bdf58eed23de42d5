//! Authentication routes
//!
//! - POST /auth/register - create a user account (role `user`)
//! - POST /auth/login - exchange email and password for a bearer token

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::helpers::{json_response, parse_json_body, respond, FullBody};
use super::users::UserResponse;
use crate::server::AppState;
use crate::types::{Result, TrackerError};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// POST /auth/register
async fn handle_register(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let body: RegisterRequest = parse_json_body(req)?;
    if body.email.is_empty() || body.password.is_empty() {
        return Err(TrackerError::InvalidInput(
            "Missing required fields: email, password".into(),
        ));
    }

    let user = state
        .users
        .register(&body.email, &body.password, body.full_name)
        .await?;
    Ok(json_response(StatusCode::CREATED, &UserResponse::from(&user)))
}

/// POST /auth/login
async fn handle_login(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let body: LoginRequest = parse_json_body(req)?;
    if body.email.is_empty() || body.password.is_empty() {
        return Err(TrackerError::InvalidInput(
            "Missing required fields: email, password".into(),
        ));
    }

    let (_, token) = state.users.login(&body.email, &body.password).await?;
    Ok(json_response(
        StatusCode::OK,
        &TokenResponse {
            access_token: token,
            token_type: "bearer".into(),
            expires_in: state.users.jwt().expiry_seconds(),
        },
    ))
}

pub async fn handle_auth_request(
    req: &Request<Bytes>,
    state: &AppState,
) -> Option<Response<FullBody>> {
    let result = match (req.method(), req.uri().path()) {
        (&Method::POST, "/auth/register") => handle_register(req, state).await,
        (&Method::POST, "/auth/login") => handle_login(req, state).await,
        _ => return None,
    };
    Some(respond(result))
}

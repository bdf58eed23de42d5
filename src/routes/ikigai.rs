//! Ikigai profile routes
//!
//! - POST/GET/PUT /ikigai - the caller's profile
//! - DELETE /ikigai/{user_id} - clear any user's profile (admin)

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};

use super::helpers::{
    json_response, no_content, parse_json_body, parse_object_id, path_segments, require_actor,
    respond, FullBody,
};
use crate::db::schemas::IkigaiProfile;
use crate::server::AppState;
use crate::types::Result;

async fn handle_create(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let profile: IkigaiProfile = parse_json_body(req)?;
    let saved = state.ikigai.create(&actor, profile).await?;
    Ok(json_response(StatusCode::CREATED, &saved))
}

async fn handle_get(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let profile = state.ikigai.get(&actor).await?;
    Ok(json_response(StatusCode::OK, &profile))
}

async fn handle_update(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let profile: IkigaiProfile = parse_json_body(req)?;
    let saved = state.ikigai.update(&actor, profile).await?;
    Ok(json_response(StatusCode::OK, &saved))
}

async fn handle_admin_delete(
    req: &Request<Bytes>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let user_id = parse_object_id(raw_id, "user")?;
    state.ikigai.delete_for_user(&actor, &user_id).await?;
    Ok(no_content())
}

pub async fn handle_ikigai_request(
    req: &Request<Bytes>,
    state: &AppState,
) -> Option<Response<FullBody>> {
    let result = match (req.method(), path_segments(req.uri().path()).as_slice()) {
        (&Method::POST, ["ikigai"]) => handle_create(req, state).await,
        (&Method::GET, ["ikigai"]) => handle_get(req, state).await,
        (&Method::PUT, ["ikigai"]) => handle_update(req, state).await,
        (&Method::DELETE, ["ikigai", user_id]) => handle_admin_delete(req, state, user_id).await,
        _ => return None,
    };
    Some(respond(result))
}

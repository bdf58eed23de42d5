//! Admin routes
//!
//! - GET /admin/user-progress/{user_id} - habit progress report of any user
//! - DELETE /admin/habit/{habit_id} - delete any habit, cascading like an owner delete
//!
//! Role checks happen in the services; a regular user gets 403.

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use tracing::info;

use super::helpers::{
    json_response, no_content, parse_object_id, path_segments, require_actor, respond, FullBody,
};
use crate::server::AppState;
use crate::types::Result;

async fn handle_user_progress(
    req: &Request<Bytes>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    actor.require_admin()?;
    let user_id = parse_object_id(raw_id, "user")?;
    let progress = state.habits.progress_of_user(&actor, &user_id).await?;
    Ok(json_response(StatusCode::OK, &progress))
}

async fn handle_delete_habit(
    req: &Request<Bytes>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    actor.require_admin()?;
    let habit_id = parse_object_id(raw_id, "habit")?;
    state.habits.delete(&actor, &habit_id).await?;
    info!(admin = %actor.user_id, habit_id = %habit_id, "Admin deleted habit");
    Ok(no_content())
}

pub async fn handle_admin_request(
    req: &Request<Bytes>,
    state: &AppState,
) -> Option<Response<FullBody>> {
    let result = match (req.method(), path_segments(req.uri().path()).as_slice()) {
        (&Method::GET, ["admin", "user-progress", id]) => {
            handle_user_progress(req, state, id).await
        }
        (&Method::DELETE, ["admin", "habit", id]) => handle_delete_habit(req, state, id).await,
        _ => return None,
    };
    Some(respond(result))
}

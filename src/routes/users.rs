//! Current user profile
//!
//! - GET /user - the caller's account, including streak and ikigai state

use bytes::Bytes;
use chrono::NaiveDate;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::helpers::{json_response, path_segments, require_actor, respond, FullBody};
use crate::auth::Role;
use crate::db::schemas::{IkigaiProfile, UserDoc};
use crate::server::AppState;
use crate::types::Result;

/// Public view of a user; never carries the password hash
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub streak: u32,
    pub last_completed_date: Option<NaiveDate>,
    pub ikigai_quiz_done: bool,
    pub ikigai: Option<IkigaiProfile>,
    pub created_at: String,
}

impl From<&UserDoc> for UserResponse {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user._id.map(|id| id.to_hex()).unwrap_or_default(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            streak: user.streak,
            last_completed_date: user.last_completed_date,
            ikigai_quiz_done: user.ikigai_quiz_done,
            ikigai: user.ikigai.clone(),
            created_at: user.metadata.created_at_rfc3339(),
        }
    }
}

/// GET /user
async fn handle_me(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let user = state.users.me(&actor).await?;
    Ok(json_response(StatusCode::OK, &UserResponse::from(&user)))
}

pub async fn handle_user_request(
    req: &Request<Bytes>,
    state: &AppState,
) -> Option<Response<FullBody>> {
    let result = match (req.method(), path_segments(req.uri().path()).as_slice()) {
        (&Method::GET, ["user"]) => handle_me(req, state).await,
        _ => return None,
    };
    Some(respond(result))
}

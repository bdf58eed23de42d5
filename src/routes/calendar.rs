//! GET /calendar?year=&month= - month calendar of the caller's completions

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};

use super::helpers::{json_response, parse_month_query, require_actor, respond, FullBody};
use crate::server::AppState;
use crate::types::Result;

async fn handle_month(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let query = parse_month_query(req)?;
    let calendar = state.calendar.month(&actor, query.year, query.month).await?;
    Ok(json_response(StatusCode::OK, &calendar))
}

pub async fn handle_calendar_request(
    req: &Request<Bytes>,
    state: &AppState,
) -> Option<Response<FullBody>> {
    match (req.method(), req.uri().path().trim_end_matches('/')) {
        (&Method::GET, "/calendar") => Some(respond(handle_month(req, state).await)),
        _ => None,
    }
}

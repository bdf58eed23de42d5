//! Journal routes
//!
//! - POST /journal/entry - append an entry dated today (UTC)
//! - GET /journal/entry/{YYYY-MM-DD} - first entry of a day, or null
//! - GET /journal/entries - every entry
//! - GET /journal/question - question of the day

use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::helpers::{
    json_response, parse_date, parse_json_body, path_segments, require_actor, respond, FullBody,
};
use crate::server::AppState;
use crate::services::question_for;
use crate::types::Result;

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    #[serde(default)]
    pub entry: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub date: NaiveDate,
    pub question: String,
}

async fn handle_add_entry(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let body: EntryRequest = parse_json_body(req)?;
    let today = Utc::now().date_naive();
    let entry = state.journal.add_entry(&actor, &body.entry, today).await?;
    Ok(json_response(StatusCode::CREATED, &entry))
}

async fn handle_entry_for_day(
    req: &Request<Bytes>,
    state: &AppState,
    raw_date: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let date = parse_date(raw_date)?;
    let entry = state.journal.entry_for_day(&actor, date).await?;
    Ok(json_response(StatusCode::OK, &entry))
}

async fn handle_entries(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let entries = state.journal.entries(&actor).await?;
    Ok(json_response(StatusCode::OK, &entries))
}

async fn handle_question(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    require_actor(req, state)?;
    let today = Utc::now().date_naive();
    Ok(json_response(
        StatusCode::OK,
        &QuestionResponse {
            date: today,
            question: question_for(today).to_string(),
        },
    ))
}

pub async fn handle_journal_request(
    req: &Request<Bytes>,
    state: &AppState,
) -> Option<Response<FullBody>> {
    let result = match (req.method(), path_segments(req.uri().path()).as_slice()) {
        (&Method::POST, ["journal", "entry"]) => handle_add_entry(req, state).await,
        (&Method::GET, ["journal", "entry", day]) => handle_entry_for_day(req, state, day).await,
        (&Method::GET, ["journal", "entries"]) => handle_entries(req, state).await,
        (&Method::GET, ["journal", "question"]) => handle_question(req, state).await,
        _ => return None,
    };
    Some(respond(result))
}

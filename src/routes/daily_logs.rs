//! Daily log routes
//!
//! - POST/GET /daily-logs - log a day for an owned habit / list own logs
//! - PUT/DELETE /daily-logs/{id} - owner only

use bytes::Bytes;
use chrono::NaiveDate;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::helpers::{
    json_response, no_content, parse_json_body, parse_object_id, path_segments, require_actor,
    respond, FullBody,
};
use crate::db::schemas::DailyLogDoc;
use crate::server::AppState;
use crate::services::DailyLogUpdate;
use crate::types::Result;

#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    pub habit_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyLogResponse {
    pub id: String,
    pub user_id: String,
    pub habit_id: String,
    pub date: NaiveDate,
    pub completed: bool,
    pub notes: Option<String>,
}

impl From<&DailyLogDoc> for DailyLogResponse {
    fn from(log: &DailyLogDoc) -> Self {
        Self {
            id: log._id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: log.user_id.to_hex(),
            habit_id: log.habit_id.to_hex(),
            date: log.date,
            completed: log.completed,
            notes: log.notes.clone(),
        }
    }
}

async fn handle_create(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let body: CreateLogRequest = parse_json_body(req)?;
    let habit_id = parse_object_id(&body.habit_id, "habit")?;
    let log = state
        .daily_logs
        .create(&actor, habit_id, body.date, body.completed, body.notes)
        .await?;
    Ok(json_response(StatusCode::CREATED, &DailyLogResponse::from(&log)))
}

async fn handle_list(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let logs = state.daily_logs.list(&actor).await?;
    let body: Vec<DailyLogResponse> = logs.iter().map(DailyLogResponse::from).collect();
    Ok(json_response(StatusCode::OK, &body))
}

async fn handle_update(
    req: &Request<Bytes>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let id = parse_object_id(raw_id, "daily log")?;
    let update: DailyLogUpdate = parse_json_body(req)?;
    let log = state.daily_logs.update(&actor, &id, update).await?;
    Ok(json_response(StatusCode::OK, &DailyLogResponse::from(&log)))
}

async fn handle_delete(
    req: &Request<Bytes>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let id = parse_object_id(raw_id, "daily log")?;
    state.daily_logs.delete(&actor, &id).await?;
    Ok(no_content())
}

pub async fn handle_daily_logs_request(
    req: &Request<Bytes>,
    state: &AppState,
) -> Option<Response<FullBody>> {
    let result = match (req.method(), path_segments(req.uri().path()).as_slice()) {
        (&Method::POST, ["daily-logs"]) => handle_create(req, state).await,
        (&Method::GET, ["daily-logs"]) => handle_list(req, state).await,
        (&Method::PUT, ["daily-logs", id]) => handle_update(req, state, id).await,
        (&Method::DELETE, ["daily-logs", id]) => handle_delete(req, state, id).await,
        _ => return None,
    };
    Some(respond(result))
}

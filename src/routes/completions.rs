//! Daily completion routes
//!
//! - POST /daily-completions - get or create the record for a date
//! - PATCH /daily-completions/update-progress - set one habit's progress
//! - GET /daily-completions?year=&month= - the caller's records for a month
//! - GET/DELETE /daily-completions/{YYYY-MM-DD}

use bytes::Bytes;
use chrono::NaiveDate;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::helpers::{
    json_response, no_content, parse_date, parse_json_body, parse_month_query, parse_object_id,
    path_segments, require_actor, respond, FullBody,
};
use crate::db::schemas::{CompletionEntry, DailyCompletionDoc, Goal};
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionEntryResponse {
    pub habit_id: String,
    pub title: String,
    pub goal: Goal,
    pub progress: f64,
    pub percentage: f64,
    pub completed: bool,
}

impl From<&CompletionEntry> for CompletionEntryResponse {
    fn from(e: &CompletionEntry) -> Self {
        Self {
            habit_id: e.habit_id.to_hex(),
            title: e.title.clone(),
            goal: e.goal.clone(),
            progress: e.progress,
            percentage: e.percentage,
            completed: e.completed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyCompletionResponse {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub completions: Vec<CompletionEntryResponse>,
    pub overall_percentage: f64,
    pub day_completed: bool,
}

impl From<&DailyCompletionDoc> for DailyCompletionResponse {
    fn from(d: &DailyCompletionDoc) -> Self {
        Self {
            id: d._id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: d.user_id.to_hex(),
            date: d.date,
            completions: d.completions.iter().map(CompletionEntryResponse::from).collect(),
            overall_percentage: d.overall_percentage,
            day_completed: d.day_completed,
        }
    }
}

/// Body of POST /daily-completions: a bare date string or `{"date": ...}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateBody {
    Bare(NaiveDate),
    Wrapped { date: NaiveDate },
}

impl DateBody {
    fn date(&self) -> NaiveDate {
        match self {
            Self::Bare(date) | Self::Wrapped { date } => *date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    pub habit_id: String,
    pub date: NaiveDate,
    pub progress: f64,
}

async fn handle_get_or_create(
    req: &Request<Bytes>,
    state: &AppState,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let body: DateBody = parse_json_body(req)?;
    let completion = state.completions.get_or_create(&actor, body.date()).await?;
    Ok(json_response(
        StatusCode::OK,
        &DailyCompletionResponse::from(&completion),
    ))
}

async fn handle_update_progress(
    req: &Request<Bytes>,
    state: &AppState,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let body: UpdateProgressRequest = parse_json_body(req)?;
    let habit_id = parse_object_id(&body.habit_id, "habit")?;
    let completion = state
        .completions
        .update_progress(&actor, body.date, habit_id, body.progress)
        .await?;
    Ok(json_response(
        StatusCode::OK,
        &DailyCompletionResponse::from(&completion),
    ))
}

async fn handle_list_month(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let query = parse_month_query(req)?;
    let records = state
        .completions
        .list_by_month(&actor, query.year, query.month)
        .await?;
    let body: Vec<DailyCompletionResponse> =
        records.iter().map(DailyCompletionResponse::from).collect();
    Ok(json_response(StatusCode::OK, &body))
}

async fn handle_get_by_date(
    req: &Request<Bytes>,
    state: &AppState,
    raw_date: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let date = parse_date(raw_date)?;
    let completion = state.completions.get_by_date(&actor, date).await?;
    Ok(json_response(
        StatusCode::OK,
        &DailyCompletionResponse::from(&completion),
    ))
}

async fn handle_delete(
    req: &Request<Bytes>,
    state: &AppState,
    raw_date: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let date = parse_date(raw_date)?;
    state.completions.delete(&actor, date).await?;
    Ok(no_content())
}

pub async fn handle_completions_request(
    req: &Request<Bytes>,
    state: &AppState,
) -> Option<Response<FullBody>> {
    let result = match (req.method(), path_segments(req.uri().path()).as_slice()) {
        (&Method::POST, ["daily-completions"]) => handle_get_or_create(req, state).await,
        (&Method::GET, ["daily-completions"]) => handle_list_month(req, state).await,
        (&Method::PATCH, ["daily-completions", "update-progress"]) => {
            handle_update_progress(req, state).await
        }
        (&Method::GET, ["daily-completions", day]) => handle_get_by_date(req, state, day).await,
        (&Method::DELETE, ["daily-completions", day]) => handle_delete(req, state, day).await,
        _ => return None,
    };
    Some(respond(result))
}

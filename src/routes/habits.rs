//! Habit routes
//!
//! - POST/GET /habits - create / list the caller's habits
//! - PUT/DELETE /habits/{id} - update / delete (owner or admin)
//! - GET /habits/progress - per-habit daily-log completion rates
//! - GET/POST /habits/templates - list templates / create one (admin)
//! - PATCH/DELETE /habits/templates/{id} - admin only

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::helpers::{
    json_response, no_content, parse_json_body, parse_object_id, path_segments, require_actor,
    respond, FullBody,
};
use crate::db::schemas::{Goal, HabitDoc, HabitTemplateDoc, IkigaiCategory};
use crate::server::AppState;
use crate::services::{HabitInput, TemplateInput, TemplatePatch};
use crate::types::Result;

#[derive(Debug, Serialize, Deserialize)]
pub struct HabitResponse {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub icon: String,
    pub color: String,
    pub group: Option<String>,
    #[serde(rename = "type")]
    pub habit_type: String,
    pub ikigai_category: Option<IkigaiCategory>,
    pub goal: Goal,
    pub task_days: Vec<String>,
    pub reminders: Vec<String>,
    pub created_at: String,
}

impl From<&HabitDoc> for HabitResponse {
    fn from(h: &HabitDoc) -> Self {
        Self {
            id: h._id.map(|id| id.to_hex()).unwrap_or_default(),
            owner_id: h.owner_id.to_hex(),
            title: h.title.clone(),
            description: h.description.clone(),
            icon: h.icon.clone(),
            color: h.color.clone(),
            group: h.group.clone(),
            habit_type: h.habit_type.clone(),
            ikigai_category: h.ikigai_category,
            goal: h.goal.clone(),
            task_days: h.task_days.clone(),
            reminders: h.reminders.clone(),
            created_at: h.metadata.created_at_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TemplateResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub icon: String,
    pub color: String,
    pub group: Option<String>,
    #[serde(rename = "type")]
    pub habit_type: String,
    pub ikigai_category: Option<IkigaiCategory>,
    pub goal: Goal,
    pub task_days: Vec<String>,
    pub reminders: Vec<String>,
    pub published: bool,
}

impl From<&HabitTemplateDoc> for TemplateResponse {
    fn from(t: &HabitTemplateDoc) -> Self {
        Self {
            id: t._id.map(|id| id.to_hex()).unwrap_or_default(),
            title: t.title.clone(),
            description: t.description.clone(),
            icon: t.icon.clone(),
            color: t.color.clone(),
            group: t.group.clone(),
            habit_type: t.habit_type.clone(),
            ikigai_category: t.ikigai_category,
            goal: t.goal.clone(),
            task_days: t.task_days.clone(),
            reminders: t.reminders.clone(),
            published: t.published,
        }
    }
}

async fn handle_create_habit(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let input: HabitInput = parse_json_body(req)?;
    let habit = state.habits.create(&actor, input).await?;
    Ok(json_response(StatusCode::CREATED, &HabitResponse::from(&habit)))
}

async fn handle_list_habits(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let habits = state.habits.list(&actor).await?;
    let body: Vec<HabitResponse> = habits.iter().map(HabitResponse::from).collect();
    Ok(json_response(StatusCode::OK, &body))
}

async fn handle_update_habit(
    req: &Request<Bytes>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let id = parse_object_id(raw_id, "habit")?;
    let input: HabitInput = parse_json_body(req)?;
    let habit = state.habits.update(&actor, &id, input).await?;
    Ok(json_response(StatusCode::OK, &HabitResponse::from(&habit)))
}

async fn handle_delete_habit(
    req: &Request<Bytes>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let id = parse_object_id(raw_id, "habit")?;
    state.habits.delete(&actor, &id).await?;
    Ok(no_content())
}

async fn handle_progress(req: &Request<Bytes>, state: &AppState) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let progress = state.habits.progress(&actor).await?;
    Ok(json_response(StatusCode::OK, &progress))
}

async fn handle_list_templates(
    req: &Request<Bytes>,
    state: &AppState,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let templates = state.templates.list(&actor).await?;
    let body: Vec<TemplateResponse> = templates.iter().map(TemplateResponse::from).collect();
    Ok(json_response(StatusCode::OK, &body))
}

async fn handle_create_template(
    req: &Request<Bytes>,
    state: &AppState,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let input: TemplateInput = parse_json_body(req)?;
    let template = state.templates.create(&actor, input).await?;
    Ok(json_response(StatusCode::CREATED, &TemplateResponse::from(&template)))
}

async fn handle_patch_template(
    req: &Request<Bytes>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let id = parse_object_id(raw_id, "template")?;
    let patch: TemplatePatch = parse_json_body(req)?;
    let template = state.templates.patch(&actor, &id, patch).await?;
    Ok(json_response(StatusCode::OK, &TemplateResponse::from(&template)))
}

async fn handle_delete_template(
    req: &Request<Bytes>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<FullBody>> {
    let actor = require_actor(req, state)?;
    let id = parse_object_id(raw_id, "template")?;
    state.templates.delete(&actor, &id).await?;
    Ok(no_content())
}

pub async fn handle_habits_request(
    req: &Request<Bytes>,
    state: &AppState,
) -> Option<Response<FullBody>> {
    let result = match (req.method(), path_segments(req.uri().path()).as_slice()) {
        (&Method::POST, ["habits"]) => handle_create_habit(req, state).await,
        (&Method::GET, ["habits"]) => handle_list_habits(req, state).await,
        (&Method::GET, ["habits", "progress"]) => handle_progress(req, state).await,
        (&Method::GET, ["habits", "templates"]) => handle_list_templates(req, state).await,
        (&Method::POST, ["habits", "templates"]) => handle_create_template(req, state).await,
        (&Method::PATCH, ["habits", "templates", id]) => {
            handle_patch_template(req, state, id).await
        }
        (&Method::DELETE, ["habits", "templates", id]) => {
            handle_delete_template(req, state, id).await
        }
        (&Method::PUT, ["habits", id]) => handle_update_habit(req, state, id).await,
        (&Method::DELETE, ["habits", id]) => handle_delete_habit(req, state, id).await,
        _ => return None,
    };
    Some(respond(result))
}

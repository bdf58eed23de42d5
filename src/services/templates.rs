//! Admin-curated habit templates

use bson::oid::ObjectId;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::Actor;
use crate::db::schemas::{normalize_task_days, Goal, HabitTemplateDoc, IkigaiCategory, Metadata};
use crate::store::TemplateStore;
use crate::types::{Result, TrackerError};

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(rename = "type", default)]
    pub habit_type: String,
    #[serde(default)]
    pub ikigai_category: Option<IkigaiCategory>,
    pub goal: Goal,
    #[serde(default)]
    pub task_days: Vec<String>,
    #[serde(default)]
    pub reminders: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub group: Option<String>,
    #[serde(rename = "type")]
    pub habit_type: Option<String>,
    pub ikigai_category: Option<IkigaiCategory>,
    pub goal: Option<Goal>,
    pub task_days: Option<Vec<String>>,
    pub reminders: Option<Vec<String>>,
    pub published: Option<bool>,
}

pub struct TemplateService {
    templates: Arc<dyn TemplateStore>,
}

impl TemplateService {
    pub fn new(templates: Arc<dyn TemplateStore>) -> Self {
        Self { templates }
    }

    /// Published templates; admins also see drafts
    pub async fn list(&self, actor: &Actor) -> Result<Vec<HabitTemplateDoc>> {
        self.templates.list(!actor.is_admin()).await
    }

    pub async fn create(&self, actor: &Actor, input: TemplateInput) -> Result<HabitTemplateDoc> {
        actor.require_admin()?;
        if input.title.trim().is_empty() {
            return Err(TrackerError::InvalidInput("Template title is required".into()));
        }
        let task_days = normalize_task_days(&input.task_days)?;

        let template = self
            .templates
            .insert(HabitTemplateDoc {
                _id: None,
                metadata: Metadata::new(),
                title: input.title.trim().to_string(),
                description: input.description,
                icon: input.icon,
                color: input.color,
                group: input.group,
                habit_type: input.habit_type,
                ikigai_category: input.ikigai_category,
                goal: input.goal,
                task_days,
                reminders: input.reminders,
                published: input.published,
            })
            .await?;

        info!(title = %template.title, published = template.published, "Created habit template");
        Ok(template)
    }

    pub async fn patch(
        &self,
        actor: &Actor,
        id: &ObjectId,
        patch: TemplatePatch,
    ) -> Result<HabitTemplateDoc> {
        actor.require_admin()?;
        let mut template = self
            .templates
            .get(id)
            .await?
            .ok_or_else(|| TrackerError::NotFound("Template not found".into()))?;

        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(TrackerError::InvalidInput("Template title is required".into()));
            }
            template.title = title.trim().to_string();
        }
        if let Some(days) = patch.task_days {
            template.task_days = normalize_task_days(&days)?;
        }
        if patch.description.is_some() {
            template.description = patch.description;
        }
        if let Some(icon) = patch.icon {
            template.icon = icon;
        }
        if let Some(color) = patch.color {
            template.color = color;
        }
        if patch.group.is_some() {
            template.group = patch.group;
        }
        if let Some(habit_type) = patch.habit_type {
            template.habit_type = habit_type;
        }
        if patch.ikigai_category.is_some() {
            template.ikigai_category = patch.ikigai_category;
        }
        if let Some(goal) = patch.goal {
            template.goal = goal;
        }
        if let Some(reminders) = patch.reminders {
            template.reminders = reminders;
        }
        if let Some(published) = patch.published {
            template.published = published;
        }

        if !self.templates.replace(template.clone()).await? {
            return Err(TrackerError::NotFound("Template not found".into()));
        }
        Ok(template)
    }

    pub async fn delete(&self, actor: &Actor, id: &ObjectId) -> Result<()> {
        actor.require_admin()?;
        if !self.templates.delete(id).await? {
            return Err(TrackerError::NotFound("Template not found".into()));
        }
        info!(template_id = %id, "Deleted habit template");
        Ok(())
    }
}

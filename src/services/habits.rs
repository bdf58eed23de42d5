//! Habit CRUD, the delete cascade and daily-log progress reports

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::auth::Actor;
use crate::db::schemas::{normalize_task_days, Goal, HabitDoc, IkigaiCategory, Metadata};
use crate::store::{DailyLogStore, HabitStore, UserStore};
use crate::tracking::CompletionService;
use crate::types::{Result, TrackerError};

/// Client-supplied habit fields, used for both create and update
#[derive(Debug, Clone, Deserialize)]
pub struct HabitInput {
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
}

impl HabitInput {
    fn validate(&self) -> Result<Vec<String>> {
        if self.title.trim().is_empty() {
            return Err(TrackerError::InvalidInput("Habit title is required".into()));
        }
        normalize_task_days(&self.task_days)
    }

    fn into_doc(self, owner_id: ObjectId, task_days: Vec<String>) -> HabitDoc {
        HabitDoc {
            _id: None,
            metadata: Metadata::new(),
            owner_id,
            title: self.title.trim().to_string(),
            description: self.description,
            icon: self.icon,
            color: self.color,
            group: self.group,
            habit_type: self.habit_type,
            ikigai_category: Some(self.ikigai_category.unwrap_or_default()),
            goal: self.goal,
            task_days,
            reminders: self.reminders,
        }
    }
}

/// Daily-log completion rate of one habit
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HabitProgress {
    pub habit_id: String,
    pub title: String,
    pub total_days: u64,
    pub completed_days: u64,
    /// Percentage in 0..=100, 0.0 when there are no logs
    pub completion_rate: f64,
}

pub struct HabitService {
    habits: Arc<dyn HabitStore>,
    daily_logs: Arc<dyn DailyLogStore>,
    users: Arc<dyn UserStore>,
    completions: Arc<CompletionService>,
}

impl HabitService {
    pub fn new(
        habits: Arc<dyn HabitStore>,
        daily_logs: Arc<dyn DailyLogStore>,
        users: Arc<dyn UserStore>,
        completions: Arc<CompletionService>,
    ) -> Self {
        Self {
            habits,
            daily_logs,
            users,
            completions,
        }
    }

    pub async fn create(&self, actor: &Actor, input: HabitInput) -> Result<HabitDoc> {
        let task_days = input.validate()?;
        let habit = self
            .habits
            .insert(input.into_doc(actor.user_id, task_days))
            .await?;
        info!(user_id = %actor.user_id, title = %habit.title, "Created habit");
        Ok(habit)
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<HabitDoc>> {
        self.habits.list_by_owner(&actor.user_id).await
    }

    /// Load a habit the caller may modify
    async fn load_for_change(&self, actor: &Actor, id: &ObjectId) -> Result<HabitDoc> {
        let habit = self
            .habits
            .get(id)
            .await?
            .ok_or_else(|| TrackerError::NotFound("Habit not found".into()))?;
        if !actor.can_act_on(&habit.owner_id) {
            return Err(TrackerError::Forbidden(
                "Only the owner or an admin may change this habit".into(),
            ));
        }
        Ok(habit)
    }

    /// Replace a habit's fields. Snapshots already taken into daily
    /// completions are not rewritten.
    pub async fn update(&self, actor: &Actor, id: &ObjectId, input: HabitInput) -> Result<HabitDoc> {
        let existing = self.load_for_change(actor, id).await?;
        let task_days = input.validate()?;

        let mut updated = input.into_doc(existing.owner_id, task_days);
        updated._id = existing._id;
        updated.metadata = existing.metadata;

        if !self.habits.replace(updated.clone()).await? {
            return Err(TrackerError::NotFound("Habit not found".into()));
        }
        info!(habit_id = %id, by = %actor.user_id, "Updated habit");
        Ok(updated)
    }

    /// Delete a habit and strip it from the owner's daily completions and logs
    pub async fn delete(&self, actor: &Actor, id: &ObjectId) -> Result<()> {
        let habit = self.load_for_change(actor, id).await?;

        if !self.habits.delete(id).await? {
            return Err(TrackerError::NotFound("Habit not found".into()));
        }

        let days = self.completions.remove_habit(habit.owner_id, *id).await?;
        let logs = self.daily_logs.delete_by_habit(id).await?;

        info!(
            habit_id = %id,
            owner_id = %habit.owner_id,
            by = %actor.user_id,
            days,
            logs,
            "Deleted habit"
        );
        Ok(())
    }

    /// Completion rates of the caller's habits
    pub async fn progress(&self, actor: &Actor) -> Result<Vec<HabitProgress>> {
        self.progress_for_user(&actor.user_id).await
    }

    /// Completion rates of any user's habits (admin only)
    pub async fn progress_of_user(
        &self,
        actor: &Actor,
        user_id: &ObjectId,
    ) -> Result<Vec<HabitProgress>> {
        actor.require_admin()?;
        if self.users.get(user_id).await?.is_none() {
            return Err(TrackerError::NotFound("User not found".into()));
        }
        self.progress_for_user(user_id).await
    }

    async fn progress_for_user(&self, user_id: &ObjectId) -> Result<Vec<HabitProgress>> {
        let habits = self.habits.list_by_owner(user_id).await?;
        let logs = self.daily_logs.list_by_user(user_id).await?;

        let mut counts: HashMap<ObjectId, (u64, u64)> = HashMap::new();
        for log in &logs {
            let slot = counts.entry(log.habit_id).or_default();
            slot.0 += 1;
            if log.completed {
                slot.1 += 1;
            }
        }

        Ok(habits
            .into_iter()
            .filter_map(|h| {
                let id = h._id?;
                let (total, completed) = counts.get(&id).copied().unwrap_or((0, 0));
                let rate = if total == 0 {
                    0.0
                } else {
                    completed as f64 / total as f64 * 100.0
                };
                Some(HabitProgress {
                    habit_id: id.to_hex(),
                    title: h.title,
                    total_days: total,
                    completed_days: completed,
                    completion_rate: rate,
                })
            })
            .collect())
    }
}

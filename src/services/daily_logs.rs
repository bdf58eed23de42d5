//! Per-habit done/not-done logs

use bson::oid::ObjectId;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::Actor;
use crate::db::schemas::{DailyLogDoc, Metadata};
use crate::store::{DailyLogStore, HabitStore};
use crate::types::{Result, TrackerError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyLogUpdate {
    pub date: Option<NaiveDate>,
    pub completed: Option<bool>,
    pub notes: Option<String>,
}

pub struct DailyLogService {
    logs: Arc<dyn DailyLogStore>,
    habits: Arc<dyn HabitStore>,
}

impl DailyLogService {
    pub fn new(logs: Arc<dyn DailyLogStore>, habits: Arc<dyn HabitStore>) -> Self {
        Self { logs, habits }
    }

    /// Log a day for one of the caller's habits
    pub async fn create(
        &self,
        actor: &Actor,
        habit_id: ObjectId,
        date: NaiveDate,
        completed: bool,
        notes: Option<String>,
    ) -> Result<DailyLogDoc> {
        match self.habits.get(&habit_id).await? {
            Some(habit) if habit.owner_id == actor.user_id => {}
            _ => return Err(TrackerError::NotFound("Habit not found".into())),
        }

        let log = self
            .logs
            .insert(DailyLogDoc {
                _id: None,
                metadata: Metadata::new(),
                user_id: actor.user_id,
                habit_id,
                date,
                completed,
                notes,
            })
            .await?;
        info!(user_id = %actor.user_id, habit_id = %habit_id, date = %date, "Logged habit day");
        Ok(log)
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<DailyLogDoc>> {
        self.logs.list_by_user(&actor.user_id).await
    }

    async fn load_owned(&self, actor: &Actor, id: &ObjectId) -> Result<DailyLogDoc> {
        let log = self
            .logs
            .get(id)
            .await?
            .ok_or_else(|| TrackerError::NotFound("Daily log not found".into()))?;
        if log.user_id != actor.user_id {
            return Err(TrackerError::Forbidden("Daily log belongs to another user".into()));
        }
        Ok(log)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: &ObjectId,
        update: DailyLogUpdate,
    ) -> Result<DailyLogDoc> {
        let mut log = self.load_owned(actor, id).await?;

        if let Some(date) = update.date {
            log.date = date;
        }
        if let Some(completed) = update.completed {
            log.completed = completed;
        }
        if update.notes.is_some() {
            log.notes = update.notes;
        }

        if !self.logs.replace(log.clone()).await? {
            return Err(TrackerError::NotFound("Daily log not found".into()));
        }
        Ok(log)
    }

    pub async fn delete(&self, actor: &Actor, id: &ObjectId) -> Result<()> {
        self.load_owned(actor, id).await?;
        if !self.logs.delete(id).await? {
            return Err(TrackerError::NotFound("Daily log not found".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::schemas::HabitDoc;
    use crate::store::{MemoryDailyLogStore, MemoryHabitStore};

    #[tokio::test]
    async fn test_log_ownership() {
        let habits = Arc::new(MemoryHabitStore::new());
        let svc = DailyLogService::new(Arc::new(MemoryDailyLogStore::new()), habits.clone());
        let owner = Actor::new(ObjectId::new(), Role::User);
        let other = Actor::new(ObjectId::new(), Role::User);
        let habit_id = habits
            .insert(HabitDoc {
                owner_id: owner.user_id,
                title: "Walk".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            ._id
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 7, 8).unwrap();

        assert!(matches!(
            svc.create(&other, habit_id, day, true, None).await,
            Err(TrackerError::NotFound(_))
        ));

        let log = svc.create(&owner, habit_id, day, false, None).await.unwrap();
        let log_id = log._id.unwrap();

        assert!(matches!(
            svc.update(&other, &log_id, DailyLogUpdate::default()).await,
            Err(TrackerError::Forbidden(_))
        ));
        let updated = svc
            .update(
                &owner,
                &log_id,
                DailyLogUpdate {
                    completed: Some(true),
                    notes: Some("5km".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.notes.as_deref(), Some("5km"));

        assert!(matches!(
            svc.delete(&other, &log_id).await,
            Err(TrackerError::Forbidden(_))
        ));
        svc.delete(&owner, &log_id).await.unwrap();
        assert!(svc.list(&owner).await.unwrap().is_empty());
    }
}

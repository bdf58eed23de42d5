//! Month calendar derived from daily completions

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Actor;
use crate::tracking::CompletionService;
use crate::types::Result;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarDay {
    pub day: NaiveDate,
    pub completed_count: usize,
    pub total_habits: usize,
    /// completed / total, 0.0 for a day with no habits
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthCalendar {
    pub user_id: String,
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

pub struct CalendarService {
    completions: Arc<CompletionService>,
}

impl CalendarService {
    pub fn new(completions: Arc<CompletionService>) -> Self {
        Self { completions }
    }

    pub async fn month(&self, actor: &Actor, year: i32, month: u32) -> Result<MonthCalendar> {
        let records = self.completions.list_by_month(actor, year, month).await?;

        let days = records
            .iter()
            .map(|c| {
                let total = c.completions.len();
                let completed = c.completed_count();
                CalendarDay {
                    day: c.date,
                    completed_count: completed,
                    total_habits: total,
                    completion_rate: if total == 0 {
                        0.0
                    } else {
                        completed as f64 / total as f64
                    },
                }
            })
            .collect();

        Ok(MonthCalendar {
            user_id: actor.user_id.to_hex(),
            year,
            month,
            days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::schemas::{Goal, HabitDoc};
    use crate::store::Stores;
    use crate::tracking::StreakReconciler;
    use bson::oid::ObjectId;

    #[tokio::test]
    async fn test_month_stats() {
        let stores = Stores::memory();
        let actor = Actor::new(ObjectId::new(), Role::User);
        let completions = Arc::new(CompletionService::new(
            stores.habits.clone(),
            stores.completions.clone(),
            Arc::new(StreakReconciler::new(stores.users.clone())),
        ));
        let calendar = CalendarService::new(completions.clone());

        for title in ["Water", "Read"] {
            stores
                .habits
                .insert(HabitDoc {
                    owner_id: actor.user_id,
                    title: title.into(),
                    goal: Goal {
                        target: 1,
                        ..Default::default()
                    },
                    task_days: vec!["Mon".into()],
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let monday = NaiveDate::from_ymd_opt(2024, 7, 8).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 7, 14).unwrap();
        let day = completions.get_or_create(&actor, monday).await.unwrap();
        completions
            .update_progress(&actor, monday, day.completions[0].habit_id, 1.0)
            .await
            .unwrap();
        completions.get_or_create(&actor, sunday).await.unwrap();

        let month = calendar.month(&actor, 2024, 7).await.unwrap();
        assert_eq!(month.days.len(), 2);
        assert_eq!(month.days[0].day, monday);
        assert_eq!(month.days[0].completed_count, 1);
        assert_eq!(month.days[0].total_habits, 2);
        assert_eq!(month.days[0].completion_rate, 0.5);
        assert_eq!(month.days[1].completion_rate, 0.0);
    }
}

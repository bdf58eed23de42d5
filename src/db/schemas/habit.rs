//! Habit document schema
//!
//! A habit is a user-owned recurring activity with a [`Goal`] and the
//! weekdays it is scheduled on. Weekdays are stored as English three-letter
//! codes (`Mon` .. `Sun`) so a single array-membership query finds the
//! habits due on a given date.

use bson::{doc, oid::ObjectId, Document};
use chrono::Weekday;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::TrackerError;

/// Collection name for habits
pub const HABIT_COLLECTION: &str = "habits";

/// Valid weekday codes in calendar order
pub const WEEKDAY_CODES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Goal period
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    #[default]
    #[serde(alias = "day")]
    Daily,
    #[serde(alias = "week")]
    Weekly,
    #[serde(alias = "month")]
    Monthly,
}

/// Quantified target for a habit, e.g. 8 glasses of water per day
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Goal {
    pub period: GoalPeriod,
    #[serde(rename = "type")]
    pub goal_type: String,
    pub target: i64,
    pub unit: String,
}

impl Goal {
    /// Target used as a divisor. Non-positive targets count as 1.
    pub fn effective_target(&self) -> f64 {
        if self.target > 0 {
            self.target as f64
        } else {
            1.0
        }
    }
}

/// Ikigai quadrant a habit contributes to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IkigaiCategory {
    Passion,
    Vocation,
    #[default]
    Mission,
    Profession,
}

/// Habit document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct HabitDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub owner_id: ObjectId,
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
    /// Weekday codes this habit is scheduled on
    #[serde(default)]
    pub task_days: Vec<String>,
    #[serde(default)]
    pub reminders: Vec<String>,
}

/// Three-letter code for a weekday
pub fn weekday_code(weekday: Weekday) -> &'static str {
    WEEKDAY_CODES[weekday.num_days_from_monday() as usize]
}

/// Reject unknown weekday codes and drop duplicates, keeping calendar order
pub fn normalize_task_days(days: &[String]) -> Result<Vec<String>, TrackerError> {
    if let Some(bad) = days.iter().find(|d| !WEEKDAY_CODES.contains(&d.as_str())) {
        return Err(TrackerError::InvalidInput(format!(
            "Unknown weekday '{}', expected one of {}",
            bad,
            WEEKDAY_CODES.join(", ")
        )));
    }

    Ok(WEEKDAY_CODES
        .iter()
        .filter(|code| days.iter().any(|d| d == *code))
        .map(|code| code.to_string())
        .collect())
}

impl IntoIndexes for HabitDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "owner_id": 1, "task_days": 1 },
            Some(
                IndexOptions::builder()
                    .name("owner_task_days_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for HabitDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};

    #[test]
    fn test_weekday_code() {
        let monday = NaiveDate::from_ymd_opt(2024, 7, 8).unwrap();
        assert_eq!(weekday_code(monday.weekday()), "Mon");
        assert_eq!(weekday_code(Weekday::Sun), "Sun");
    }

    #[test]
    fn test_normalize_task_days() {
        let days = vec!["Fri".to_string(), "Mon".to_string(), "Fri".to_string()];
        assert_eq!(normalize_task_days(&days).unwrap(), vec!["Mon", "Fri"]);

        let bad = vec!["monday".to_string()];
        assert!(matches!(
            normalize_task_days(&bad),
            Err(TrackerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_effective_target() {
        let mut goal = Goal {
            target: 8,
            ..Default::default()
        };
        assert_eq!(goal.effective_target(), 8.0);
        goal.target = 0;
        assert_eq!(goal.effective_target(), 1.0);
        goal.target = -3;
        assert_eq!(goal.effective_target(), 1.0);
    }

    #[test]
    fn test_goal_period_aliases() {
        let goal: Goal =
            serde_json::from_str(r#"{"period":"day","type":"count","target":8,"unit":"glasses"}"#)
                .unwrap();
        assert_eq!(goal.period, GoalPeriod::Daily);
        assert_eq!(serde_json::to_value(goal.period).unwrap(), "daily");
    }
}

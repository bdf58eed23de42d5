//! Daily completion document schema
//!
//! One document per `(user_id, date)` aggregating the per-habit progress of
//! that day. `title` and `goal` on each entry are snapshots taken when the
//! entry was created and are never rewritten by later habit edits.

use bson::{doc, oid::ObjectId, Document};
use chrono::NaiveDate;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{Goal, HabitDoc, Metadata};

/// Collection name for daily completions
pub const DAILY_COMPLETION_COLLECTION: &str = "daily_completions";

/// Progress of one habit on one day
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CompletionEntry {
    pub habit_id: ObjectId,
    pub title: String,
    pub goal: Goal,
    pub progress: f64,
    pub percentage: f64,
    pub completed: bool,
}

impl CompletionEntry {
    /// Fresh zero-progress entry snapshotting the habit's title and goal
    pub fn seed(habit_id: ObjectId, habit: &HabitDoc) -> Self {
        Self {
            habit_id,
            title: habit.title.clone(),
            goal: habit.goal.clone(),
            progress: 0.0,
            percentage: 0.0,
            completed: false,
        }
    }
}

/// Daily completion document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DailyCompletionDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: ObjectId,
    pub date: NaiveDate,
    #[serde(default)]
    pub completions: Vec<CompletionEntry>,
    #[serde(default)]
    pub overall_percentage: f64,
    #[serde(default)]
    pub day_completed: bool,

    /// Optimistic concurrency counter, incremented on every save
    #[serde(default)]
    pub version: i64,
}

impl DailyCompletionDoc {
    pub fn new(user_id: ObjectId, date: NaiveDate, completions: Vec<CompletionEntry>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            date,
            completions,
            overall_percentage: 0.0,
            day_completed: false,
            version: 0,
        }
    }

    pub fn entry(&self, habit_id: &ObjectId) -> Option<&CompletionEntry> {
        self.completions.iter().find(|e| e.habit_id == *habit_id)
    }

    pub fn entry_mut(&mut self, habit_id: &ObjectId) -> Option<&mut CompletionEntry> {
        self.completions.iter_mut().find(|e| e.habit_id == *habit_id)
    }

    pub fn completed_count(&self) -> usize {
        self.completions.iter().filter(|e| e.completed).count()
    }
}

impl IntoIndexes for DailyCompletionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one record per user per day
            (
                doc! { "user_id": 1, "date": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_date_unique".to_string())
                        .build(),
                ),
            ),
            // Cascade lookup on habit delete
            (
                doc! { "user_id": 1, "completions.habit_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_habit_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for DailyCompletionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

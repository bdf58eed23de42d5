//! Daily habit log schema
//!
//! A simple done/not-done record per habit per day, used for the
//! per-habit completion-rate report.

use bson::{doc, oid::ObjectId, Document};
use chrono::NaiveDate;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for daily logs
pub const DAILY_LOG_COLLECTION: &str = "daily_logs";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DailyLogDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: ObjectId,
    pub habit_id: ObjectId,
    pub date: NaiveDate,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl IntoIndexes for DailyLogDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1, "habit_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("user_habit_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for DailyLogDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

//! Journal schema
//!
//! One journal document per user; entries are appended and never edited.

use bson::{doc, oid::ObjectId, Document};
use chrono::NaiveDate;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for journals
pub const JOURNAL_COLLECTION: &str = "journals";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JournalEntry {
    pub date: NaiveDate,
    pub entry: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct JournalDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: ObjectId,
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
}

impl IntoIndexes for JournalDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for JournalDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

//! Habit template schema
//!
//! Admin-curated habit blueprints. Only published templates are listed to users.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{Goal, IkigaiCategory, Metadata};

/// Collection name for habit templates
pub const TEMPLATE_COLLECTION: &str = "habit_templates";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct HabitTemplateDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

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

impl IntoIndexes for HabitTemplateDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "published": 1 },
            Some(
                IndexOptions::builder()
                    .name("published_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for HabitTemplateDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

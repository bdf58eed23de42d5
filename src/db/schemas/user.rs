//! User document schema
//!
//! Stores credentials, role, the streak counter and the embedded ikigai profile.

use bson::{doc, oid::ObjectId, Document};
use chrono::NaiveDate;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Login email, unique
    pub email: String,

    /// Argon2 PHC hash
    pub hashed_password: String,

    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub role: Role,

    /// Consecutive fully-completed days. Written only by the streak reconciler.
    #[serde(default)]
    pub streak: u32,

    /// Date of the most recent day that counted toward the streak
    #[serde(default)]
    pub last_completed_date: Option<NaiveDate>,

    #[serde(default)]
    pub ikigai_quiz_done: bool,

    #[serde(default)]
    pub ikigai: Option<IkigaiProfile>,
}

impl UserDoc {
    pub fn new(email: String, hashed_password: String, full_name: Option<String>, role: Role) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            email,
            hashed_password,
            full_name,
            role,
            streak: 0,
            last_completed_date: None,
            ikigai_quiz_done: false,
            ikigai: None,
        }
    }

    pub fn streak_state(&self) -> StreakState {
        StreakState {
            streak: self.streak,
            last_completed_date: self.last_completed_date,
        }
    }
}

/// The pair the streak reconciler reads and compare-and-swaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreakState {
    pub streak: u32,
    pub last_completed_date: Option<NaiveDate>,
}

/// Ikigai personality archetype chosen in the onboarding quiz
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Constante,
    Explorador,
    Social,
    Reflexivo,
}

/// Ikigai profile embedded in the user document
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IkigaiProfile {
    pub archetype: Archetype,
    pub you_love: String,
    pub good_at: String,
    pub world_needs: String,
    pub is_profitable: String,
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "email": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

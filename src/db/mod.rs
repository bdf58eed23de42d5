//! Database layer
//!
//! MongoDB client wrapper plus the document schemas for users, habits,
//! daily completions, daily logs, templates and journals.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{
    DailyCompletionDoc, DailyLogDoc, HabitDoc, HabitTemplateDoc, JournalDoc, Metadata, UserDoc,
};

//! Persistence seams
//!
//! Each resource has an async store trait with two implementations: MongoDB
//! for production and DashMap-backed in-memory stores for dev mode and tests.
//! Services depend only on the traits.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::db::schemas::{
    DailyCompletionDoc, DailyLogDoc, HabitDoc, HabitTemplateDoc, IkigaiProfile, JournalDoc,
    JournalEntry, StreakState, UserDoc,
};
use crate::db::MongoClient;
use crate::types::Result;

pub use memory::{
    MemoryCompletionStore, MemoryDailyLogStore, MemoryHabitStore, MemoryJournalStore,
    MemoryTemplateStore, MemoryUserStore,
};
pub use mongo::{
    MongoCompletionStore, MongoDailyLogStore, MongoHabitStore, MongoJournalStore,
    MongoTemplateStore, MongoUserStore,
};

// =============================================================================
// Store Traits
// =============================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Duplicate email is a Conflict.
    async fn insert(&self, user: UserDoc) -> Result<UserDoc>;
    async fn get(&self, id: &ObjectId) -> Result<Option<UserDoc>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>>;
    /// Write `new` only if the stored pair still equals `expected`.
    /// Returns false when the pair changed underneath or the user is gone.
    async fn compare_and_set_streak(
        &self,
        id: &ObjectId,
        expected: StreakState,
        new: StreakState,
    ) -> Result<bool>;
    /// Set or clear the ikigai profile. Returns false if the user does not exist.
    async fn set_ikigai(&self, id: &ObjectId, profile: Option<IkigaiProfile>) -> Result<bool>;
}

#[async_trait]
pub trait HabitStore: Send + Sync {
    async fn insert(&self, habit: HabitDoc) -> Result<HabitDoc>;
    async fn get(&self, id: &ObjectId) -> Result<Option<HabitDoc>>;
    async fn list_by_owner(&self, owner_id: &ObjectId) -> Result<Vec<HabitDoc>>;
    /// Habits of `owner_id` whose task days contain `weekday_code`
    async fn list_by_owner_and_weekday(
        &self,
        owner_id: &ObjectId,
        weekday_code: &str,
    ) -> Result<Vec<HabitDoc>>;
    /// Replace by `_id`. Returns false if the habit does not exist.
    async fn replace(&self, habit: HabitDoc) -> Result<bool>;
    async fn delete(&self, id: &ObjectId) -> Result<bool>;
}

#[async_trait]
pub trait CompletionStore: Send + Sync {
    async fn find_by_user_and_date(
        &self,
        user_id: &ObjectId,
        date: NaiveDate,
    ) -> Result<Option<DailyCompletionDoc>>;
    /// Insert a new record. An existing `(user_id, date)` record is a Conflict.
    async fn insert(&self, completion: DailyCompletionDoc) -> Result<DailyCompletionDoc>;
    /// Save a modified record if its stored version still equals
    /// `completion.version`. Returns the record with the bumped version;
    /// a lost version check is a Conflict.
    async fn save(&self, completion: DailyCompletionDoc) -> Result<DailyCompletionDoc>;
    async fn delete(&self, user_id: &ObjectId, date: NaiveDate) -> Result<bool>;
    /// Records of a user with `from <= date <= to`, ordered by date
    async fn list_by_user_between(
        &self,
        user_id: &ObjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyCompletionDoc>>;
    /// Records of a user holding an entry for `habit_id`
    async fn list_containing_habit(
        &self,
        user_id: &ObjectId,
        habit_id: &ObjectId,
    ) -> Result<Vec<DailyCompletionDoc>>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn insert(&self, template: HabitTemplateDoc) -> Result<HabitTemplateDoc>;
    async fn get(&self, id: &ObjectId) -> Result<Option<HabitTemplateDoc>>;
    async fn list(&self, published_only: bool) -> Result<Vec<HabitTemplateDoc>>;
    async fn replace(&self, template: HabitTemplateDoc) -> Result<bool>;
    async fn delete(&self, id: &ObjectId) -> Result<bool>;
}

#[async_trait]
pub trait DailyLogStore: Send + Sync {
    async fn insert(&self, log: DailyLogDoc) -> Result<DailyLogDoc>;
    async fn get(&self, id: &ObjectId) -> Result<Option<DailyLogDoc>>;
    async fn list_by_user(&self, user_id: &ObjectId) -> Result<Vec<DailyLogDoc>>;
    async fn replace(&self, log: DailyLogDoc) -> Result<bool>;
    async fn delete(&self, id: &ObjectId) -> Result<bool>;
    /// Remove every log of a habit, returning how many were removed
    async fn delete_by_habit(&self, habit_id: &ObjectId) -> Result<u64>;
}

#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn find_by_user(&self, user_id: &ObjectId) -> Result<Option<JournalDoc>>;
    /// Append an entry, creating the user's journal on first use
    async fn append_entry(&self, user_id: &ObjectId, entry: JournalEntry) -> Result<()>;
}

// =============================================================================
// Store Bundle
// =============================================================================

/// All stores used by the services, behind trait objects
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub habits: Arc<dyn HabitStore>,
    pub completions: Arc<dyn CompletionStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub daily_logs: Arc<dyn DailyLogStore>,
    pub journals: Arc<dyn JournalStore>,
}

impl Stores {
    /// In-memory stores (dev mode without MongoDB, tests)
    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::new()),
            habits: Arc::new(MemoryHabitStore::new()),
            completions: Arc::new(MemoryCompletionStore::new()),
            templates: Arc::new(MemoryTemplateStore::new()),
            daily_logs: Arc::new(MemoryDailyLogStore::new()),
            journals: Arc::new(MemoryJournalStore::new()),
        }
    }

    /// MongoDB-backed stores. Creates every collection (and its indexes) once.
    pub async fn mongo(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: Arc::new(MongoUserStore::new(client).await?),
            habits: Arc::new(MongoHabitStore::new(client).await?),
            completions: Arc::new(MongoCompletionStore::new(client).await?),
            templates: Arc::new(MongoTemplateStore::new(client).await?),
            daily_logs: Arc::new(MongoDailyLogStore::new(client).await?),
            journals: Arc::new(MongoJournalStore::new(client).await?),
        })
    }
}

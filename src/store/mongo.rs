//! MongoDB store implementations

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, DateTime};
use chrono::NaiveDate;

use crate::db::schemas::{
    DailyCompletionDoc, DailyLogDoc, HabitDoc, HabitTemplateDoc, IkigaiProfile, JournalDoc,
    JournalEntry, StreakState, UserDoc, DAILY_COMPLETION_COLLECTION, DAILY_LOG_COLLECTION,
    HABIT_COLLECTION, JOURNAL_COLLECTION, TEMPLATE_COLLECTION, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::store::{
    CompletionStore, DailyLogStore, HabitStore, JournalStore, TemplateStore, UserStore,
};
use crate::types::{Result, TrackerError};

/// Dates are stored as ISO `YYYY-MM-DD` strings, which sort chronologically
fn date_bson(date: NaiveDate) -> Bson {
    Bson::String(date.format("%Y-%m-%d").to_string())
}

fn optional_date_bson(date: Option<NaiveDate>) -> Bson {
    date.map(date_bson).unwrap_or(Bson::Null)
}

fn require_id(id: Option<ObjectId>, what: &str) -> Result<ObjectId> {
    id.ok_or_else(|| TrackerError::Internal(format!("{} has no id", what)))
}

// =============================================================================
// Users
// =============================================================================

pub struct MongoUserStore {
    users: MongoCollection<UserDoc>,
}

impl MongoUserStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: mongo.collection(USER_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, mut user: UserDoc) -> Result<UserDoc> {
        let id = self.users.insert_one(user.clone()).await.map_err(|e| match e {
            TrackerError::Conflict(_) => TrackerError::Conflict("Email already registered".into()),
            other => other,
        })?;
        user._id = Some(id);
        Ok(user)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "_id": *id }).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn compare_and_set_streak(
        &self,
        id: &ObjectId,
        expected: StreakState,
        new: StreakState,
    ) -> Result<bool> {
        let filter = doc! {
            "_id": *id,
            "streak": expected.streak as i64,
            "last_completed_date": optional_date_bson(expected.last_completed_date),
        };
        let update = doc! {
            "$set": {
                "streak": new.streak as i64,
                "last_completed_date": optional_date_bson(new.last_completed_date),
                "metadata.updated_at": DateTime::now(),
            }
        };

        let result = self.users.update_one(filter, update).await?;
        Ok(result.matched_count == 1)
    }

    async fn set_ikigai(&self, id: &ObjectId, profile: Option<IkigaiProfile>) -> Result<bool> {
        let quiz_done = profile.is_some();
        let profile = match profile {
            Some(p) => bson::to_bson(&p)?,
            None => Bson::Null,
        };
        let update = doc! {
            "$set": {
                "ikigai": profile,
                "ikigai_quiz_done": quiz_done,
                "metadata.updated_at": DateTime::now(),
            }
        };

        let result = self.users.update_one(doc! { "_id": *id }, update).await?;
        Ok(result.matched_count == 1)
    }
}

// =============================================================================
// Habits
// =============================================================================

pub struct MongoHabitStore {
    habits: MongoCollection<HabitDoc>,
}

impl MongoHabitStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            habits: mongo.collection(HABIT_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl HabitStore for MongoHabitStore {
    async fn insert(&self, mut habit: HabitDoc) -> Result<HabitDoc> {
        habit._id = Some(self.habits.insert_one(habit.clone()).await?);
        Ok(habit)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<HabitDoc>> {
        self.habits.find_one(doc! { "_id": *id }).await
    }

    async fn list_by_owner(&self, owner_id: &ObjectId) -> Result<Vec<HabitDoc>> {
        self.habits
            .find_many(doc! { "owner_id": *owner_id }, Some(doc! { "_id": 1 }))
            .await
    }

    async fn list_by_owner_and_weekday(
        &self,
        owner_id: &ObjectId,
        weekday_code: &str,
    ) -> Result<Vec<HabitDoc>> {
        self.habits
            .find_many(
                doc! { "owner_id": *owner_id, "task_days": weekday_code },
                Some(doc! { "_id": 1 }),
            )
            .await
    }

    async fn replace(&self, habit: HabitDoc) -> Result<bool> {
        let id = require_id(habit._id, "habit")?;
        let result = self.habits.replace_one(doc! { "_id": id }, habit).await?;
        Ok(result.matched_count == 1)
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool> {
        let result = self.habits.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count == 1)
    }
}

// =============================================================================
// Daily Completions
// =============================================================================

pub struct MongoCompletionStore {
    completions: MongoCollection<DailyCompletionDoc>,
}

impl MongoCompletionStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            completions: mongo.collection(DAILY_COMPLETION_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl CompletionStore for MongoCompletionStore {
    async fn find_by_user_and_date(
        &self,
        user_id: &ObjectId,
        date: NaiveDate,
    ) -> Result<Option<DailyCompletionDoc>> {
        self.completions
            .find_one(doc! { "user_id": *user_id, "date": date_bson(date) })
            .await
    }

    async fn insert(&self, mut completion: DailyCompletionDoc) -> Result<DailyCompletionDoc> {
        completion.version = 0;
        completion._id = Some(self.completions.insert_one(completion.clone()).await?);
        Ok(completion)
    }

    async fn save(&self, mut completion: DailyCompletionDoc) -> Result<DailyCompletionDoc> {
        let id = require_id(completion._id, "daily completion")?;
        let expected = completion.version;
        completion.version = expected + 1;

        let result = self
            .completions
            .replace_one(doc! { "_id": id, "version": expected }, completion.clone())
            .await?;

        if result.matched_count == 0 {
            return Err(TrackerError::Conflict(format!(
                "Daily completion for {} was modified concurrently",
                completion.date
            )));
        }

        Ok(completion)
    }

    async fn delete(&self, user_id: &ObjectId, date: NaiveDate) -> Result<bool> {
        let result = self
            .completions
            .delete_one(doc! { "user_id": *user_id, "date": date_bson(date) })
            .await?;
        Ok(result.deleted_count == 1)
    }

    async fn list_by_user_between(
        &self,
        user_id: &ObjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyCompletionDoc>> {
        self.completions
            .find_many(
                doc! {
                    "user_id": *user_id,
                    "date": { "$gte": date_bson(from), "$lte": date_bson(to) },
                },
                Some(doc! { "date": 1 }),
            )
            .await
    }

    async fn list_containing_habit(
        &self,
        user_id: &ObjectId,
        habit_id: &ObjectId,
    ) -> Result<Vec<DailyCompletionDoc>> {
        self.completions
            .find_many(
                doc! { "user_id": *user_id, "completions.habit_id": *habit_id },
                Some(doc! { "date": 1 }),
            )
            .await
    }
}

// =============================================================================
// Templates
// =============================================================================

pub struct MongoTemplateStore {
    templates: MongoCollection<HabitTemplateDoc>,
}

impl MongoTemplateStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            templates: mongo.collection(TEMPLATE_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl TemplateStore for MongoTemplateStore {
    async fn insert(&self, mut template: HabitTemplateDoc) -> Result<HabitTemplateDoc> {
        template._id = Some(self.templates.insert_one(template.clone()).await?);
        Ok(template)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<HabitTemplateDoc>> {
        self.templates.find_one(doc! { "_id": *id }).await
    }

    async fn list(&self, published_only: bool) -> Result<Vec<HabitTemplateDoc>> {
        let filter = if published_only {
            doc! { "published": true }
        } else {
            doc! {}
        };
        self.templates.find_many(filter, Some(doc! { "_id": 1 })).await
    }

    async fn replace(&self, template: HabitTemplateDoc) -> Result<bool> {
        let id = require_id(template._id, "template")?;
        let result = self.templates.replace_one(doc! { "_id": id }, template).await?;
        Ok(result.matched_count == 1)
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool> {
        let result = self.templates.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count == 1)
    }
}

// =============================================================================
// Daily Logs
// =============================================================================

pub struct MongoDailyLogStore {
    logs: MongoCollection<DailyLogDoc>,
}

impl MongoDailyLogStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            logs: mongo.collection(DAILY_LOG_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl DailyLogStore for MongoDailyLogStore {
    async fn insert(&self, mut log: DailyLogDoc) -> Result<DailyLogDoc> {
        log._id = Some(self.logs.insert_one(log.clone()).await?);
        Ok(log)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<DailyLogDoc>> {
        self.logs.find_one(doc! { "_id": *id }).await
    }

    async fn list_by_user(&self, user_id: &ObjectId) -> Result<Vec<DailyLogDoc>> {
        self.logs
            .find_many(doc! { "user_id": *user_id }, Some(doc! { "date": 1 }))
            .await
    }

    async fn replace(&self, log: DailyLogDoc) -> Result<bool> {
        let id = require_id(log._id, "daily log")?;
        let result = self.logs.replace_one(doc! { "_id": id }, log).await?;
        Ok(result.matched_count == 1)
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool> {
        let result = self.logs.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count == 1)
    }

    async fn delete_by_habit(&self, habit_id: &ObjectId) -> Result<u64> {
        let result = self.logs.delete_many(doc! { "habit_id": *habit_id }).await?;
        Ok(result.deleted_count)
    }
}

// =============================================================================
// Journals
// =============================================================================

pub struct MongoJournalStore {
    journals: MongoCollection<JournalDoc>,
}

impl MongoJournalStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            journals: mongo.collection(JOURNAL_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl JournalStore for MongoJournalStore {
    async fn find_by_user(&self, user_id: &ObjectId) -> Result<Option<JournalDoc>> {
        self.journals.find_one(doc! { "user_id": *user_id }).await
    }

    async fn append_entry(&self, user_id: &ObjectId, entry: JournalEntry) -> Result<()> {
        let now = DateTime::now();
        let update = doc! {
            "$push": { "entries": bson::to_bson(&entry)? },
            "$set": { "metadata.updated_at": now },
            "$setOnInsert": { "metadata.created_at": now },
        };

        self.journals
            .upsert_one(doc! { "user_id": *user_id }, update)
            .await?;
        Ok(())
    }
}

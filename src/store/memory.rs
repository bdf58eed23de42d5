//! In-memory store implementations
//!
//! DashMap-backed stores with the same contracts as the MongoDB ones,
//! including the unique `(user_id, date)` key on daily completions, the
//! unique email on users and the version check on completion saves.

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::db::schemas::{
    DailyCompletionDoc, DailyLogDoc, HabitDoc, HabitTemplateDoc, IkigaiProfile, JournalDoc,
    JournalEntry, Metadata, StreakState, UserDoc,
};
use crate::store::{
    CompletionStore, DailyLogStore, HabitStore, JournalStore, TemplateStore, UserStore,
};
use crate::types::{Result, TrackerError};

fn require_id(id: Option<ObjectId>, what: &str) -> Result<ObjectId> {
    id.ok_or_else(|| TrackerError::Internal(format!("{} has no id", what)))
}

/// Snapshot values in ObjectId order, which is creation order
fn sorted_by_id<T: Clone>(map: &DashMap<ObjectId, T>, keep: impl Fn(&T) -> bool) -> Vec<T> {
    let mut items: Vec<(ObjectId, T)> = map
        .iter()
        .filter(|e| keep(e.value()))
        .map(|e| (*e.key(), e.value().clone()))
        .collect();
    items.sort_by_key(|(id, _)| *id);
    items.into_iter().map(|(_, v)| v).collect()
}

// =============================================================================
// Users
// =============================================================================

#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<ObjectId, UserDoc>,
    emails: DashMap<String, ObjectId>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, mut user: UserDoc) -> Result<UserDoc> {
        let id = ObjectId::new();
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(TrackerError::Conflict("Email already registered".into()))
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        user._id = Some(id);
        user.metadata = Metadata::new();
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        let id = match self.emails.get(email) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.get(&id).await
    }

    async fn compare_and_set_streak(
        &self,
        id: &ObjectId,
        expected: StreakState,
        new: StreakState,
    ) -> Result<bool> {
        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(false);
        };

        if user.streak_state() != expected {
            return Ok(false);
        }

        user.streak = new.streak;
        user.last_completed_date = new.last_completed_date;
        user.metadata.touch();
        Ok(true)
    }

    async fn set_ikigai(&self, id: &ObjectId, profile: Option<IkigaiProfile>) -> Result<bool> {
        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(false);
        };

        user.ikigai_quiz_done = profile.is_some();
        user.ikigai = profile;
        user.metadata.touch();
        Ok(true)
    }
}

// =============================================================================
// Habits
// =============================================================================

#[derive(Default)]
pub struct MemoryHabitStore {
    habits: DashMap<ObjectId, HabitDoc>,
}

impl MemoryHabitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HabitStore for MemoryHabitStore {
    async fn insert(&self, mut habit: HabitDoc) -> Result<HabitDoc> {
        let id = ObjectId::new();
        habit._id = Some(id);
        habit.metadata = Metadata::new();
        self.habits.insert(id, habit.clone());
        Ok(habit)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<HabitDoc>> {
        Ok(self.habits.get(id).map(|h| h.clone()))
    }

    async fn list_by_owner(&self, owner_id: &ObjectId) -> Result<Vec<HabitDoc>> {
        Ok(sorted_by_id(&self.habits, |h| h.owner_id == *owner_id))
    }

    async fn list_by_owner_and_weekday(
        &self,
        owner_id: &ObjectId,
        weekday_code: &str,
    ) -> Result<Vec<HabitDoc>> {
        Ok(sorted_by_id(&self.habits, |h| {
            h.owner_id == *owner_id && h.task_days.iter().any(|d| d == weekday_code)
        }))
    }

    async fn replace(&self, mut habit: HabitDoc) -> Result<bool> {
        let id = require_id(habit._id, "habit")?;
        match self.habits.get_mut(&id) {
            Some(mut slot) => {
                habit.metadata.touch();
                *slot = habit;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.habits.remove(id).is_some())
    }
}

// =============================================================================
// Daily Completions
// =============================================================================

/// Keyed by `(user_id, date)` so the uniqueness check is a single entry lookup
#[derive(Default)]
pub struct MemoryCompletionStore {
    completions: DashMap<(ObjectId, NaiveDate), DailyCompletionDoc>,
}

impl MemoryCompletionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted(&self, keep: impl Fn(&DailyCompletionDoc) -> bool) -> Vec<DailyCompletionDoc> {
        let mut items: Vec<DailyCompletionDoc> = self
            .completions
            .iter()
            .filter(|e| keep(e.value()))
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(|c| c.date);
        items
    }
}

#[async_trait]
impl CompletionStore for MemoryCompletionStore {
    async fn find_by_user_and_date(
        &self,
        user_id: &ObjectId,
        date: NaiveDate,
    ) -> Result<Option<DailyCompletionDoc>> {
        Ok(self.completions.get(&(*user_id, date)).map(|c| c.clone()))
    }

    async fn insert(&self, mut completion: DailyCompletionDoc) -> Result<DailyCompletionDoc> {
        match self.completions.entry((completion.user_id, completion.date)) {
            Entry::Occupied(_) => Err(TrackerError::Conflict(format!(
                "Daily completion for {} already exists",
                completion.date
            ))),
            Entry::Vacant(slot) => {
                completion._id = Some(ObjectId::new());
                completion.metadata = Metadata::new();
                completion.version = 0;
                slot.insert(completion.clone());
                Ok(completion)
            }
        }
    }

    async fn save(&self, mut completion: DailyCompletionDoc) -> Result<DailyCompletionDoc> {
        let key = (completion.user_id, completion.date);
        let Some(mut stored) = self.completions.get_mut(&key) else {
            return Err(TrackerError::Conflict(format!(
                "Daily completion for {} no longer exists",
                completion.date
            )));
        };

        if stored.version != completion.version || stored._id != completion._id {
            return Err(TrackerError::Conflict(format!(
                "Daily completion for {} was modified concurrently",
                completion.date
            )));
        }

        completion.version += 1;
        completion.metadata.touch();
        *stored = completion.clone();
        Ok(completion)
    }

    async fn delete(&self, user_id: &ObjectId, date: NaiveDate) -> Result<bool> {
        Ok(self.completions.remove(&(*user_id, date)).is_some())
    }

    async fn list_by_user_between(
        &self,
        user_id: &ObjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyCompletionDoc>> {
        Ok(self.collect_sorted(|c| c.user_id == *user_id && c.date >= from && c.date <= to))
    }

    async fn list_containing_habit(
        &self,
        user_id: &ObjectId,
        habit_id: &ObjectId,
    ) -> Result<Vec<DailyCompletionDoc>> {
        Ok(self.collect_sorted(|c| c.user_id == *user_id && c.entry(habit_id).is_some()))
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Default)]
pub struct MemoryTemplateStore {
    templates: DashMap<ObjectId, HabitTemplateDoc>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn insert(&self, mut template: HabitTemplateDoc) -> Result<HabitTemplateDoc> {
        let id = ObjectId::new();
        template._id = Some(id);
        template.metadata = Metadata::new();
        self.templates.insert(id, template.clone());
        Ok(template)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<HabitTemplateDoc>> {
        Ok(self.templates.get(id).map(|t| t.clone()))
    }

    async fn list(&self, published_only: bool) -> Result<Vec<HabitTemplateDoc>> {
        Ok(sorted_by_id(&self.templates, |t| !published_only || t.published))
    }

    async fn replace(&self, mut template: HabitTemplateDoc) -> Result<bool> {
        let id = require_id(template._id, "template")?;
        match self.templates.get_mut(&id) {
            Some(mut slot) => {
                template.metadata.touch();
                *slot = template;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.templates.remove(id).is_some())
    }
}

// =============================================================================
// Daily Logs
// =============================================================================

#[derive(Default)]
pub struct MemoryDailyLogStore {
    logs: DashMap<ObjectId, DailyLogDoc>,
}

impl MemoryDailyLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DailyLogStore for MemoryDailyLogStore {
    async fn insert(&self, mut log: DailyLogDoc) -> Result<DailyLogDoc> {
        let id = ObjectId::new();
        log._id = Some(id);
        log.metadata = Metadata::new();
        self.logs.insert(id, log.clone());
        Ok(log)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<DailyLogDoc>> {
        Ok(self.logs.get(id).map(|l| l.clone()))
    }

    async fn list_by_user(&self, user_id: &ObjectId) -> Result<Vec<DailyLogDoc>> {
        let mut logs = sorted_by_id(&self.logs, |l| l.user_id == *user_id);
        logs.sort_by_key(|l| l.date);
        Ok(logs)
    }

    async fn replace(&self, mut log: DailyLogDoc) -> Result<bool> {
        let id = require_id(log._id, "daily log")?;
        match self.logs.get_mut(&id) {
            Some(mut slot) => {
                log.metadata.touch();
                *slot = log;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.logs.remove(id).is_some())
    }

    async fn delete_by_habit(&self, habit_id: &ObjectId) -> Result<u64> {
        let before = self.logs.len();
        self.logs.retain(|_, l| l.habit_id != *habit_id);
        Ok(before.saturating_sub(self.logs.len()) as u64)
    }
}

// =============================================================================
// Journals
// =============================================================================

#[derive(Default)]
pub struct MemoryJournalStore {
    journals: DashMap<ObjectId, JournalDoc>,
}

impl MemoryJournalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JournalStore for MemoryJournalStore {
    async fn find_by_user(&self, user_id: &ObjectId) -> Result<Option<JournalDoc>> {
        Ok(self.journals.get(user_id).map(|j| j.clone()))
    }

    async fn append_entry(&self, user_id: &ObjectId, entry: JournalEntry) -> Result<()> {
        let mut journal = self.journals.entry(*user_id).or_insert_with(|| JournalDoc {
            _id: Some(ObjectId::new()),
            metadata: Metadata::new(),
            user_id: *user_id,
            entries: Vec::new(),
        });
        journal.entries.push(entry);
        journal.metadata.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::CompletionEntry;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[tokio::test]
    async fn test_completion_insert_is_unique_per_user_and_date() {
        let store = MemoryCompletionStore::new();
        let user = ObjectId::new();

        store
            .insert(DailyCompletionDoc::new(user, day(8), vec![]))
            .await
            .unwrap();
        let second = store.insert(DailyCompletionDoc::new(user, day(8), vec![])).await;
        assert!(matches!(second, Err(TrackerError::Conflict(_))));

        // Another user on the same date is fine
        store
            .insert(DailyCompletionDoc::new(ObjectId::new(), day(8), vec![]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_completion_save_checks_version() {
        let store = MemoryCompletionStore::new();
        let user = ObjectId::new();
        let created = store
            .insert(DailyCompletionDoc::new(user, day(8), vec![]))
            .await
            .unwrap();

        let saved = store.save(created.clone()).await.unwrap();
        assert_eq!(saved.version, 1);

        // Saving the stale copy loses
        let stale = store.save(created).await;
        assert!(matches!(stale, Err(TrackerError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_between_and_containing_habit() {
        let store = MemoryCompletionStore::new();
        let user = ObjectId::new();
        let habit = HabitDoc {
            _id: Some(ObjectId::new()),
            owner_id: user,
            title: "Read".into(),
            ..Default::default()
        };
        let habit_id = habit._id.unwrap();

        for d in [10, 8, 9] {
            let entries = if d == 9 {
                vec![CompletionEntry::seed(habit_id, &habit)]
            } else {
                vec![]
            };
            store
                .insert(DailyCompletionDoc::new(user, day(d), entries))
                .await
                .unwrap();
        }

        let range = store.list_by_user_between(&user, day(8), day(9)).await.unwrap();
        let dates: Vec<NaiveDate> = range.iter().map(|c| c.date).collect();
        assert_eq!(dates, vec![day(8), day(9)]);

        let with_habit = store.list_containing_habit(&user, &habit_id).await.unwrap();
        assert_eq!(with_habit.len(), 1);
        assert_eq!(with_habit[0].date, day(9));
    }

    #[tokio::test]
    async fn test_user_email_unique_and_streak_cas() {
        let store = MemoryUserStore::new();
        let user = store
            .insert(UserDoc::new("a@example.com".into(), "hash".into(), None, Default::default()))
            .await
            .unwrap();
        let dup = store
            .insert(UserDoc::new("a@example.com".into(), "hash".into(), None, Default::default()))
            .await;
        assert!(matches!(dup, Err(TrackerError::Conflict(_))));

        let id = user._id.unwrap();
        let next = StreakState {
            streak: 1,
            last_completed_date: Some(day(8)),
        };
        assert!(store
            .compare_and_set_streak(&id, StreakState::default(), next)
            .await
            .unwrap());
        // Expected pair no longer matches
        assert!(!store
            .compare_and_set_streak(&id, StreakState::default(), next)
            .await
            .unwrap());

        let stored = store.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(stored.streak_state(), next);
    }

    #[tokio::test]
    async fn test_journal_append_creates_journal() {
        let store = MemoryJournalStore::new();
        let user = ObjectId::new();
        assert!(store.find_by_user(&user).await.unwrap().is_none());

        for text in ["first", "second"] {
            store
                .append_entry(
                    &user,
                    JournalEntry {
                        date: day(8),
                        entry: text.into(),
                    },
                )
                .await
                .unwrap();
        }

        let journal = store.find_by_user(&user).await.unwrap().unwrap();
        assert_eq!(journal.entries.len(), 2);
        assert_eq!(journal.entries[1].entry, "second");
    }
}

//! Daily completion aggregator
//!
//! Owns every write to daily completion documents:
//! - `get_or_create` seeds a day from the habits scheduled on its weekday
//! - `update_progress` mutates one entry and recomputes the day
//! - `remove_habit` strips a deleted habit from every day that holds it
//!
//! Writes to one `(user, date)` are serialized through [`KeyedLocks`] and
//! saved with a version check. When an update moves a day into "fully
//! completed", a [`DayCompleted`] event is handed to the streak reconciler
//! after the completion is committed.

use bson::oid::ObjectId;
use chrono::{Datelike, Days, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::Actor;
use crate::db::schemas::{weekday_code, CompletionEntry, DailyCompletionDoc};
use crate::store::{CompletionStore, HabitStore};
use crate::tracking::aggregate::{apply_progress, recompute};
use crate::tracking::locks::KeyedLocks;
use crate::tracking::streak::{DayCompleted, StreakReconciler};
use crate::types::{Result, TrackerError};

/// First and last day of a calendar month
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| TrackerError::InvalidInput(format!("Invalid month {}-{}", year, month)))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next_first
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| TrackerError::InvalidInput(format!("Invalid month {}-{}", year, month)))?;
    Ok((first, last))
}

fn habit_ids(completion: &DailyCompletionDoc) -> Vec<ObjectId> {
    completion.completions.iter().map(|e| e.habit_id).collect()
}

pub struct CompletionService {
    habits: Arc<dyn HabitStore>,
    completions: Arc<dyn CompletionStore>,
    streaks: Arc<StreakReconciler>,
    locks: KeyedLocks,
}

impl CompletionService {
    pub fn new(
        habits: Arc<dyn HabitStore>,
        completions: Arc<dyn CompletionStore>,
        streaks: Arc<StreakReconciler>,
    ) -> Self {
        Self {
            habits,
            completions,
            streaks,
            locks: KeyedLocks::new(),
        }
    }

    /// Return the caller's record for `date`, creating it from the habits
    /// scheduled that weekday if it does not exist yet
    pub async fn get_or_create(&self, actor: &Actor, date: NaiveDate) -> Result<DailyCompletionDoc> {
        let key = (actor.user_id, date);
        let _guard = self.locks.lock(key).await;
        self.get_or_create_locked(actor.user_id, date).await
    }

    async fn get_or_create_locked(
        &self,
        user_id: ObjectId,
        date: NaiveDate,
    ) -> Result<DailyCompletionDoc> {
        if let Some(existing) = self.completions.find_by_user_and_date(&user_id, date).await? {
            return Ok(existing);
        }

        let habits = self
            .habits
            .list_by_owner_and_weekday(&user_id, weekday_code(date.weekday()))
            .await?;

        let entries: Vec<CompletionEntry> = habits
            .iter()
            .filter_map(|h| h._id.map(|id| CompletionEntry::seed(id, h)))
            .collect();

        let mut completion = DailyCompletionDoc::new(user_id, date, entries);
        recompute(&mut completion);

        let seeded: Vec<ObjectId> = habit_ids(&completion);
        match self.completions.insert(completion).await {
            Ok(created) => {
                let created = self.drop_deleted_habits(created, &seeded).await?;
                info!(
                    user_id = %user_id,
                    date = %date,
                    habits = created.completions.len(),
                    "Created daily completion"
                );
                Ok(created)
            }
            // Another process created it first; theirs wins
            Err(TrackerError::Conflict(_)) => self
                .completions
                .find_by_user_and_date(&user_id, date)
                .await?
                .ok_or_else(|| {
                    TrackerError::Internal(format!(
                        "Daily completion for {} vanished after conflict",
                        date
                    ))
                }),
            Err(e) => Err(e),
        }
    }

    /// Set the progress of one habit on `date` and recompute the day
    pub async fn update_progress(
        &self,
        actor: &Actor,
        date: NaiveDate,
        habit_id: ObjectId,
        progress: f64,
    ) -> Result<DailyCompletionDoc> {
        if !progress.is_finite() || progress < 0.0 {
            return Err(TrackerError::InvalidInput(
                "Progress must be a finite number >= 0".into(),
            ));
        }

        let key = (actor.user_id, date);
        let guard = self.locks.lock(key).await;
        let result = self
            .update_progress_locked(actor.user_id, date, habit_id, progress)
            .await;
        drop(guard);

        let (saved, newly_completed) = result?;

        if newly_completed {
            self.on_day_completed(DayCompleted {
                user_id: actor.user_id,
                date,
            })
            .await;
        }

        Ok(saved)
    }

    /// Returns the saved record and whether this update completed the day
    async fn update_progress_locked(
        &self,
        user_id: ObjectId,
        date: NaiveDate,
        habit_id: ObjectId,
        progress: f64,
    ) -> Result<(DailyCompletionDoc, bool)> {
        let mut completion = self
            .completions
            .find_by_user_and_date(&user_id, date)
            .await?
            .ok_or_else(|| {
                TrackerError::NotFound(format!("No daily completion for {}", date))
            })?;

        let day_was_completed = completion.day_completed;
        let mut appended = false;

        let entry_was_completed = match completion.entry_mut(&habit_id) {
            Some(entry) => {
                let was = entry.completed;
                apply_progress(entry, progress);
                was
            }
            None => {
                let habit = self
                    .habits
                    .get(&habit_id)
                    .await?
                    .ok_or_else(|| TrackerError::NotFound("Habit not found".into()))?;
                if habit.owner_id != user_id {
                    return Err(TrackerError::Forbidden(
                        "Habit belongs to another user".into(),
                    ));
                }

                let mut entry = CompletionEntry::seed(habit_id, &habit);
                apply_progress(&mut entry, progress);
                completion.completions.push(entry);
                appended = true;
                debug!(user_id = %user_id, date = %date, habit_id = %habit_id, "Appended unseeded habit");
                false
            }
        };

        recompute(&mut completion);

        let entry_is_completed = completion
            .entry(&habit_id)
            .map(|e| e.completed)
            .unwrap_or(false);
        let newly_completed =
            !entry_was_completed && entry_is_completed && !day_was_completed && completion.day_completed;

        let mut saved = self.completions.save(completion).await?;

        if appended {
            saved = self.drop_deleted_habits(saved, &[habit_id]).await?;
            if saved.entry(&habit_id).is_none() {
                return Err(TrackerError::NotFound("Habit not found".into()));
            }
        }

        debug!(
            user_id = %user_id,
            date = %date,
            habit_id = %habit_id,
            progress,
            overall = saved.overall_percentage,
            day_completed = saved.day_completed,
            "Updated progress"
        );

        Ok((saved, newly_completed))
    }

    /// Strip entries among `candidates` whose habit was deleted while this
    /// write was in flight. A cascade that listed days before the write
    /// landed cannot see them, so the writer removes them itself.
    async fn drop_deleted_habits(
        &self,
        mut completion: DailyCompletionDoc,
        candidates: &[ObjectId],
    ) -> Result<DailyCompletionDoc> {
        let mut gone = Vec::new();
        for id in candidates {
            if self.habits.get(id).await?.is_none() {
                gone.push(*id);
            }
        }
        if gone.is_empty() {
            return Ok(completion);
        }

        completion.completions.retain(|e| !gone.contains(&e.habit_id));
        recompute(&mut completion);
        warn!(
            user_id = %completion.user_id,
            date = %completion.date,
            removed = gone.len(),
            "Dropped habits deleted during write"
        );
        self.completions.save(completion).await
    }

    /// Streak advancement is best-effort relative to the committed completion
    async fn on_day_completed(&self, event: DayCompleted) {
        if let Err(e) = self.streaks.advance(event).await {
            warn!(
                user_id = %event.user_id,
                date = %event.date,
                "Failed to advance streak: {}",
                e
            );
        }
    }

    pub async fn get_by_date(&self, actor: &Actor, date: NaiveDate) -> Result<DailyCompletionDoc> {
        self.completions
            .find_by_user_and_date(&actor.user_id, date)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("No daily completion for {}", date)))
    }

    pub async fn delete(&self, actor: &Actor, date: NaiveDate) -> Result<()> {
        let key = (actor.user_id, date);
        let guard = self.locks.lock(key).await;
        let deleted = self.completions.delete(&actor.user_id, date).await;
        drop(guard);

        if deleted? {
            info!(user_id = %actor.user_id, date = %date, "Deleted daily completion");
            Ok(())
        } else {
            Err(TrackerError::NotFound(format!("No daily completion for {}", date)))
        }
    }

    pub async fn list_by_month(
        &self,
        actor: &Actor,
        year: i32,
        month: u32,
    ) -> Result<Vec<DailyCompletionDoc>> {
        let (first, last) = month_bounds(year, month)?;
        self.completions
            .list_by_user_between(&actor.user_id, first, last)
            .await
    }

    /// Remove `habit_id` from every day of `owner_id` that holds it and
    /// recompute those days. Streak fields are left alone.
    pub async fn remove_habit(&self, owner_id: ObjectId, habit_id: ObjectId) -> Result<usize> {
        let affected = self
            .completions
            .list_containing_habit(&owner_id, &habit_id)
            .await?;

        let mut updated = 0;
        for stale in affected {
            let key = (owner_id, stale.date);
            let guard = self.locks.lock(key).await;
            let result = self.strip_habit_locked(owner_id, stale.date, habit_id).await;
            drop(guard);

            if result? {
                updated += 1;
            }
        }

        if updated > 0 {
            info!(
                owner_id = %owner_id,
                habit_id = %habit_id,
                days = updated,
                "Removed habit from daily completions"
            );
        }
        Ok(updated)
    }

    async fn strip_habit_locked(
        &self,
        owner_id: ObjectId,
        date: NaiveDate,
        habit_id: ObjectId,
    ) -> Result<bool> {
        // Re-read under the lock; the listed copy may be stale
        let Some(mut completion) = self.completions.find_by_user_and_date(&owner_id, date).await?
        else {
            return Ok(false);
        };

        let before = completion.completions.len();
        completion.completions.retain(|e| e.habit_id != habit_id);
        if completion.completions.len() == before {
            return Ok(false);
        }

        recompute(&mut completion);
        self.completions.save(completion).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::schemas::{Goal, HabitDoc, UserDoc};
    use crate::store::{MemoryCompletionStore, MemoryHabitStore, MemoryUserStore, UserStore};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct Fixture {
        service: Arc<CompletionService>,
        habits: Arc<MemoryHabitStore>,
        users: Arc<MemoryUserStore>,
        actor: Actor,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserStore::new());
        let habits = Arc::new(MemoryHabitStore::new());
        let completions = Arc::new(MemoryCompletionStore::new());
        let user = users
            .insert(UserDoc::new("u@example.com".into(), "h".into(), None, Role::User))
            .await
            .unwrap();
        let streaks = Arc::new(StreakReconciler::new(users.clone()));
        Fixture {
            service: Arc::new(CompletionService::new(habits.clone(), completions, streaks)),
            habits,
            users,
            actor: Actor::new(user._id.unwrap(), Role::User),
        }
    }

    async fn add_habit(f: &Fixture, title: &str, target: i64, days: &[&str]) -> ObjectId {
        let habit = HabitDoc {
            owner_id: f.actor.user_id,
            title: title.into(),
            goal: Goal {
                target,
                ..Default::default()
            },
            task_days: days.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        };
        f.habits.insert(habit).await.unwrap()._id.unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    async fn streak(f: &Fixture) -> u32 {
        f.users.get(&f.actor.user_id).await.unwrap().unwrap().streak
    }

    #[tokio::test]
    async fn test_get_or_create_seeds_scheduled_habits_once() {
        let f = fixture().await;
        add_habit(&f, "Water", 8, &["Mon", "Wed"]).await;
        add_habit(&f, "Gym", 1, &["Tue"]).await;

        let first = f.service.get_or_create(&f.actor, date(8)).await.unwrap();
        assert_eq!(first.completions.len(), 1);
        assert_eq!(first.completions[0].title, "Water");

        let again = f.service.get_or_create(&f.actor, date(8)).await.unwrap();
        assert_eq!(again._id, first._id);
        assert_eq!(again.completions.len(), 1);
        assert_eq!(again.version, first.version);
    }

    #[tokio::test]
    async fn test_no_scheduled_habits_persists_empty_day() {
        let f = fixture().await;
        let day = f.service.get_or_create(&f.actor, date(14)).await.unwrap();
        assert!(day.completions.is_empty());
        assert_eq!(day.overall_percentage, 0.0);
        assert!(!day.day_completed);
        assert!(f.service.get_by_date(&f.actor, date(14)).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_progress_requires_existing_day() {
        let f = fixture().await;
        let habit = add_habit(&f, "Water", 8, &["Mon"]).await;
        let result = f
            .service
            .update_progress(&f.actor, date(8), habit, 1.0)
            .await;
        assert!(matches!(result, Err(TrackerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_progress_rejects_negative_and_nan() {
        let f = fixture().await;
        let habit = add_habit(&f, "Water", 8, &["Mon"]).await;
        f.service.get_or_create(&f.actor, date(8)).await.unwrap();

        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let result = f.service.update_progress(&f.actor, date(8), habit, bad).await;
            assert!(matches!(result, Err(TrackerError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn test_lazy_append_checks_ownership() {
        let f = fixture().await;
        f.service.get_or_create(&f.actor, date(8)).await.unwrap();

        let unscheduled = add_habit(&f, "Stretch", 2, &["Sat"]).await;
        let day = f
            .service
            .update_progress(&f.actor, date(8), unscheduled, 1.0)
            .await
            .unwrap();
        assert_eq!(day.completions.len(), 1);
        assert_eq!(day.completions[0].percentage, 0.5);

        let foreign = f
            .habits
            .insert(HabitDoc {
                owner_id: ObjectId::new(),
                title: "Not mine".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            ._id
            .unwrap();
        let result = f.service.update_progress(&f.actor, date(8), foreign, 1.0).await;
        assert!(matches!(result, Err(TrackerError::Forbidden(_))));

        let result = f
            .service
            .update_progress(&f.actor, date(8), ObjectId::new(), 1.0)
            .await;
        assert!(matches!(result, Err(TrackerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resubmitting_completion_advances_streak_once() {
        let f = fixture().await;
        let habit = add_habit(&f, "Water", 8, &["Mon"]).await;
        f.service.get_or_create(&f.actor, date(8)).await.unwrap();

        f.service.update_progress(&f.actor, date(8), habit, 8.0).await.unwrap();
        f.service.update_progress(&f.actor, date(8), habit, 8.0).await.unwrap();
        assert_eq!(streak(&f).await, 1);

        // Dropping below and completing again the same day does not count twice
        f.service.update_progress(&f.actor, date(8), habit, 2.0).await.unwrap();
        f.service.update_progress(&f.actor, date(8), habit, 8.0).await.unwrap();
        assert_eq!(streak(&f).await, 1);
    }

    #[tokio::test]
    async fn test_remove_habit_recomputes_days() {
        let f = fixture().await;
        let water = add_habit(&f, "Water", 8, &["Mon"]).await;
        let read = add_habit(&f, "Read", 1, &["Mon"]).await;
        f.service.get_or_create(&f.actor, date(8)).await.unwrap();
        f.service.update_progress(&f.actor, date(8), read, 1.0).await.unwrap();

        let updated = f.service.remove_habit(f.actor.user_id, water).await.unwrap();
        assert_eq!(updated, 1);

        let day = f.service.get_by_date(&f.actor, date(8)).await.unwrap();
        assert_eq!(day.completions.len(), 1);
        assert_eq!(day.overall_percentage, 1.0);
        assert!(day.day_completed);
        // The cascade never advances the streak
        assert_eq!(streak(&f).await, 0);

        f.service.remove_habit(f.actor.user_id, read).await.unwrap();
        let day = f.service.get_by_date(&f.actor, date(8)).await.unwrap();
        assert!(day.completions.is_empty());
        assert_eq!(day.overall_percentage, 0.0);
        assert!(!day.day_completed);
    }

    #[tokio::test]
    async fn test_list_by_month_and_delete() {
        let f = fixture().await;
        for d in [date(1), date(31), NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()] {
            f.service.get_or_create(&f.actor, d).await.unwrap();
        }

        let july = f.service.list_by_month(&f.actor, 2024, 7).await.unwrap();
        assert_eq!(july.len(), 2);

        f.service.delete(&f.actor, date(1)).await.unwrap();
        assert!(matches!(
            f.service.delete(&f.actor, date(1)).await,
            Err(TrackerError::NotFound(_))
        ));
        assert!(matches!(
            f.service.list_by_month(&f.actor, 2024, 13).await,
            Err(TrackerError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_requests_leave_no_lock_entries() {
        let f = fixture().await;

        for _ in 0..10 {
            let actor = Actor::new(ObjectId::new(), Role::User);
            let held = f.service.locks.lock((actor.user_id, date(8))).await;

            let request = {
                let service = Arc::clone(&f.service);
                tokio::spawn(async move { service.get_or_create(&actor, date(8)).await })
            };
            tokio::time::sleep(Duration::from_millis(5)).await;
            request.abort();
            let _ = request.await;

            drop(held);
        }

        assert!(f.service.locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_to_one_day() {
        let f = fixture().await;
        let mut habits = Vec::new();
        for i in 0..6 {
            habits.push(add_habit(&f, &format!("Habit {}", i), 2, &["Mon"]).await);
        }

        let creators: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&f.service);
                let actor = f.actor;
                tokio::spawn(async move { service.get_or_create(&actor, date(8)).await })
            })
            .collect();
        let mut ids = HashSet::new();
        for creator in creators {
            ids.insert(creator.await.unwrap().unwrap()._id);
        }
        assert_eq!(ids.len(), 1);

        // Every habit completed, the first three twice
        let updates: Vec<_> = habits
            .iter()
            .chain(habits.iter().take(3))
            .map(|&habit| {
                let service = Arc::clone(&f.service);
                let actor = f.actor;
                tokio::spawn(async move {
                    service.update_progress(&actor, date(8), habit, 2.0).await
                })
            })
            .collect();
        for update in updates {
            update.await.unwrap().unwrap();
        }

        let day = f.service.get_by_date(&f.actor, date(8)).await.unwrap();
        assert_eq!(day.completions.len(), 6);
        assert!(day.completions.iter().all(|e| e.completed));
        assert!(day.day_completed);
        assert_eq!(streak(&f).await, 1);
        assert!(f.service.locks.is_empty());
    }

    /// Deletes habits right after handing them out, like a delete landing
    /// between a writer's read and its save
    struct VanishingHabits {
        inner: Arc<MemoryHabitStore>,
        vanish_on_list: AtomicBool,
        vanish_on_get: AtomicBool,
    }

    #[async_trait]
    impl HabitStore for VanishingHabits {
        async fn insert(&self, habit: HabitDoc) -> Result<HabitDoc> {
            self.inner.insert(habit).await
        }

        async fn get(&self, id: &ObjectId) -> Result<Option<HabitDoc>> {
            let habit = self.inner.get(id).await?;
            if habit.is_some() && self.vanish_on_get.swap(false, Ordering::SeqCst) {
                self.inner.delete(id).await?;
            }
            Ok(habit)
        }

        async fn list_by_owner(&self, owner_id: &ObjectId) -> Result<Vec<HabitDoc>> {
            self.inner.list_by_owner(owner_id).await
        }

        async fn list_by_owner_and_weekday(
            &self,
            owner_id: &ObjectId,
            weekday_code: &str,
        ) -> Result<Vec<HabitDoc>> {
            let habits = self
                .inner
                .list_by_owner_and_weekday(owner_id, weekday_code)
                .await?;
            if self.vanish_on_list.swap(false, Ordering::SeqCst) {
                for id in habits.iter().filter_map(|h| h._id) {
                    self.inner.delete(&id).await?;
                }
            }
            Ok(habits)
        }

        async fn replace(&self, habit: HabitDoc) -> Result<bool> {
            self.inner.replace(habit).await
        }

        async fn delete(&self, id: &ObjectId) -> Result<bool> {
            self.inner.delete(id).await
        }
    }

    async fn vanishing_fixture() -> (CompletionService, Arc<VanishingHabits>, Actor) {
        let users = Arc::new(MemoryUserStore::new());
        let habits = Arc::new(VanishingHabits {
            inner: Arc::new(MemoryHabitStore::new()),
            vanish_on_list: AtomicBool::new(false),
            vanish_on_get: AtomicBool::new(false),
        });
        let streaks = Arc::new(StreakReconciler::new(users));
        let service = CompletionService::new(
            habits.clone(),
            Arc::new(MemoryCompletionStore::new()),
            streaks,
        );
        (service, habits, Actor::new(ObjectId::new(), Role::User))
    }

    fn owned_habit(actor: &Actor, title: &str, days: &[&str]) -> HabitDoc {
        HabitDoc {
            owner_id: actor.user_id,
            title: title.into(),
            task_days: days.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_habit_deleted_while_seeding_is_not_kept() {
        let (service, habits, actor) = vanishing_fixture().await;
        habits
            .insert(owned_habit(&actor, "Water", &["Mon"]))
            .await
            .unwrap();
        habits.vanish_on_list.store(true, Ordering::SeqCst);

        let day = service.get_or_create(&actor, date(8)).await.unwrap();
        assert!(day.completions.is_empty());
        assert!(!day.day_completed);

        let stored = service.get_by_date(&actor, date(8)).await.unwrap();
        assert!(stored.completions.is_empty());
    }

    #[tokio::test]
    async fn test_habit_deleted_while_appending_is_not_kept() {
        let (service, habits, actor) = vanishing_fixture().await;
        service.get_or_create(&actor, date(8)).await.unwrap();

        let stretch = habits
            .insert(owned_habit(&actor, "Stretch", &["Sat"]))
            .await
            .unwrap()
            ._id
            .unwrap();
        habits.vanish_on_get.store(true, Ordering::SeqCst);

        let result = service.update_progress(&actor, date(8), stretch, 1.0).await;
        assert!(matches!(result, Err(TrackerError::NotFound(_))));

        let stored = service.get_by_date(&actor, date(8)).await.unwrap();
        assert!(stored.completions.is_empty());
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds(2024, 2).unwrap(),
            (
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
            )
        );
        assert_eq!(
            month_bounds(2024, 12).unwrap().1,
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
        assert!(month_bounds(2024, 0).is_err());
    }
}

//! Streak reconciliation
//!
//! A user's streak counts consecutive fully-completed days. It is advanced
//! only by [`DayCompleted`] events and persisted with a compare-and-swap on
//! the previously observed `(streak, last_completed_date)` pair, so this is
//! the single writer of those fields even across processes.

use bson::oid::ObjectId;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::schemas::{StreakState, UserDoc};
use crate::store::UserStore;
use crate::types::{Result, TrackerError};

/// Attempts before giving up on a contended compare-and-swap
const MAX_CAS_ATTEMPTS: usize = 5;

/// Emitted when a day first becomes fully completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCompleted {
    pub user_id: ObjectId,
    pub date: NaiveDate,
}

/// Outcome of applying a completion date to a streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakDecision {
    /// Same day already counted
    Unchanged,
    /// Completion dated before the last counted day; ignored
    Backdated,
    Advance(StreakState),
}

/// Pure streak transition
///
/// - nothing counted yet: streak 1
/// - same day: unchanged
/// - next day: streak + 1
/// - gap of more than a day: streak restarts at 1
/// - earlier day: ignored
pub fn decide(current: StreakState, date: NaiveDate) -> StreakDecision {
    let Some(last) = current.last_completed_date else {
        return StreakDecision::Advance(StreakState {
            streak: 1,
            last_completed_date: Some(date),
        });
    };

    let gap = (date - last).num_days();
    let streak = match gap {
        0 => return StreakDecision::Unchanged,
        g if g < 0 => return StreakDecision::Backdated,
        1 => current.streak.saturating_add(1),
        _ => 1,
    };

    StreakDecision::Advance(StreakState {
        streak,
        last_completed_date: Some(date),
    })
}

/// Applies [`DayCompleted`] events to user documents
pub struct StreakReconciler {
    users: Arc<dyn UserStore>,
}

impl StreakReconciler {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Advance the user's streak for `event.date`, returning the user as stored
    pub async fn advance(&self, event: DayCompleted) -> Result<UserDoc> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut user = self
                .users
                .get(&event.user_id)
                .await?
                .ok_or_else(|| TrackerError::NotFound("User not found".into()))?;

            let current = user.streak_state();
            let next = match decide(current, event.date) {
                StreakDecision::Unchanged => {
                    debug!(user_id = %event.user_id, date = %event.date, "Streak already counts this day");
                    return Ok(user);
                }
                StreakDecision::Backdated => {
                    warn!(
                        user_id = %event.user_id,
                        date = %event.date,
                        last_completed = ?current.last_completed_date,
                        "Ignoring backdated completion for streak"
                    );
                    return Ok(user);
                }
                StreakDecision::Advance(next) => next,
            };

            if self
                .users
                .compare_and_set_streak(&event.user_id, current, next)
                .await?
            {
                info!(
                    user_id = %event.user_id,
                    date = %event.date,
                    from = current.streak,
                    to = next.streak,
                    "Streak updated"
                );
                user.streak = next.streak;
                user.last_completed_date = next.last_completed_date;
                return Ok(user);
            }

            debug!(user_id = %event.user_id, attempt, "Streak compare-and-swap lost, retrying");
        }

        Err(TrackerError::Conflict(format!(
            "Streak update for user {} kept conflicting",
            event.user_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::store::MemoryUserStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn state(streak: u32, last: Option<u32>) -> StreakState {
        StreakState {
            streak,
            last_completed_date: last.map(day),
        }
    }

    #[test]
    fn test_first_completion_starts_streak() {
        assert_eq!(
            decide(StreakState::default(), day(8)),
            StreakDecision::Advance(state(1, Some(8)))
        );
    }

    #[test]
    fn test_consecutive_day_increments() {
        assert_eq!(
            decide(state(4, Some(8)), day(9)),
            StreakDecision::Advance(state(5, Some(9)))
        );
    }

    #[test]
    fn test_gap_resets() {
        assert_eq!(
            decide(state(4, Some(8)), day(13)),
            StreakDecision::Advance(state(1, Some(13)))
        );
    }

    #[test]
    fn test_same_day_and_backdated() {
        assert_eq!(decide(state(2, Some(8)), day(8)), StreakDecision::Unchanged);
        assert_eq!(decide(state(2, Some(8)), day(7)), StreakDecision::Backdated);
    }

    #[test]
    fn test_month_boundary_is_consecutive() {
        let june_30 = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert_eq!(
            decide(
                StreakState {
                    streak: 3,
                    last_completed_date: Some(june_30)
                },
                day(1)
            ),
            StreakDecision::Advance(state(4, Some(1)))
        );
    }

    async fn user_store() -> (Arc<MemoryUserStore>, ObjectId) {
        let store = Arc::new(MemoryUserStore::new());
        let user = store
            .insert(UserDoc::new("s@example.com".into(), "h".into(), None, Role::User))
            .await
            .unwrap();
        (store, user._id.unwrap())
    }

    #[test]
    fn test_reconciler_runs_sequence() {
        tokio_test::block_on(async {
            let (store, user_id) = user_store().await;
            let reconciler = StreakReconciler::new(store.clone());

            for d in [8, 9, 10] {
                reconciler
                    .advance(DayCompleted { user_id, date: day(d) })
                    .await
                    .unwrap();
            }
            let user = reconciler
                .advance(DayCompleted { user_id, date: day(10) })
                .await
                .unwrap();
            assert_eq!(user.streak, 3);

            let user = reconciler
                .advance(DayCompleted { user_id, date: day(15) })
                .await
                .unwrap();
            assert_eq!(user.streak, 1);
            assert_eq!(user.last_completed_date, Some(day(15)));
        });
    }

    #[tokio::test]
    async fn test_reconciler_ignores_backdated() {
        let (store, user_id) = user_store().await;
        let reconciler = StreakReconciler::new(store.clone());

        reconciler
            .advance(DayCompleted { user_id, date: day(10) })
            .await
            .unwrap();
        let user = reconciler
            .advance(DayCompleted { user_id, date: day(9) })
            .await
            .unwrap();
        assert_eq!(user.streak, 1);
        assert_eq!(user.last_completed_date, Some(day(10)));
    }

    #[tokio::test]
    async fn test_reconciler_unknown_user() {
        let (store, _) = user_store().await;
        let reconciler = StreakReconciler::new(store);
        let result = reconciler
            .advance(DayCompleted {
                user_id: ObjectId::new(),
                date: day(8),
            })
            .await;
        assert!(matches!(result, Err(TrackerError::NotFound(_))));
    }
}

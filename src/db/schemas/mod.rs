//! Database schemas
//!
//! MongoDB document structures for users, habits, completions, logs,
//! templates and journals.

mod daily_completion;
mod daily_log;
mod habit;
mod journal;
mod metadata;
mod template;
mod user;

pub use daily_completion::{CompletionEntry, DailyCompletionDoc, DAILY_COMPLETION_COLLECTION};
pub use daily_log::{DailyLogDoc, DAILY_LOG_COLLECTION};
pub use habit::{
    normalize_task_days, weekday_code, Goal, GoalPeriod, HabitDoc, IkigaiCategory,
    HABIT_COLLECTION, WEEKDAY_CODES,
};
pub use journal::{JournalDoc, JournalEntry, JOURNAL_COLLECTION};
pub use metadata::Metadata;
pub use template::{HabitTemplateDoc, TEMPLATE_COLLECTION};
pub use user::{Archetype, IkigaiProfile, StreakState, UserDoc, USER_COLLECTION};

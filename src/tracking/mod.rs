//! Daily completion tracking and streaks
//!
//! - [`aggregate`]: pure percentage and day-completion math
//! - [`completions`]: the aggregator service owning completion writes
//! - [`streak`]: the streak state machine and its reconciler
//! - [`locks`]: per-`(user, date)` write serialization

pub mod aggregate;
pub mod completions;
pub mod locks;
pub mod streak;

pub use completions::{month_bounds, CompletionService};
pub use streak::{DayCompleted, StreakReconciler};

//! Resource services
//!
//! Thin collaborators around the stores: accounts, habits, templates, daily
//! logs, ikigai profiles, the journal and the month calendar. Daily
//! completions and streaks live in [`crate::tracking`].

pub mod calendar;
pub mod daily_logs;
pub mod habits;
pub mod ikigai;
pub mod journal;
pub mod templates;
pub mod users;

pub use calendar::{CalendarDay, CalendarService, MonthCalendar};
pub use daily_logs::{DailyLogService, DailyLogUpdate};
pub use habits::{HabitInput, HabitProgress, HabitService};
pub use ikigai::IkigaiService;
pub use journal::{question_for, JournalService};
pub use templates::{TemplateInput, TemplatePatch, TemplateService};
pub use users::UserService;

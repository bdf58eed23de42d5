//! Ikigai Habits - habit tracking backend
//!
//! Users define recurring habits with quantified goals and active weekdays.
//! Each day gets one DailyCompletion aggregate per user, seeded from the
//! habits scheduled that weekday. When a day becomes fully complete the
//! streak reconciler advances the user's consecutive-day streak.
//!
//! ## Modules
//!
//! - **tracking**: daily completion aggregates, keyed locks and the streak state machine
//! - **services**: accounts, habits, templates, daily logs, ikigai, journal and calendar
//! - **store**: store traits with MongoDB and in-memory implementations
//! - **routes** / **server**: the hyper HTTP surface

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod tracking;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TrackerError};

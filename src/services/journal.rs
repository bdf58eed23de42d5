//! Journal entries and the question of the day

use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::info;

use crate::auth::Actor;
use crate::db::schemas::JournalEntry;
use crate::store::JournalStore;
use crate::types::{Result, TrackerError};

/// Rotating reflection prompts, one per day
const DAILY_QUESTIONS: [&str; 10] = [
    "¿Qué actividad de hoy te hizo perder la noción del tiempo?",
    "¿En qué fuiste útil para alguien hoy?",
    "¿Qué pequeña mejora podrías hacer mañana?",
    "¿Qué habilidad te gustaría que otros te pagaran por compartir?",
    "¿Qué problema del mundo te gustaría ayudar a resolver?",
    "¿Qué te dio energía hoy y qué te la quitó?",
    "¿Qué hábito te acercó hoy a la persona que quieres ser?",
    "¿De qué te sientes agradecido en este momento?",
    "¿Qué aprendiste hoy que no sabías ayer?",
    "¿Qué harías aunque nadie te lo reconociera?",
];

/// Deterministic question for a date
pub fn question_for(date: NaiveDate) -> &'static str {
    let index = date.num_days_from_ce().rem_euclid(DAILY_QUESTIONS.len() as i32) as usize;
    DAILY_QUESTIONS[index]
}

pub struct JournalService {
    journals: Arc<dyn JournalStore>,
}

impl JournalService {
    pub fn new(journals: Arc<dyn JournalStore>) -> Self {
        Self { journals }
    }

    /// Append an entry dated `today` to the caller's journal
    pub async fn add_entry(&self, actor: &Actor, text: &str, today: NaiveDate) -> Result<JournalEntry> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TrackerError::InvalidInput("Journal entry must not be empty".into()));
        }

        let entry = JournalEntry {
            date: today,
            entry: text.to_string(),
        };
        self.journals.append_entry(&actor.user_id, entry.clone()).await?;
        info!(user_id = %actor.user_id, date = %today, "Added journal entry");
        Ok(entry)
    }

    /// First entry written on `date`, if any
    pub async fn entry_for_day(&self, actor: &Actor, date: NaiveDate) -> Result<Option<JournalEntry>> {
        Ok(self
            .entries(actor)
            .await?
            .into_iter()
            .find(|e| e.date == date))
    }

    /// All entries in the order they were written
    pub async fn entries(&self, actor: &Actor) -> Result<Vec<JournalEntry>> {
        Ok(self
            .journals
            .find_by_user(&actor.user_id)
            .await?
            .map(|j| j.entries)
            .unwrap_or_default())
    }
}

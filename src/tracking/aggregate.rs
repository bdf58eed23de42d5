//! Pure recomputation of entry and day aggregates
//!
//! Stored `percentage`, `completed`, `overall_percentage` and `day_completed`
//! are always derived here from progress and goal; nothing else writes them.

use crate::db::schemas::{CompletionEntry, DailyCompletionDoc, Goal};

/// `progress / target`, with non-positive targets treated as 1. Not capped at 1.
pub fn entry_percentage(progress: f64, goal: &Goal) -> f64 {
    progress / goal.effective_target()
}

/// Set progress on an entry and re-derive its percentage and completed flag
pub fn apply_progress(entry: &mut CompletionEntry, progress: f64) {
    entry.progress = progress;
    entry.percentage = entry_percentage(progress, &entry.goal);
    entry.completed = entry.percentage >= 1.0;
}

/// Day-level aggregate of a set of entries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayAggregate {
    pub overall_percentage: f64,
    pub day_completed: bool,
}

/// Mean of entry percentages and whether every entry is completed.
/// An empty day is 0.0 and not completed.
pub fn aggregate(entries: &[CompletionEntry]) -> DayAggregate {
    if entries.is_empty() {
        return DayAggregate {
            overall_percentage: 0.0,
            day_completed: false,
        };
    }

    let total: f64 = entries.iter().map(|e| e.percentage).sum();
    DayAggregate {
        overall_percentage: total / entries.len() as f64,
        day_completed: entries.iter().all(|e| e.completed),
    }
}

/// Recompute the stored day aggregate from the document's entries
pub fn recompute(completion: &mut DailyCompletionDoc) {
    let agg = aggregate(&completion.completions);
    completion.overall_percentage = agg.overall_percentage;
    completion.day_completed = agg.day_completed;
}

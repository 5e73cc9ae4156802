use crate::error::{Result, StudyError};
use crate::format::{format_hms, format_ms};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Incorrect,
    #[default]
    Unattempted,
}

impl Outcome {
    /// Incorrect beats Correct beats Unattempted.
    fn rank(self) -> u8 {
        match self {
            Outcome::Unattempted => 0,
            Outcome::Correct => 1,
            Outcome::Incorrect => 2,
        }
    }

    pub fn dominant(outcomes: impl IntoIterator<Item = Outcome>) -> Outcome {
        outcomes
            .into_iter()
            .max_by_key(|o| o.rank())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: u64,
    pub time_spent_seconds: u64,
    pub main_remaining_at_submit: u64,
    pub outcome: Outcome,
    #[serde(default)]
    pub selected: bool,
}

/// One flattened line of the export document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub index: usize,
    pub time_spent: String,
    pub main_remaining: String,
    pub outcome_label: String,
}

/// Append-ordered question log with a never-reused id counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStore {
    entries: Vec<LogEntry>,
    next_log_id: u64,
}

impl Default for LogStore {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_log_id: 1,
        }
    }
}

impl LogStore {
    /// Rebuilds a store from persisted parts. A counter that could hand out
    /// an id already in use is bumped past the largest existing id.
    pub fn from_parts(entries: Vec<LogEntry>, next_log_id: u64) -> Self {
        let floor = entries
            .iter()
            .map(|e| e.id)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        Self {
            entries,
            next_log_id: next_log_id.max(floor),
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn get(&self, id: u64) -> Option<&LogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn next_log_id(&self) -> u64 {
        self.next_log_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected_count(&self) -> usize {
        self.entries.iter().filter(|e| e.selected).count()
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_log_id;
        self.next_log_id = self.next_log_id.saturating_add(1);
        id
    }

    pub fn submit(
        &mut self,
        time_spent_seconds: u64,
        main_remaining_at_submit: u64,
        outcome: Outcome,
    ) -> Result<LogEntry> {
        if time_spent_seconds == 0 {
            return Err(StudyError::InvalidSubmission(
                "run the question timer for at least 1 second before submitting".into(),
            ));
        }
        let entry = LogEntry {
            id: self.allocate_id(),
            time_spent_seconds,
            main_remaining_at_submit,
            outcome,
            selected: false,
        };
        debug!(id = entry.id, time_spent_seconds, %outcome, "log entry submitted");
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Returns the new selection state.
    pub fn toggle_select(&mut self, id: u64) -> Result<bool> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StudyError::NotFound(id))?;
        entry.selected = !entry.selected;
        Ok(entry.selected)
    }

    /// Returns whether anything was removed; a missing id is not an error.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        before != self.entries.len()
    }

    /// Folds the selected entries, taken in log order, into one new entry
    /// appended at the end.
    pub fn merge(&mut self) -> Result<LogEntry> {
        let selected = self.selected_count();
        if selected < 2 {
            return Err(StudyError::InsufficientSelection { selected });
        }

        let (merged, kept): (Vec<LogEntry>, Vec<LogEntry>) =
            std::mem::take(&mut self.entries)
                .into_iter()
                .partition(|e| e.selected);

        let time_spent_seconds = merged
            .iter()
            .fold(0u64, |acc, e| acc.saturating_add(e.time_spent_seconds));
        let main_remaining_at_submit = merged
            .last()
            .map(|e| e.main_remaining_at_submit)
            .unwrap_or_default();
        let outcome = Outcome::dominant(merged.iter().map(|e| e.outcome));

        self.entries = kept;
        let entry = LogEntry {
            id: self.allocate_id(),
            time_spent_seconds,
            main_remaining_at_submit,
            outcome,
            selected: false,
        };
        info!(
            id = entry.id,
            merged = merged.len(),
            time_spent_seconds,
            %outcome,
            "logs merged"
        );
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Empties the log and restarts ids at 1.
    pub fn clear(&mut self) {
        info!(removed = self.entries.len(), "logs cleared");
        self.entries.clear();
        self.next_log_id = 1;
    }

    /// Lazily formatted rows in current log order. Cloning the iterator
    /// restarts it from the first row.
    pub fn export_rows(&self) -> impl Iterator<Item = ExportRow> + Clone + '_ {
        self.entries.iter().enumerate().map(|(idx, e)| ExportRow {
            index: idx + 1,
            time_spent: format_ms(e.time_spent_seconds),
            main_remaining: format_hms(e.main_remaining_at_submit),
            outcome_label: e.outcome.to_string(),
        })
    }
}

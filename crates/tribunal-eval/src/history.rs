use std::sync::{Arc, RwLock};
use std::time::Duration;

use tribunal_core::{
    now_ms, ConfigStore, DuplicateLookup, EvaluationRecord, HistoryEntry, TribunalError,
};
use uuid::Uuid;

/// Store key under which the entry log is persisted.
pub const HISTORY_KEY: &str = "tribunal.history";

const DEFAULT_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Time-windowed log of past evaluations, most-recent-first. Duplicate
/// lookup is exact trimmed-string match inside the window: fuzzy matching
/// would risk replaying a cached verdict for semantically different text.
pub struct EvaluationHistory {
    store: Arc<dyn ConfigStore>,
    entries: RwLock<Vec<HistoryEntry>>,
    window: Duration,
    capacity: Option<usize>,
}

impl EvaluationHistory {
    pub fn new(store: Arc<dyn ConfigStore>) -> Result<Self, TribunalError> {
        Self::with_window(store, DEFAULT_WINDOW)
    }

    pub fn with_window(
        store: Arc<dyn ConfigStore>,
        window: Duration,
    ) -> Result<Self, TribunalError> {
        let entries = match store.get(HISTORY_KEY) {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| TribunalError::Store(format!("corrupt history snapshot: {e}")))?,
            None => Vec::new(),
        };
        Ok(Self {
            store,
            entries: RwLock::new(entries),
            window,
            capacity: None,
        })
    }

    /// Bound the log; the oldest entries are dropped past the limit.
    pub fn with_capacity(mut self, max_entries: usize) -> Self {
        self.capacity = Some(max_entries);
        self
    }

    /// Most recent entry inside the window whose trimmed input pair exactly
    /// matches the trimmed query pair.
    pub fn find_duplicate(&self, user_input: &str, ai_response: &str) -> DuplicateLookup {
        let cutoff = now_ms() - self.window.as_millis() as i64;
        let user_input = user_input.trim();
        let ai_response = ai_response.trim();

        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        for entry in entries.iter() {
            if entry.timestamp < cutoff {
                // entries are ordered most-recent-first; everything from
                // here on is outside the window
                break;
            }
            if entry.user_input.trim() == user_input && entry.ai_response.trim() == ai_response {
                tracing::debug!(entry_id = %entry.id, "duplicate evaluation found");
                return DuplicateLookup::hit(entry.clone());
            }
        }
        DuplicateLookup::miss()
    }

    /// Insert a new entry at the head of the log.
    pub fn append(
        &self,
        user_input: &str,
        ai_response: &str,
        evaluation: EvaluationRecord,
    ) -> HistoryEntry {
        let entry = HistoryEntry {
            id: generate_entry_id(),
            user_input: user_input.to_string(),
            ai_response: ai_response.to_string(),
            timestamp: now_ms(),
            evaluation,
            user_feedback: None,
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(0, entry.clone());
        if let Some(capacity) = self.capacity {
            entries.truncate(capacity);
        }
        self.persist(&entries);
        entry
    }

    /// Set or overwrite the user's feedback on an entry. Silent no-op when
    /// the entry was deleted in the meantime.
    pub fn annotate_feedback(&self, entry_id: &str, feedback: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.iter_mut().find(|e| e.id == entry_id) {
            entry.user_feedback = Some(feedback.to_string());
            self.persist(&entries);
        }
    }

    /// Idempotent removal by id.
    pub fn remove(&self, entry_id: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|e| e.id != entry_id);
        if entries.len() != before {
            self.persist(&entries);
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        self.persist(&entries);
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn get(&self, entry_id: &str) -> Option<HistoryEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|e| e.id == entry_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, entries: &[HistoryEntry]) {
        match serde_json::to_string(entries) {
            Ok(raw) => self.store.set(HISTORY_KEY, raw),
            Err(e) => tracing::error!(error = %e, "failed to serialize history snapshot"),
        }
    }
}

fn generate_entry_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("eval-{}-{}", now_ms(), &suffix[..8])
}

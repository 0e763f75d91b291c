use std::collections::HashSet;
use std::sync::Arc;

use crate::storage::{keys, KeyValueStore};

/// Locally persisted exam bookmarks, stored as a JSON id array under the
/// same key the browser client used.
#[derive(Debug, Clone)]
pub(crate) struct Bookmarks {
    store: Arc<dyn KeyValueStore>,
}

impl Bookmarks {
    pub(crate) fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub(crate) fn ids(&self) -> HashSet<String> {
        let Some(raw) = self.store.get(keys::BOOKMARKED_EXAMS) else {
            return HashSet::new();
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => ids.into_iter().collect(),
            Err(err) => {
                tracing::warn!(error = %err, "Discarding unreadable bookmark list");
                HashSet::new()
            }
        }
    }

    /// Flips the bookmark for an exam; returns whether it is now set.
    pub(crate) fn toggle(&self, exam_id: &str) -> bool {
        let mut ids = self.ids();
        let now_bookmarked = ids.insert(exam_id.to_string());
        if !now_bookmarked {
            ids.remove(exam_id);
        }
        self.save(&ids);
        now_bookmarked
    }

    fn save(&self, ids: &HashSet<String>) {
        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();
        match serde_json::to_string(&sorted) {
            Ok(json) => self.store.put(keys::BOOKMARKED_EXAMS, &json),
            Err(err) => tracing::error!(error = %err, "Failed to encode bookmark list"),
        }
    }
}

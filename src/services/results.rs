use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::api::attempts::AttemptsApi;
use crate::api::exams::ExamsApi;
use crate::schemas::attempt::Attempt;

/// One row on the results screen: the attempt plus the exam title, resolved
/// separately because attempts only carry the exam reference.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResultRow {
    pub(crate) attempt: Attempt,
    pub(crate) exam_title: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Page<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: usize,
    pub(crate) skip: usize,
    pub(crate) limit: usize,
}

/// Assembles the results view: the user's attempts joined with exam titles.
#[derive(Debug, Clone)]
pub(crate) struct ResultsService {
    exams: ExamsApi,
    attempts: AttemptsApi,
}

impl ResultsService {
    pub(crate) fn new(exams: ExamsApi, attempts: AttemptsApi) -> Self {
        Self { exams, attempts }
    }

    /// Loads all rows. Title lookups that fail only lose the title, never
    /// the row — this backfill is a logging-only failure path.
    pub(crate) async fn load(&self) -> Vec<ResultRow> {
        let attempts = self.attempts.list().await;

        let exam_ids: HashSet<&str> =
            attempts.iter().map(|attempt| attempt.exam_id.as_str()).collect();

        let mut titles: HashMap<String, String> = HashMap::new();
        for exam_id in exam_ids {
            match self.exams.fetch(exam_id).await {
                Ok(exam) => {
                    titles.insert(exam.id, exam.title);
                }
                Err(err) => {
                    tracing::warn!(error = %err, exam_id, "Failed to resolve exam title");
                }
            }
        }

        attempts
            .into_iter()
            .map(|attempt| {
                let exam_title = titles.get(&attempt.exam_id).cloned();
                ResultRow { attempt, exam_title }
            })
            .collect()
    }

    /// Exam ids the user has completed at least once, feeding the
    /// "completed" browse filter.
    pub(crate) async fn completed_exam_ids(&self) -> HashSet<String> {
        self.attempts
            .list()
            .await
            .into_iter()
            .filter(|attempt| attempt.is_completed)
            .map(|attempt| attempt.exam_id)
            .collect()
    }
}

/// Client-side pagination over an already-assembled row set.
pub(crate) fn paginate<T: Clone>(rows: &[T], skip: usize, limit: usize) -> Page<T> {
    let items = rows.iter().skip(skip).take(limit).cloned().collect();
    Page { items, total_count: rows.len(), skip, limit }
}

use std::collections::HashSet;

use time::OffsetDateTime;

use crate::core::time::parse_datetime_flexible;
use crate::schemas::exam::Exam;

/// Category filters on the exam browsing screen. `Recent` and `Popular` cap
/// at the top ten, matching the original behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExamFilter {
    All,
    Recent,
    Popular,
    Bookmarked,
    Completed,
}

const TOP_LIST_LIMIT: usize = 10;

/// Sort keys the list screens offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortKey {
    Title,
    Created,
    Duration,
}

/// Search plus category filtering, in that order.
pub(crate) fn filter_exams(
    exams: &[Exam],
    search_term: &str,
    filter: ExamFilter,
    bookmarked: &HashSet<String>,
    completed: &HashSet<String>,
) -> Vec<Exam> {
    let searched = filter_by_search_term(exams, search_term);
    apply_filter(searched, filter, bookmarked, completed)
}

fn filter_by_search_term(exams: &[Exam], search_term: &str) -> Vec<Exam> {
    if search_term.is_empty() {
        return exams.to_vec();
    }

    let term = search_term.to_lowercase();
    exams
        .iter()
        .filter(|exam| {
            exam.title.to_lowercase().contains(&term)
                || exam.description.to_lowercase().contains(&term)
                || exam
                    .category
                    .as_deref()
                    .is_some_and(|category| category.to_lowercase().contains(&term))
        })
        .cloned()
        .collect()
}

fn apply_filter(
    mut exams: Vec<Exam>,
    filter: ExamFilter,
    bookmarked: &HashSet<String>,
    completed: &HashSet<String>,
) -> Vec<Exam> {
    match filter {
        ExamFilter::All => exams,
        ExamFilter::Recent => {
            exams.sort_by_key(|exam| std::cmp::Reverse(created_timestamp(exam)));
            exams.truncate(TOP_LIST_LIMIT);
            exams
        }
        ExamFilter::Popular => {
            exams.sort_by_key(|exam| std::cmp::Reverse(exam.attempts.unwrap_or(0)));
            exams.truncate(TOP_LIST_LIMIT);
            exams
        }
        ExamFilter::Bookmarked => {
            exams.retain(|exam| bookmarked.contains(&exam.id));
            exams
        }
        ExamFilter::Completed => {
            exams.retain(|exam| completed.contains(&exam.id));
            exams
        }
    }
}

/// Stable sort by the chosen key; missing values order first ascending.
pub(crate) fn sort_exams(exams: &mut [Exam], key: SortKey, ascending: bool) {
    match key {
        SortKey::Title => exams.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        SortKey::Created => exams.sort_by_key(created_timestamp),
        SortKey::Duration => exams.sort_by_key(|exam| exam.duration_minutes),
    }
    if !ascending {
        exams.reverse();
    }
}

fn created_timestamp(exam: &Exam) -> i64 {
    exam.created_stamp()
        .and_then(parse_datetime_flexible)
        .map(OffsetDateTime::unix_timestamp)
        .unwrap_or(0)
}

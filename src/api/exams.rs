use serde_json::Value;
use validator::Validate;

use crate::api::client::ApiClient;
use crate::api::envelope::{self, decode, decode_list};
use crate::api::errors::ApiError;
use crate::schemas::attempt::Attempt;
use crate::schemas::exam::{Exam, ExamDraft};

/// Wrappers over the exam endpoints. Read paths that feed list screens
/// degrade to an empty vector on failure so the UI keeps rendering; single
/// document fetches and all writes propagate their error.
#[derive(Debug, Clone)]
pub(crate) struct ExamsApi {
    client: ApiClient,
}

impl ExamsApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetches one exam with its full question list. One attempt, no retry.
    pub(crate) async fn fetch(&self, exam_id: &str) -> Result<Exam, ApiError> {
        tracing::debug!(exam_id, "Fetching exam");
        let payload = self.client.get_authed(&format!("/exam/exams/{exam_id}")).await?;
        let exam: Exam = decode(envelope::unwrap_data(payload))?;

        if exam.questions.is_empty() {
            tracing::warn!(exam_id, "Exam loaded without questions");
        } else {
            tracing::debug!(exam_id, questions = exam.questions.len(), "Exam loaded");
        }

        Ok(exam)
    }

    /// Exams published by one teacher, for the student browsing screen.
    pub(crate) async fn list_by_teacher(&self, teacher_id: &str) -> Vec<Exam> {
        match self.client.get_authed(&format!("/exam/exams/teacher/{teacher_id}")).await {
            Ok(payload) => decode_list(payload, "exams"),
            Err(err) => {
                tracing::error!(error = %err, teacher_id, "Failed to fetch exams for teacher");
                Vec::new()
            }
        }
    }

    /// List endpoints strip the question arrays; refetch entries that came
    /// back empty so browsing screens can show counts. A failed lookup only
    /// loses that count — this path is logged, never surfaced.
    pub(crate) async fn backfill_question_counts(&self, exams: &mut [Exam]) {
        for exam in exams.iter_mut() {
            if !exam.questions.is_empty() {
                continue;
            }
            match self.fetch(&exam.id).await {
                Ok(full) => exam.questions = full.questions,
                Err(err) => {
                    tracing::debug!(error = %err, exam_id = %exam.id, "Question count backfill failed");
                }
            }
        }
    }

    /// Exams owned by the authenticated teacher.
    pub(crate) async fn own_exams(&self) -> Vec<Exam> {
        match self.client.get_authed("/exam/teacher/exams").await {
            Ok(payload) => decode_list(payload, "exams"),
            Err(err) => {
                tracing::error!(error = %err, "Failed to fetch own exams");
                Vec::new()
            }
        }
    }

    /// All attempts against the authenticated teacher's exams.
    pub(crate) async fn own_exam_attempts(&self) -> Vec<Attempt> {
        match self.client.get_authed("/exam/teacher/attempts").await {
            Ok(payload) => decode_list(payload, "attempts"),
            Err(err) => {
                tracing::error!(error = %err, "Failed to fetch attempts for own exams");
                Vec::new()
            }
        }
    }

    /// Attempts against one exam owned by the authenticated teacher.
    pub(crate) async fn attempts_for_exam(&self, exam_id: &str) -> Vec<Attempt> {
        match self.client.get_authed(&format!("/exam/teacher/exams/{exam_id}/attempts")).await {
            Ok(payload) => decode_list(payload, "attempts"),
            Err(err) => {
                tracing::error!(error = %err, exam_id, "Failed to fetch attempts for exam");
                Vec::new()
            }
        }
    }

    pub(crate) async fn create(&self, draft: &ExamDraft) -> Result<Exam, ApiError> {
        validate_draft(draft)?;
        let body = encode(draft)?;
        let payload = self.client.post_authed("/exam/teacher/exams", &body).await?;
        tracing::debug!(title = %draft.title, "Exam created");
        decode(envelope::unwrap_data(payload))
    }

    pub(crate) async fn update(&self, exam_id: &str, draft: &ExamDraft) -> Result<Exam, ApiError> {
        validate_draft(draft)?;
        let body = encode(draft)?;
        let payload = self.client.put_authed(&format!("/exam/teacher/exams/{exam_id}"), &body).await?;
        tracing::debug!(exam_id, "Exam updated");
        decode(envelope::unwrap_data(payload))
    }

    pub(crate) async fn delete(&self, exam_id: &str) -> Result<(), ApiError> {
        self.client.delete_authed(&format!("/exam/teacher/exams/{exam_id}")).await?;
        tracing::debug!(exam_id, "Exam deleted");
        Ok(())
    }
}

fn validate_draft(draft: &ExamDraft) -> Result<(), ApiError> {
    draft.validate().map_err(|err| ApiError::Validation(err.to_string()))
}

fn encode(draft: &ExamDraft) -> Result<Value, ApiError> {
    serde_json::to_value(draft)
        .map_err(|err| ApiError::Unexpected(format!("failed to encode exam draft: {err}")))
}

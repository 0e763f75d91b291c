use serde::{Deserialize, Serialize};

use super::{entity_ref, optional_entity_ref};

/// Sentinel for a question the student has not answered yet. This is the wire
/// value the server expects in submissions, not just a client convention.
pub(crate) const UNANSWERED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Answer {
    #[serde(rename = "questionId")]
    pub(crate) question_id: String,
    #[serde(rename = "selectedOption")]
    pub(crate) selected_option: i32,
    #[serde(rename = "isCorrect", default, skip_serializing_if = "Option::is_none")]
    pub(crate) is_correct: Option<bool>,
}

impl Answer {
    pub(crate) fn unanswered(question_id: impl Into<String>) -> Self {
        Self { question_id: question_id.into(), selected_option: UNANSWERED, is_correct: None }
    }

    pub(crate) fn is_answered(&self) -> bool {
        self.selected_option != UNANSWERED
    }
}

/// A timed attempt as the server reports it. Created by the start endpoint,
/// mutated once by submission, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Attempt {
    #[serde(rename = "_id", alias = "id")]
    pub(crate) id: String,
    #[serde(rename = "examId", deserialize_with = "entity_ref")]
    pub(crate) exam_id: String,
    #[serde(rename = "userId", default, deserialize_with = "optional_entity_ref")]
    pub(crate) user_id: Option<String>,
    #[serde(rename = "startTime", default)]
    pub(crate) started_at: Option<String>,
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub(crate) ended_at: Option<String>,
    #[serde(default)]
    pub(crate) answers: Vec<Answer>,
    #[serde(default)]
    pub(crate) score: f64,
    #[serde(rename = "totalPoints", default)]
    pub(crate) total_points: f64,
    #[serde(default)]
    pub(crate) passed: bool,
    #[serde(rename = "isCompleted", default)]
    pub(crate) is_completed: bool,
    #[serde(rename = "percentageScore", default, skip_serializing_if = "Option::is_none")]
    pub(crate) percentage_score: Option<f64>,
}

impl Attempt {
    pub(crate) fn percentage(&self) -> f64 {
        if let Some(value) = self.percentage_score {
            return value;
        }
        if self.total_points > 0.0 {
            self.score / self.total_points * 100.0
        } else {
            0.0
        }
    }
}

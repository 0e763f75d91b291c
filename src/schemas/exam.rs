use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use super::optional_entity_ref;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// An exam document as served by the Testly API. `questions` is always an
/// array after decoding: a missing or null field normalizes to empty rather
/// than an error, so list endpoints that strip questions still decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Exam {
    #[serde(rename = "_id", alias = "id")]
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(rename = "duration")]
    pub(crate) duration_minutes: u32,
    #[serde(rename = "passingScore", default)]
    pub(crate) passing_score: f64,
    #[serde(default, deserialize_with = "questions_or_empty")]
    pub(crate) questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) category: Option<String>,
    #[serde(rename = "createdBy", default, deserialize_with = "optional_entity_ref")]
    pub(crate) created_by: Option<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub(crate) created_at: Option<String>,
    #[serde(rename = "dateCreated", default, skip_serializing_if = "Option::is_none")]
    pub(crate) date_created: Option<String>,
    #[serde(default)]
    pub(crate) attempts: Option<u64>,
    #[serde(default)]
    pub(crate) views: Option<u64>,
}

impl Exam {
    pub(crate) fn duration_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    /// Creation timestamp for recency sorting; the server populates either
    /// `createdAt` or the legacy `dateCreated` string.
    pub(crate) fn created_stamp(&self) -> Option<&str> {
        self.created_at.as_deref().or(self.date_created.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Question {
    #[serde(rename = "_id", alias = "id")]
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub(crate) correct_answer: usize,
    #[serde(default)]
    pub(crate) points: f64,
}

fn questions_or_empty<'de, D>(deserializer: D) -> Result<Vec<Question>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Vec<Question>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Outbound payload for teacher exam authoring, validated before it leaves the
/// client so a broken form never reaches the server.
#[derive(Debug, Clone, Serialize, Validate)]
pub(crate) struct ExamDraft {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    pub(crate) description: String,
    #[serde(rename = "duration")]
    #[validate(range(min = 1, message = "duration must be at least one minute"))]
    pub(crate) duration_minutes: u32,
    #[serde(rename = "passingScore")]
    #[validate(range(min = 0.0, max = 100.0, message = "passing score must be a percentage"))]
    pub(crate) passing_score: f64,
    #[validate(length(min = 1, message = "an exam needs at least one question"), nested)]
    pub(crate) questions: Vec<QuestionDraft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[validate(schema(function = correct_answer_in_range))]
pub(crate) struct QuestionDraft {
    #[validate(length(min = 1, message = "question text must not be empty"))]
    pub(crate) text: String,
    #[validate(length(min = 2, message = "a question needs at least two options"))]
    pub(crate) options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub(crate) correct_answer: usize,
    #[validate(range(exclusive_min = 0.0, message = "points must be positive"))]
    pub(crate) points: f64,
}

fn correct_answer_in_range(question: &QuestionDraft) -> Result<(), ValidationError> {
    if question.correct_answer >= question.options.len() {
        return Err(ValidationError::new("correct_answer")
            .with_message("correct answer index is out of range".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exam_decodes_wire_field_names() {
        let exam: Exam = serde_json::from_value(json!({
            "_id": "e1",
            "title": "Algebra basics",
            "description": "Linear equations",
            "duration": 30,
            "passingScore": 60,
            "questions": [
                {"_id": "q1", "text": "2+2?", "options": ["3", "4"], "correctAnswer": 1, "points": 1}
            ]
        }))
        .unwrap();

        assert_eq!(exam.id, "e1");
        assert_eq!(exam.duration_minutes, 30);
        assert_eq!(exam.duration_seconds(), 1800);
        assert_eq!(exam.questions.len(), 1);
        assert_eq!(exam.questions[0].correct_answer, 1);
    }

    #[test]
    fn missing_questions_normalize_to_empty() {
        let exam: Exam = serde_json::from_value(json!({
            "_id": "e2",
            "title": "Stub exam",
            "duration": 10
        }))
        .unwrap();
        assert!(exam.questions.is_empty());

        let exam: Exam = serde_json::from_value(json!({
            "_id": "e3",
            "title": "Null questions",
            "duration": 10,
            "questions": null
        }))
        .unwrap();
        assert!(exam.questions.is_empty());
    }

    #[test]
    fn created_by_accepts_embedded_owner() {
        let exam: Exam = serde_json::from_value(json!({
            "_id": "e4",
            "title": "Owned",
            "duration": 5,
            "createdBy": {"_id": "t9", "username": "prof"}
        }))
        .unwrap();
        assert_eq!(exam.created_by.as_deref(), Some("t9"));
    }

    #[test]
    fn draft_validation_rejects_out_of_range_answer() {
        let draft = ExamDraft {
            title: "Quiz".to_string(),
            description: String::new(),
            duration_minutes: 10,
            passing_score: 50.0,
            questions: vec![QuestionDraft {
                text: "Pick one".to_string(),
                options: vec!["a".to_string(), "b".to_string()],
                correct_answer: 2,
                points: 1.0,
            }],
            difficulty: None,
            category: None,
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn draft_validation_accepts_well_formed_exam() {
        let draft = ExamDraft {
            title: "Quiz".to_string(),
            description: "Short quiz".to_string(),
            duration_minutes: 10,
            passing_score: 50.0,
            questions: vec![QuestionDraft {
                text: "Pick one".to_string(),
                options: vec!["a".to_string(), "b".to_string()],
                correct_answer: 1,
                points: 1.0,
            }],
            difficulty: Some(Difficulty::Easy),
            category: None,
        };
        assert!(draft.validate().is_ok());
    }
}

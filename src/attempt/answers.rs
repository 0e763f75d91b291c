use crate::schemas::attempt::Answer;
use crate::schemas::exam::Exam;

/// One selected-option slot per question, addressed by question position.
/// Each slot also records the question id for server correlation. All
/// operations are total over valid indices; an out-of-range question index is
/// a caller bug and panics via slice indexing.
#[derive(Debug, Clone)]
pub(crate) struct AnswerBuffer {
    slots: Vec<Answer>,
}

impl AnswerBuffer {
    /// One unanswered slot per question, in exam order.
    pub(crate) fn for_exam(exam: &Exam) -> Self {
        Self { slots: exam.questions.iter().map(|q| Answer::unanswered(&q.id)).collect() }
    }

    /// Overwrites a slot. Idempotent; option bounds are the UI binding's
    /// contract (it only offers valid options).
    pub(crate) fn set(&mut self, question_index: usize, option_index: i32) {
        self.slots[question_index].selected_option = option_index;
    }

    pub(crate) fn answered_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_answered()).count()
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.slots.iter().all(Answer::is_answered)
    }

    pub(crate) fn completion_percent(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        self.answered_count() as f64 / self.slots.len() as f64 * 100.0
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn answers(&self) -> &[Answer] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::attempt::UNANSWERED;
    use serde_json::json;

    fn exam_with_questions(count: usize) -> Exam {
        let questions: Vec<_> = (0..count)
            .map(|i| {
                json!({
                    "_id": format!("q{i}"),
                    "text": format!("Question {i}"),
                    "options": ["a", "b", "c"],
                    "correctAnswer": 0,
                    "points": 1
                })
            })
            .collect();
        serde_json::from_value(json!({
            "_id": "e1",
            "title": "Sample",
            "duration": 10,
            "questions": questions
        }))
        .unwrap()
    }

    #[test]
    fn initialization_fills_every_slot_with_the_sentinel() {
        let buffer = AnswerBuffer::for_exam(&exam_with_questions(5));
        assert_eq!(buffer.len(), 5);
        assert!(buffer.answers().iter().all(|a| a.selected_option == UNANSWERED));
        assert_eq!(buffer.answered_count(), 0);
        assert!(!buffer.is_complete());
    }

    #[test]
    fn slots_record_question_ids_in_order() {
        let buffer = AnswerBuffer::for_exam(&exam_with_questions(3));
        let ids: Vec<_> = buffer.answers().iter().map(|a| a.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q0", "q1", "q2"]);
    }

    #[test]
    fn set_overwrites_and_is_idempotent() {
        let mut buffer = AnswerBuffer::for_exam(&exam_with_questions(2));
        buffer.set(0, 1);
        buffer.set(0, 1);
        assert_eq!(buffer.answers()[0].selected_option, 1);
        assert_eq!(buffer.answered_count(), 1);

        buffer.set(0, 2);
        assert_eq!(buffer.answers()[0].selected_option, 2);
        assert_eq!(buffer.answered_count(), 1);
    }

    #[test]
    fn complete_only_when_every_slot_is_answered() {
        let mut buffer = AnswerBuffer::for_exam(&exam_with_questions(2));
        buffer.set(0, 0);
        assert!(!buffer.is_complete());
        assert_eq!(buffer.completion_percent(), 50.0);

        buffer.set(1, 2);
        assert!(buffer.is_complete());
        assert_eq!(buffer.completion_percent(), 100.0);
    }

    #[test]
    fn single_question_scenario() {
        let exam: Exam = serde_json::from_value(json!({
            "id": "e1",
            "title": "One question",
            "duration": 1,
            "questions": [
                {"id": "q1", "text": "Pick", "options": ["A", "B"], "correctAnswer": 0, "points": 1}
            ]
        }))
        .unwrap();

        let mut buffer = AnswerBuffer::for_exam(&exam);
        assert_eq!(buffer.answers()[0].question_id, "q1");
        assert_eq!(buffer.answers()[0].selected_option, UNANSWERED);

        buffer.set(0, 0);
        assert_eq!(buffer.answers()[0].selected_option, 0);
        assert!(buffer.is_complete());
    }

    #[test]
    fn empty_exam_reports_zero_percent() {
        let buffer = AnswerBuffer::for_exam(&exam_with_questions(0));
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_complete());
        assert_eq!(buffer.completion_percent(), 0.0);
    }
}

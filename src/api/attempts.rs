use serde_json::json;

use crate::api::client::ApiClient;
use crate::api::envelope::{decode, decode_list, unwrap_data};
use crate::api::errors::ApiError;
use crate::schemas::attempt::{Answer, Attempt};

/// Wrappers over the attempt lifecycle endpoints: start, submit, and the read
/// paths for results screens.
#[derive(Debug, Clone)]
pub(crate) struct AttemptsApi {
    client: ApiClient,
}

impl AttemptsApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Asks the server to create (or resume — a server contract the client
    /// does not second-guess) a timed attempt for the current user.
    pub(crate) async fn start(&self, exam_id: &str) -> Result<Attempt, ApiError> {
        tracing::debug!(exam_id, "Starting attempt");
        let payload =
            self.client.post_authed("/exam/attempt/startExam", &json!({ "examId": exam_id })).await?;
        let attempt: Attempt = decode(unwrap_data(payload))?;
        tracing::debug!(exam_id, attempt_id = %attempt.id, "Attempt started");
        Ok(attempt)
    }

    /// Sends the final answer set. Slots still holding the unanswered
    /// sentinel are legal; the server scores them as wrong.
    pub(crate) async fn submit(
        &self,
        attempt_id: &str,
        answers: &[Answer],
    ) -> Result<Attempt, ApiError> {
        tracing::debug!(attempt_id, answers = answers.len(), "Submitting attempt");
        let payload = self
            .client
            .post_authed(
                "/exam/attempts/submit",
                &json!({ "attemptId": attempt_id, "answers": answers }),
            )
            .await?;
        let attempt: Attempt = decode(unwrap_data(payload))?;
        tracing::info!(
            attempt_id,
            score = attempt.score,
            passed = attempt.passed,
            "Attempt submitted"
        );
        Ok(attempt)
    }

    pub(crate) async fn fetch(&self, attempt_id: &str) -> Result<Attempt, ApiError> {
        let payload = self.client.get_authed(&format!("/exam/attempts/{attempt_id}")).await?;
        decode(unwrap_data(payload))
    }

    /// The current user's attempts, for the results list. Degrades to empty
    /// on failure so the screen renders.
    pub(crate) async fn list(&self) -> Vec<Attempt> {
        match self.client.get_authed("/exam/attempts").await {
            Ok(payload) => decode_list(payload, "attempts"),
            Err(err) => {
                tracing::error!(error = %err, "Failed to fetch attempts");
                Vec::new()
            }
        }
    }
}

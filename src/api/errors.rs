use thiserror::Error;

/// Client-side view of a failed API interaction. Status codes collapse into
/// the four categories the front end distinguishes; everything else lands in
/// `Unexpected` with enough context for the log line.
#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("authentication required")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// Message suitable for direct display. Call sites may override with a
    /// screen-specific phrasing; this is the fallback.
    pub(crate) fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Please sign in to continue.".to_string(),
            ApiError::Forbidden(_) => "You do not have access to this resource.".to_string(),
            ApiError::NotFound(_) => "The requested resource was not found.".to_string(),
            ApiError::Validation(detail) => format!("Invalid input: {detail}"),
            ApiError::Transport(_) => {
                "Could not reach the Testly server. Please try again later.".to_string()
            }
            ApiError::Unexpected(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

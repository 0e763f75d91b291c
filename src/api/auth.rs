use serde_json::{json, Value};

use crate::api::client::ApiClient;
use crate::api::envelope::{decode, decode_list, extract_error_message, unwrap_data};
use crate::api::errors::ApiError;
use crate::schemas::user::{AuthResponse, User};
use crate::session::AuthSession;

/// Registration payload for students and teachers. The server distinguishes
/// the two by endpoint, not by shape.
#[derive(Debug, Clone)]
pub(crate) struct Registration {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password: String,
}

/// Wrappers over the auth endpoints. Successful sign-in establishes the local
/// session; sign-out clears it regardless of what the server says.
#[derive(Debug, Clone)]
pub(crate) struct AuthApi {
    client: ApiClient,
    default_token_ttl_seconds: u64,
}

impl AuthApi {
    pub(crate) fn new(client: ApiClient, default_token_ttl_seconds: u64) -> Self {
        Self { client, default_token_ttl_seconds }
    }

    fn session(&self) -> &AuthSession {
        self.client.session()
    }

    pub(crate) async fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiError> {
        tracing::info!("Attempting sign-in");
        let payload =
            self.client.post("/auth/signIn", &json!({ "email": email, "password": password })).await?;
        let response: AuthResponse = decode(unwrap_data(payload))?;

        if response.token.is_empty() {
            return Err(ApiError::Unexpected("sign-in response carried no token".to_string()));
        }

        let ttl = response.expires_in.unwrap_or(self.default_token_ttl_seconds);
        self.session().establish(&response.token, ttl, &response.user);
        if let Some(message) = &response.message {
            tracing::debug!(message = %message, "Sign-in message from server");
        }
        tracing::info!(user = %response.user.display_name(), "Signed in");

        Ok(response.user)
    }

    pub(crate) async fn register(&self, registration: &Registration) -> Result<String, ApiError> {
        tracing::info!("Registering new student");
        let payload = self.client.post("/auth/signUp", &registration_body(registration)).await?;
        Ok(acknowledgement(payload))
    }

    pub(crate) async fn register_teacher(
        &self,
        registration: &Registration,
    ) -> Result<String, ApiError> {
        tracing::info!("Registering new teacher");
        let payload =
            self.client.post("/auth/teacher/signUp", &registration_body(registration)).await?;
        Ok(acknowledgement(payload))
    }

    pub(crate) async fn confirm_email(&self, token: &str) -> Result<String, ApiError> {
        let payload = self.client.get(&format!("/auth/confirmEmail/{token}")).await?;
        Ok(acknowledgement(payload))
    }

    pub(crate) async fn resend_confirmation(&self, email: &str) -> Result<String, ApiError> {
        let payload =
            self.client.post("/auth/resendConfirmation", &json!({ "email": email })).await?;
        Ok(acknowledgement(payload))
    }

    pub(crate) async fn request_password_reset(&self, email: &str) -> Result<String, ApiError> {
        let payload = self.client.post("/auth/requestReset", &json!({ "email": email })).await?;
        Ok(acknowledgement(payload))
    }

    pub(crate) async fn verify_password_reset(
        &self,
        code: &str,
        new_password: &str,
        confirm_new_password: &str,
    ) -> Result<String, ApiError> {
        let payload = self
            .client
            .post(
                "/auth/verifyReset",
                &json!({
                    "code": code,
                    "newPassword": new_password,
                    "confirmNewPassword": confirm_new_password,
                }),
            )
            .await?;
        Ok(acknowledgement(payload))
    }

    /// Validates the stored token against the server. Only an explicit
    /// rejection clears local state; transport failures keep the session so
    /// a flaky network does not log the user out.
    pub(crate) async fn validate_token(&self) -> bool {
        if self.session().stored_token().is_none() {
            return false;
        }
        if self.session().token_expired() {
            tracing::debug!("Token expired locally, clearing session");
            self.session().clear();
            return false;
        }

        match self.client.get_authed("/auth/validateToken").await {
            Ok(payload) => {
                let valid = payload.get("valid").and_then(Value::as_bool).unwrap_or(true);
                if !valid {
                    tracing::debug!("Server reported token as invalid, clearing session");
                    self.session().clear();
                }
                valid
            }
            Err(ApiError::Unauthorized | ApiError::Forbidden(_)) => {
                tracing::debug!("Server rejected token, clearing session");
                self.session().clear();
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "Token validation unreachable; trusting local state");
                true
            }
        }
    }

    /// Signs out: best-effort server call, unconditional local clear.
    pub(crate) async fn sign_out(&self) {
        if self.session().stored_token().is_some() {
            if let Err(err) = self.client.post_authed("/auth/signOut", &json!({})).await {
                tracing::warn!(error = %err, "Sign-out request failed; clearing local state anyway");
            }
        }
        self.session().clear();
        tracing::info!("Signed out");
    }

    /// Confirmed teachers for the selection screens. Read path: empty on
    /// failure.
    pub(crate) async fn confirmed_teachers(&self) -> Vec<User> {
        match self.client.get("/auth/teachers/confirmed").await {
            Ok(payload) => decode_list(payload, "teachers"),
            Err(err) => {
                tracing::error!(error = %err, "Failed to fetch confirmed teachers");
                Vec::new()
            }
        }
    }

    pub(crate) async fn update_selected_teachers(
        &self,
        teacher_ids: &[String],
    ) -> Result<(), ApiError> {
        self.client
            .put_authed("/auth/teachers/selected", &json!({ "selectedTeachers": teacher_ids }))
            .await?;
        tracing::debug!(count = teacher_ids.len(), "Updated selected teachers");
        Ok(())
    }
}

fn registration_body(registration: &Registration) -> Value {
    json!({
        "username": registration.username,
        "email": registration.email,
        "password": registration.password,
    })
}

fn acknowledgement(payload: Value) -> String {
    let message = extract_error_message(&payload);
    if message == "unknown_error" { "ok".to_string() } else { message }
}

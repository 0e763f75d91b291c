use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct User {
    #[serde(rename = "_id", alias = "id")]
    pub(crate) id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    pub(crate) email: String,
    pub(crate) role: Role,
    #[serde(rename = "selectedTeachers", default, skip_serializing_if = "Option::is_none")]
    pub(crate) selected_teachers: Option<Vec<String>>,
}

impl User {
    pub(crate) fn display_name(&self) -> &str {
        self.username.as_deref().or(self.name.as_deref()).unwrap_or(&self.email)
    }
}

/// Sign-in response: token plus the authenticated user. `expiresIn` is the
/// token lifetime in seconds and is not always present.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthResponse {
    pub(crate) token: String,
    #[serde(rename = "expiresIn", default)]
    pub(crate) expires_in: Option<u64>,
    pub(crate) user: User,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

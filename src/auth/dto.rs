use serde::{Deserialize, Serialize};

use super::repo_types::ProfileUpdate;

/// Request body for user registration. `disabled` and any other fields the
/// client sends are ignored.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub phone: String,
}

/// OAuth2 password-flow form for `/login/access-token`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64, // seconds
}

impl TokenResponse {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "bearer".into(),
            expires_in,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileUploadRequest {
    /// Optional; when given it must name the authenticated user.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileUpdate,
}

use serde::{Deserialize, Serialize};

/// Login type for password authentication.
pub const LOGIN_TYPE_PASSWORD: &str = "m.login.password";

// -- Auth --

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub user: String,
    pub password: String,
}

impl LoginRequest {
    pub fn password(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: LOGIN_TYPE_PASSWORD,
            user: user.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user_id: String,
    /// Deprecated by newer servers but still sent by most.
    #[serde(default)]
    pub home_server: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

// -- Messages --

#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    pub event_id: String,
}

// -- Errors --

/// Standard error body returned by the homeserver on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errcode: String,
    #[serde(default)]
    pub error: String,
}

use serde::{Deserialize, Serialize};

use super::UserRecord;

/// Credentials for `POST /api/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account name
    pub username: String,
    /// Plain-text password
    pub password: String,
}

/// Successful login payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer credential to attach to later requests
    pub access_token: String,
    /// Always `bearer`
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// The signed-in account
    pub user: UserRecord,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Payload for `POST /api/auth/signup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    /// Requested account name
    pub username: String,
    /// Initial password
    pub password: String,
}

/// Payload for `POST /api/auth/change-password`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password
    pub old_password: String,
    /// Replacement password
    pub new_password: String,
}

/// Payload for `POST /api/auth/admin/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAdminRequest {
    /// Account name for the new admin
    pub username: String,
    /// Initial password
    pub password: String,
}

/// Generic `{"status": "..."}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Status string such as `ok` or `logged_out`
    pub status: String,
}

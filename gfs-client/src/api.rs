//! Account endpoints of the GFS API.

use serde::{Serialize, de::DeserializeOwned};
use shared::models::{
    ChangePasswordRequest, CreateAdminRequest, ErrorBody, LoginRequest, LoginResponse,
    SignupRequest, StatusResponse, UserRecord,
};
use tracing::{info, instrument, warn};

use crate::{
    error::ApiError,
    request::AuthenticatedRequest,
    session::SessionStore,
    transport::{HttpResponse, RequestOptions},
};

const LOGIN_PATH: &str = "api/auth/login";
const SIGNUP_PATH: &str = "api/auth/signup";
const LOGOUT_PATH: &str = "api/auth/logout";
const CHANGE_PASSWORD_PATH: &str = "api/auth/change-password";
const CREATE_ADMIN_PATH: &str = "api/auth/admin/create";

/// Login, logout and account management on top of [`AuthenticatedRequest`].
///
/// Paths are relative, so they resolve beneath the configured base URL.
#[derive(Debug, Clone)]
pub struct AuthApi {
    requests: AuthenticatedRequest,
}

impl AuthApi {
    /// Creates the API client.
    #[must_use]
    pub fn new(requests: AuthenticatedRequest) -> Self {
        Self { requests }
    }

    /// The session this client updates.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        self.requests.session()
    }

    /// Signs in and stores the returned token and user in the session.
    ///
    /// # Errors
    /// Returns [`ApiError::Status`] when the credentials are rejected, and
    /// [`ApiError::Session`] when the session cannot be persisted. A failed
    /// user write restores the previous token, so an error never leaves the
    /// session half signed in.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<UserRecord, ApiError> {
        let payload = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let login: LoginResponse = self.post_json(LOGIN_PATH, &payload).await?;

        let session = self.session();
        let previous_token = session.token();
        session.set_token(Some(login.access_token))?;
        if let Err(err) = session.set_user(Some(login.user.clone())) {
            if let Err(rollback) = session.set_token(previous_token) {
                warn!(error = %rollback, "failed to roll back token after user write failed");
            }
            return Err(err.into());
        }
        info!(admin = login.user.is_admin(), "signed in");
        Ok(login.user)
    }

    /// Creates a regular account. The session is not changed.
    ///
    /// # Errors
    /// Returns [`ApiError::Status`] when the server refuses the account, for
    /// example because the username is taken.
    #[instrument(skip(self, password))]
    pub async fn signup(&self, username: &str, password: &str) -> Result<UserRecord, ApiError> {
        let payload = SignupRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.post_json(SIGNUP_PATH, &payload).await
    }

    /// Ends the session.
    ///
    /// The server is told when a token is present, but the local session is
    /// cleared whether or not that call succeeds.
    ///
    /// # Errors
    /// Returns [`ApiError::Session`] only if clearing local storage fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        if self.session().is_authenticated() {
            let outcome = self
                .requests
                .send(LOGOUT_PATH, RequestOptions::post())
                .await
                .map_err(ApiError::from)
                .and_then(|response| decode::<StatusResponse>(&response));
            if let Err(err) = outcome {
                warn!(error = %err, "server logout failed; clearing local session");
            }
        }
        self.session().clear()?;
        info!("signed out");
        Ok(())
    }

    /// Changes the signed-in user's password.
    ///
    /// # Errors
    /// Returns [`ApiError::Status`] when the old password is wrong or the
    /// session is not authorized.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<StatusResponse, ApiError> {
        let payload = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.post_json(CHANGE_PASSWORD_PATH, &payload).await
    }

    /// Creates an admin account. Requires an admin session.
    ///
    /// # Errors
    /// Returns [`ApiError::Status`] when the caller is not an admin or the
    /// username is taken.
    #[instrument(skip(self, password))]
    pub async fn create_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, ApiError> {
        let payload = CreateAdminRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.post_json(CREATE_ADMIN_PATH, &payload).await
    }

    async fn post_json<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let options = RequestOptions::post().json(payload)?;
        let response = self.requests.send(path, options).await?;
        decode(&response)
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    if !response.is_success() {
        let detail = response
            .json::<ErrorBody>()
            .map_or_else(|_| response.text(), |body| body.message());
        return Err(ApiError::Status {
            status: response.status,
            detail,
        });
    }
    response.json().map_err(ApiError::Decode)
}

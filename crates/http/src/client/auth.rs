//! Authentication API client methods

use reqwest::header::AUTHORIZATION;
use serde_json::Value as JsonValue;
use storefront_core::CredentialPair;
use tracing::{info, instrument, warn};

use super::session::LogoutReason;
use super::{ApiRequest, ClientError, PublicClient, SessionClient};
use crate::types::{LoginRequest, LogoutRequest, RegisterRequest, UserProfile};

/// Login, registration and logout against the auth service
///
/// Credential-issuing calls go through the public client; calls that need a
/// logged in user go through the session client, which also owns the stored
/// pair.
#[derive(Clone)]
pub struct AuthApi {
    public: PublicClient,
    session: SessionClient,
}

impl AuthApi {
    /// Both clients are expected to point at the auth service
    pub const fn new(public: PublicClient, session: SessionClient) -> Self {
        Self { public, session }
    }

    pub const fn session(&self) -> &SessionClient {
        &self.session
    }

    /// Exchange username and password for a credential pair and store it
    ///
    /// # Errors
    ///
    /// Returns the mapped HTTP error if the credentials are rejected
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &LoginRequest) -> Result<CredentialPair, ClientError> {
        let pair: CredentialPair = self
            .public
            .execute_data(ApiRequest::post("/auth/login").json(credentials)?)
            .await?;

        self.session.session().establish(&pair)?;
        info!("Logged in");
        Ok(pair)
    }

    /// Create a new account
    ///
    /// # Errors
    ///
    /// Returns the mapped HTTP error if registration is refused
    #[instrument(skip_all, fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<JsonValue, ClientError> {
        self.public
            .execute_data(ApiRequest::post("/auth/register").json(request)?)
            .await
    }

    /// Profile of the logged in user
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be recovered or the request
    /// fails
    pub async fn current_user(&self) -> Result<UserProfile, ClientError> {
        self.session.execute_data(ApiRequest::get("/auth/me")).await
    }

    /// End the session
    ///
    /// The backend is told to revoke the refresh token on a best-effort basis.
    /// Local credentials are cleared whatever the backend answers.
    ///
    /// # Errors
    ///
    /// Only a failure to read the credential store is returned
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), ClientError> {
        let session = self.session.session();

        match session.store().refresh_token()? {
            Some(refresh_token) => {
                let mut request = ApiRequest::post("/auth/logout").json(&LogoutRequest {
                    refresh_token: &refresh_token,
                })?;
                if let Some(access_token) = session.store().access_token()? {
                    request = request.header(AUTHORIZATION.as_str(), format!("Bearer {access_token}"));
                }
                match self.public.execute_no_content(request).await {
                    Ok(()) => info!("Backend session revoked"),
                    Err(err) => warn!("Backend logout failed: {err}"),
                }
            }
            None => warn!("No refresh token stored, skipping backend logout"),
        }

        session.force_logout(LogoutReason::UserRequested);
        Ok(())
    }
}

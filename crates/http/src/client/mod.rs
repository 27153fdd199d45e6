//! Storefront HTTP clients

pub mod auth;
pub mod error;
mod refresh;
pub mod request;
pub mod session;
pub mod typed;

use std::sync::Arc;

use reqwest::Response;
use serde::de::DeserializeOwned;
use storefront_core::{CredentialStore, Service, StorefrontConfig};

pub use auth::AuthApi;
pub use error::{ClientError, RefreshFailure};
pub use request::ApiRequest;
pub use session::{LogoutReason, Navigator, NoopNavigator, SessionEvent, SessionOptions};
pub use typed::{PublicClient, SessionClient, TypedClientBuilder};

/// Hands out clients for every configured service
///
/// All session clients from one factory share a single session: the same
/// credential store, refresh state, default bearer and event stream.
#[derive(Clone)]
pub struct ClientFactory {
    config: StorefrontConfig,
    auth: SessionClient,
}

impl ClientFactory {
    /// Create a factory whose forced logouts go nowhere
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the auth URLs are invalid
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        Self::with_navigator(config, store, Arc::new(NoopNavigator))
    }

    /// Create a factory that reports forced logouts to `navigator`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the auth URLs are invalid
    pub fn with_navigator(
        config: StorefrontConfig,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let options = SessionOptions::from_config(&config.auth, store).navigator(navigator);
        let auth = TypedClientBuilder::from_config(&config.http)
            .base_url(config.auth.base_url.clone())
            .build_session(options)?;

        Ok(Self { config, auth })
    }

    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// Session client bound to the auth service
    pub const fn session(&self) -> &SessionClient {
        &self.auth
    }

    /// Login, registration and logout
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.auth.to_public(), self.auth.clone())
    }

    pub fn session_client(&self, service: Service) -> SessionClient {
        self.auth.with_base_url(self.config.services.base_url(service))
    }

    pub fn public_client(&self, service: Service) -> PublicClient {
        self.session_client(service).to_public()
    }

    /// Session client for logged in users, public client for guests
    pub fn client_for(&self, service: Service, authenticated: bool) -> AnyClient {
        if authenticated {
            AnyClient::Session(self.session_client(service))
        } else {
            AnyClient::Public(self.public_client(service))
        }
    }
}

/// Either kind of client, chosen at runtime
#[derive(Clone)]
pub enum AnyClient {
    Session(SessionClient),
    Public(PublicClient),
}

impl AnyClient {
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Session(_))
    }

    pub fn base_url(&self) -> &str {
        match self {
            Self::Session(client) => client.base_url(),
            Self::Public(client) => client.base_url(),
        }
    }

    /// Send a request through the selected client
    ///
    /// # Errors
    ///
    /// See [`SessionClient::send`] and [`PublicClient::send`]
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ClientError> {
        match self {
            Self::Session(client) => client.send(request).await,
            Self::Public(client) => client.send(request).await,
        }
    }

    /// Execute a request and decode the JSON body
    ///
    /// # Errors
    ///
    /// See [`SessionClient::execute`]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClientError> {
        match self {
            Self::Session(client) => client.execute(request).await,
            Self::Public(client) => client.execute(request).await,
        }
    }

    /// Execute a request and unwrap the envelope's `data`
    ///
    /// # Errors
    ///
    /// See [`SessionClient::execute_data`]
    pub async fn execute_data<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClientError> {
        match self {
            Self::Session(client) => client.execute_data(request).await,
            Self::Public(client) => client.execute_data(request).await,
        }
    }
}

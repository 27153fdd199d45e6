//! Typed clients for the storefront services
//!
//! [`PublicClient`] is a plain pass-through: it never reads credentials and
//! never retries. [`SessionClient`] runs every request through the session
//! hooks, attaching a fresh bearer before sending and recovering from a 401 by
//! refreshing once and replaying.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use storefront_core::{CredentialStore, HttpConfig, Service, StorefrontConfig};
use tokio::sync::{broadcast, watch};
use tracing::{debug, instrument, warn};

use super::ClientError;
use super::request::ApiRequest;
use super::session::{Session, SessionEvent, SessionOptions};
use crate::types::ApiEnvelope;

const DEFAULT_USER_AGENT: &str = concat!("storefront-client/", env!("CARGO_PKG_VERSION"));

/// Client for endpoints that must never carry credentials
#[derive(Clone)]
pub struct PublicClient {
    client: Client,
    base_url: String,
}

/// Client for endpoints that require a logged in user
///
/// Clones share the same session, so they also share refresh state.
#[derive(Clone)]
pub struct SessionClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

fn http_client(
    timeout: Option<Duration>,
    user_agent: Option<&str>,
) -> Result<Client, ClientError> {
    let mut builder = ClientBuilder::new().user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

fn normalize_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    let message = response.text().await.unwrap_or_else(|_| status.to_string());
    ClientError::from_status(status, message)
}

/// Turn a response into `T`, mapping non-2xx statuses to typed errors
///
/// An empty success body decodes as JSON `null`.
async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let bytes = response.bytes().await?;
    let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    Ok(serde_json::from_slice(body)?)
}

/// Request helpers layered on each client's `send`
macro_rules! request_helpers {
    ($client:ty) => {
        impl $client {
            /// Get the base URL
            pub fn base_url(&self) -> &str {
                &self.base_url
            }

            /// Execute a request and decode the JSON body
            ///
            /// # Errors
            ///
            /// Returns an error on transport failure, a non-2xx status or a
            /// body that does not decode as `T`
            pub async fn execute<T: DeserializeOwned>(
                &self,
                request: ApiRequest,
            ) -> Result<T, ClientError> {
                decode_response(self.send(request).await?).await
            }

            /// Execute a request and unwrap the `data` field of the envelope
            ///
            /// # Errors
            ///
            /// Same as [`Self::execute`]; a body without `data` is a
            /// serialization error
            pub async fn execute_data<T: DeserializeOwned>(
                &self,
                request: ApiRequest,
            ) -> Result<T, ClientError> {
                self.execute::<ApiEnvelope<T>>(request)
                    .await
                    .map(ApiEnvelope::into_data)
            }

            /// Execute a request whose response body is irrelevant
            ///
            /// # Errors
            ///
            /// Returns an error on transport failure or a non-2xx status
            pub async fn execute_no_content(
                &self,
                request: ApiRequest,
            ) -> Result<(), ClientError> {
                let response = self.send(request).await?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(error_from_response(response).await)
                }
            }

            /// GET `path` and decode the body
            ///
            /// # Errors
            ///
            /// See [`Self::execute`]
            pub async fn get<T>(&self, path: &str) -> Result<T, ClientError>
            where
                T: DeserializeOwned,
            {
                self.execute(ApiRequest::get(path)).await
            }

            /// POST `body` as JSON to `path` and decode the response
            ///
            /// # Errors
            ///
            /// See [`Self::execute`]
            pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
            where
                B: Serialize + ?Sized,
                T: DeserializeOwned,
            {
                self.execute(ApiRequest::post(path).json(body)?).await
            }

            /// PUT `body` as JSON to `path` and decode the response
            ///
            /// # Errors
            ///
            /// See [`Self::execute`]
            pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
            where
                B: Serialize + ?Sized,
                T: DeserializeOwned,
            {
                self.execute(ApiRequest::put(path).json(body)?).await
            }

            /// DELETE `path` and decode the body
            ///
            /// # Errors
            ///
            /// See [`Self::execute`]
            pub async fn delete<T>(&self, path: &str) -> Result<T, ClientError>
            where
                T: DeserializeOwned,
            {
                self.execute(ApiRequest::delete(path)).await
            }
        }
    };
}

request_helpers!(PublicClient);
request_helpers!(SessionClient);

impl PublicClient {
    /// Create a new public client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be initialised
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        TypedClientBuilder::new().base_url(base_url).build_public()
    }

    /// Public client for one of the configured services
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be initialised
    pub fn for_service(config: &StorefrontConfig, service: Service) -> Result<Self, ClientError> {
        TypedClientBuilder::from_config(&config.http)
            .base_url(config.services.base_url(service))
            .build_public()
    }

    /// Send a request as-is
    ///
    /// # Errors
    ///
    /// Returns an error only on transport failure; every status is passed
    /// through
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ClientError> {
        Ok(request
            .to_builder(&self.client, &self.base_url, None)
            .send()
            .await?)
    }
}

impl SessionClient {
    /// Session client for one of the configured services
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be initialised
    pub fn for_service(
        config: &StorefrontConfig,
        service: Service,
        options: SessionOptions,
    ) -> Result<Self, ClientError> {
        TypedClientBuilder::from_config(&config.http)
            .base_url(config.services.base_url(service))
            .build_session(options)
    }

    /// Send a request through the session hooks
    ///
    /// The bearer is refreshed first if it is about to expire. A 401 on a
    /// request that has not been replayed yet triggers one refresh, shared
    /// with any concurrent requests, followed by a single replay. Any other
    /// status is passed through.
    ///
    /// # Errors
    ///
    /// Returns the refresh error when no fresh credential can be obtained and
    /// [`ClientError::AuthenticationFailed`] when a replayed request is
    /// rejected again
    #[instrument(skip_all, fields(method = %request.method(), path = request.path()))]
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ClientError> {
        let token = self.session.outgoing_token().await?;
        let response = request
            .to_builder(&self.client, &self.base_url, Some(&token))
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if request.is_retried() {
            debug!("Replayed request rejected, not refreshing again");
            return Err(error_from_response(response).await);
        }

        debug!("Received 401, recovering session");
        let refreshed = self.session.recover(Some(&token)).await?;

        let replay = request.into_retry();
        let response = replay
            .to_builder(&self.client, &self.base_url, Some(&refreshed))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Request rejected again after credential refresh");
            return Err(error_from_response(response).await);
        }

        Ok(response)
    }

    /// The `Authorization` value set by the last login or refresh
    pub fn authorization(&self) -> Option<String> {
        self.session.default_bearer()
    }

    /// Whether a credential refresh is in flight right now
    pub fn is_refreshing(&self) -> bool {
        self.session.is_refreshing()
    }

    /// Follow the refresh indicator
    pub fn subscribe_refreshing(&self) -> watch::Receiver<bool> {
        self.session.subscribe_refreshing()
    }

    /// Follow login, refresh and logout events
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe_events()
    }

    /// The credential store backing this session
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        self.session.store()
    }

    /// Same session and transport against another base URL
    #[must_use]
    pub fn with_base_url(&self, base_url: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: normalize_base_url(base_url),
            session: Arc::clone(&self.session),
        }
    }

    /// Create a public client (useful for calling public endpoints)
    pub fn to_public(&self) -> PublicClient {
        PublicClient {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
        }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }
}

/// Type-safe builder that creates the appropriate client type
#[derive(Debug, Default)]
pub struct TypedClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl TypedClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preset with the transport settings from configuration
    pub fn from_config(config: &HttpConfig) -> Self {
        let mut builder = Self::new().user_agent(config.user_agent.clone());
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        builder
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    fn parts(self) -> Result<(Client, String), ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url}: {e}")))?;

        let client = http_client(self.timeout, self.user_agent.as_deref())?;
        Ok((client, normalize_base_url(base_url)))
    }

    /// Build a public client
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] without a valid base URL
    pub fn build_public(self) -> Result<PublicClient, ClientError> {
        let (client, base_url) = self.parts()?;
        Ok(PublicClient { client, base_url })
    }

    /// Build a session client with its own refresh state
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] without a valid base URL or
    /// refresh URL
    pub fn build_session(self, options: SessionOptions) -> Result<SessionClient, ClientError> {
        url::Url::parse(&options.refresh_url).map_err(|e| {
            ClientError::Configuration(format!("invalid refresh url {}: {e}", options.refresh_url))
        })?;

        let (client, base_url) = self.parts()?;
        let session = Session::new(client.clone(), options);
        Ok(SessionClient {
            client,
            base_url,
            session: Arc::new(session),
        })
    }
}

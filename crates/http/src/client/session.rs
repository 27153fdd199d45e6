//! Session state behind an authenticated client
//!
//! Holds the credential store handle, the refresh coordinator and the default
//! bearer of one client instance. This is the only place that writes the
//! credential pair or forces a logout.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use storefront_core::{AuthConfig, CredentialPair, CredentialStore, is_expired};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use super::error::{ClientError, RefreshFailure};
use super::refresh::{Outcome, RefreshCoordinator, SharedFailure};
use crate::types::{ApiEnvelope, RefreshRequest};

const EVENT_CAPACITY: usize = 16;

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user logged out
    UserRequested,
    /// A refresh was needed but no refresh token was stored
    RefreshUnavailable,
    /// The refresh endpoint rejected the refresh token or was unreachable
    RefreshFailed(String),
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserRequested => f.write_str("user requested"),
            Self::RefreshUnavailable => f.write_str("no refresh token"),
            Self::RefreshFailed(message) => write!(f, "refresh failed: {message}"),
        }
    }
}

/// Session lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    LoggedOut { reason: LogoutReason },
}

/// Receives the landing route when a session ends
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: &str) {
        debug!("No navigator registered, ignoring navigation to {route}");
    }
}

/// Everything an authenticated client needs besides its transport
#[derive(Clone)]
pub struct SessionOptions {
    pub store: Arc<dyn CredentialStore>,
    pub refresh_url: String,
    pub expiry_buffer_secs: i64,
    pub landing_route: String,
    pub navigator: Arc<dyn Navigator>,
}

impl SessionOptions {
    pub fn new(store: Arc<dyn CredentialStore>, refresh_url: impl Into<String>) -> Self {
        let defaults = AuthConfig::default();
        Self {
            store,
            refresh_url: refresh_url.into(),
            expiry_buffer_secs: defaults.expiry_buffer_secs,
            landing_route: defaults.landing_route,
            navigator: Arc::new(NoopNavigator),
        }
    }

    pub fn from_config(config: &AuthConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            refresh_url: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                config.refresh_path
            ),
            expiry_buffer_secs: config.expiry_buffer_secs,
            landing_route: config.landing_route.clone(),
            navigator: Arc::new(NoopNavigator),
        }
    }

    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    #[must_use]
    pub const fn expiry_buffer_secs(mut self, secs: i64) -> Self {
        self.expiry_buffer_secs = secs;
        self
    }

    #[must_use]
    pub fn landing_route(mut self, route: impl Into<String>) -> Self {
        self.landing_route = route.into();
        self
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("store", &self.store)
            .field("refresh_url", &self.refresh_url)
            .field("expiry_buffer_secs", &self.expiry_buffer_secs)
            .field("landing_route", &self.landing_route)
            .finish_non_exhaustive()
    }
}

pub(crate) struct Session {
    http: reqwest::Client,
    store: Arc<dyn CredentialStore>,
    refresh_url: String,
    expiry_buffer_secs: i64,
    landing_route: String,
    navigator: Arc<dyn Navigator>,
    coordinator: RefreshCoordinator,
    default_bearer: ArcSwapOption<String>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub(crate) fn new(http: reqwest::Client, options: SessionOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            http,
            store: options.store,
            refresh_url: options.refresh_url,
            expiry_buffer_secs: options.expiry_buffer_secs,
            landing_route: options.landing_route,
            navigator: options.navigator,
            coordinator: RefreshCoordinator::new(),
            default_bearer: ArcSwapOption::empty(),
            events,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Token for an outgoing request, refreshed first if it is expiring
    pub(crate) async fn outgoing_token(&self) -> Result<String, ClientError> {
        let current = self.store.access_token()?;
        if let Some(token) = current
            .as_deref()
            .filter(|token| !is_expired(Some(*token), self.expiry_buffer_secs))
        {
            return Ok(token.to_string());
        }

        debug!("Access token missing or about to expire, refreshing before sending");
        self.refresh(current).await
    }

    /// Recover from a 401 received while presenting `observed`
    pub(crate) async fn recover(&self, observed: Option<&str>) -> Result<String, ClientError> {
        self.refresh(observed.map(str::to_string)).await
    }

    async fn refresh(&self, observed: Option<String>) -> Result<String, ClientError> {
        self.coordinator
            .run(|| self.perform_refresh(observed))
            .await
            .map_err(ClientError::from)
    }

    /// Body of a refresh, run by the single-flight leader only
    #[instrument(skip_all)]
    async fn perform_refresh(&self, observed: Option<String>) -> Outcome {
        match self.store.access_token() {
            Ok(Some(current))
                if observed.as_deref() != Some(current.as_str())
                    && !is_expired(Some(&current), self.expiry_buffer_secs) =>
            {
                debug!("Stored access token already replaced, skipping refresh");
                return Ok(current);
            }
            Ok(_) => {}
            Err(err) => warn!("Could not read access token before refresh: {err}"),
        }

        let refresh_token = match self.store.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!("Refresh needed but no refresh token is stored");
                self.force_logout(LogoutReason::RefreshUnavailable);
                return Err(SharedFailure::Unavailable);
            }
            Err(err) => {
                let failure = RefreshFailure::new(None, format!("credential store: {err}"));
                return Err(self.fail(failure));
            }
        };

        debug!("Refreshing access token");
        let pair = match self.call_refresh(&refresh_token).await {
            Ok(pair) => pair,
            Err(failure) => return Err(self.fail(failure)),
        };

        if let Err(err) = self.store.save_credentials(&pair) {
            let message = format!("could not persist credentials: {err}");
            return Err(self.fail(RefreshFailure::new(None, message)));
        }

        self.set_default_bearer(Some(&pair.access_token));
        let _ = self.events.send(SessionEvent::Refreshed);
        info!("Access token refreshed");
        Ok(pair.access_token)
    }

    fn fail(&self, failure: RefreshFailure) -> SharedFailure {
        warn!("{failure}");
        self.force_logout(LogoutReason::RefreshFailed(failure.message.clone()));
        SharedFailure::Failed(failure)
    }

    /// The refresh endpoint round trip; no hooks apply to it
    async fn call_refresh(&self, refresh_token: &str) -> Result<CredentialPair, RefreshFailure> {
        let response = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| RefreshFailure::new(None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(RefreshFailure::new(Some(status.as_u16()), message));
        }

        let envelope: ApiEnvelope<CredentialPair> = response.json().await.map_err(|e| {
            RefreshFailure::new(
                Some(status.as_u16()),
                format!("unexpected refresh response: {e}"),
            )
        })?;

        let pair = envelope.into_data();
        if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(RefreshFailure::new(
                Some(status.as_u16()),
                "refresh response carried an empty token",
            ));
        }

        Ok(pair)
    }

    /// Adopt a freshly issued pair, e.g. after login
    pub(crate) fn establish(&self, pair: &CredentialPair) -> Result<(), ClientError> {
        self.store.save_credentials(pair)?;
        self.set_default_bearer(Some(&pair.access_token));
        let _ = self.events.send(SessionEvent::LoggedIn);
        Ok(())
    }

    /// Clear credentials, navigate to the landing route and announce it
    pub(crate) fn force_logout(&self, reason: LogoutReason) {
        match &reason {
            LogoutReason::UserRequested => info!("Logging out"),
            _ => warn!(%reason, "Forcing logout"),
        }

        if let Err(err) = self.store.clear_credentials() {
            warn!("Failed to clear stored credentials: {err}");
        }
        self.set_default_bearer(None);
        self.navigator.navigate(&self.landing_route);
        let _ = self.events.send(SessionEvent::LoggedOut { reason });
    }

    fn set_default_bearer(&self, token: Option<&str>) {
        self.default_bearer
            .store(token.map(|token| Arc::new(format!("Bearer {token}"))));
    }

    pub(crate) fn default_bearer(&self) -> Option<String> {
        self.default_bearer.load_full().map(|value| value.as_ref().clone())
    }

    pub(crate) fn is_refreshing(&self) -> bool {
        self.coordinator.is_in_flight()
    }

    pub(crate) fn subscribe_refreshing(&self) -> watch::Receiver<bool> {
        self.coordinator.subscribe()
    }

    pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

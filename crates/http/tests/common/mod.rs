//! Shared fixtures for the client integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use storefront_core::{CredentialPair, MemoryStore};
use storefront_http::{Navigator, SessionClient, SessionOptions, TypedClientBuilder};
use wiremock::MockServer;

/// JWT-shaped token expiring `offset_secs` from now; the signature is junk
pub fn token_expiring_in(offset_secs: i64, sub: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + offset_secs;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": sub, "exp": exp }).to_string());
    format!("{header}.{payload}.signature")
}

pub fn valid_token(sub: &str) -> String {
    token_expiring_in(3600, sub)
}

pub fn expired_token(sub: &str) -> String {
    token_expiring_in(-10, sub)
}

pub fn refresh_body(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "code": 200,
        "message": "OK",
        "data": { "accessToken": access_token, "refreshToken": refresh_token }
    })
}

/// Navigator that remembers every route it was sent to
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

pub struct Harness {
    pub server: MockServer,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub client: SessionClient,
}

impl Harness {
    /// Session client against a fresh mock server, refreshing at `/auth/refresh`
    pub async fn start(store: MemoryStore) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(store);
        let navigator = Arc::new(RecordingNavigator::default());

        let options = SessionOptions::new(store.clone(), format!("{}/auth/refresh", server.uri()))
            .navigator(navigator.clone());
        let client = TypedClientBuilder::new()
            .base_url(server.uri())
            .build_session(options)
            .unwrap();

        Self {
            server,
            store,
            navigator,
            client,
        }
    }

    pub async fn with_credentials(access_token: &str, refresh_token: &str) -> Self {
        Self::start(MemoryStore::with_credentials(&CredentialPair::new(
            access_token,
            refresh_token,
        )))
        .await
    }
}

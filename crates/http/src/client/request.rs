//! Request context passed through the session hooks

use reqwest::{Client, Method, RequestBuilder, header};
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::ClientError;

/// A request relative to a client's base URL
///
/// The value is immutable once built. Replaying after a credential refresh
/// produces a new context via [`ApiRequest::into_retry`] rather than flagging
/// the original.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<JsonValue>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serialize `body` as the JSON request body
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] if `body` cannot be represented
    /// as JSON
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ClientError> {
        Ok(self.with_json(serde_json::to_value(body)?))
    }

    /// Use an already built JSON value as the request body
    #[must_use]
    pub fn with_json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn body(&self) -> Option<&JsonValue> {
        self.body.as_ref()
    }

    /// Whether this request is already the replay after a refresh
    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    /// The replay of this request, marked so it is never refreshed again
    #[must_use]
    pub fn into_retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }

    /// Absolute URL of this request against `base_url`
    pub fn url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if self.path.is_empty() {
            base.to_string()
        } else if self.path.starts_with('/') {
            format!("{base}{}", self.path)
        } else {
            format!("{base}/{}", self.path)
        }
    }

    pub(crate) fn to_builder(
        &self,
        client: &Client,
        base_url: &str,
        bearer: Option<&str>,
    ) -> RequestBuilder {
        let mut builder = client.request(self.method.clone(), self.url(base_url));

        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }

        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        if let Some(body) = &self.body {
            builder = builder.json(body);
        }

        builder
    }
}

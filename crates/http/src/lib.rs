//! Session-aware HTTP clients for the storefront backend services
//!
//! [`client::SessionClient`] keeps the bearer credential fresh: it refreshes
//! an expiring token before sending, and recovers from a 401 with a single
//! refresh shared by all concurrent requests before replaying once.
//! [`client::PublicClient`] is the credential-free variant for guest calls.

pub mod client;
pub mod types;

pub use client::{
    AnyClient, ApiRequest, AuthApi, ClientError, ClientFactory, LogoutReason, Navigator,
    NoopNavigator, PublicClient, RefreshFailure, SessionClient, SessionEvent, SessionOptions,
    TypedClientBuilder,
};
pub use types::{ApiEnvelope, LoginRequest, RegisterRequest, UserProfile};

pub type Result<T> = std::result::Result<T, ClientError>;

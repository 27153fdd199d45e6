//! Storefront core types and utilities
//!
//! Everything the HTTP client needs that does not touch the network:
//! credential persistence, access token inspection, configuration loading
//! and tracing setup.

pub mod config;
pub mod credentials;
pub mod error;
pub mod state_dir;
pub mod token;
pub mod tracing;

pub use config::{
    AuthConfig, HttpConfig, Service, ServiceEndpoints, StorageConfig, StorefrontConfig,
};
pub use credentials::{
    ACCESS_TOKEN_KEY, CredentialPair, CredentialStore, FileStore, MemoryStore, REFRESH_TOKEN_KEY,
};
pub use error::{CoreError, CoreResult, ErrorContext, StorageError};
pub use state_dir::StateDir;
pub use token::{DEFAULT_EXPIRY_BUFFER_SECS, TokenClaims, TokenError, decode_claims, is_expired};

//! Configuration management for the storefront client

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ErrorContext};
use crate::token::DEFAULT_EXPIRY_BUFFER_SECS;

const ENV_PREFIX: &str = "STOREFRONT";

/// Main client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Auth service and session policy
    pub auth: AuthConfig,

    /// Transport settings shared by every client
    pub http: HttpConfig,

    /// Base URLs of the backend services
    pub services: ServiceEndpoints,

    /// Where the credential pair is persisted
    pub storage: StorageConfig,
}

/// Auth service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL of the auth endpoints (login, refresh, logout)
    pub base_url: String,

    /// Path of the credential refresh endpoint
    pub refresh_path: String,

    /// Seconds before expiry at which the access token is refreshed
    pub expiry_buffer_secs: i64,

    /// Route a forced logout navigates to
    pub landing_route: String,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds, 0 for the transport default
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

/// Credential storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Credentials file, defaults to the platform data directory
    pub credentials_file: Option<PathBuf>,
}

/// Backend services reachable from the storefront
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Account,
    Product,
    Inventory,
    Order,
    Role,
    Cart,
}

impl Service {
    pub const ALL: [Self; 6] = [
        Self::Account,
        Self::Product,
        Self::Inventory,
        Self::Order,
        Self::Role,
        Self::Cart,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Product => "product",
            Self::Inventory => "inventory",
            Self::Order => "order",
            Self::Role => "role",
            Self::Cart => "cart",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|service| service.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::invalid_config(format!("unknown service: {s}")))
    }
}

/// Base URL of every backend service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpoints {
    pub account: String,
    pub product: String,
    pub inventory: String,
    pub order: String,
    pub role: String,
    pub cart: String,
}

impl ServiceEndpoints {
    pub fn base_url(&self, service: Service) -> &str {
        match service {
            Service::Account => &self.account,
            Service::Product => &self.product,
            Service::Inventory => &self.inventory,
            Service::Order => &self.order,
            Service::Role => &self.role,
            Service::Cart => &self.cart,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9003".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            expiry_buffer_secs: DEFAULT_EXPIRY_BUFFER_SECS,
            landing_route: "/".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 0,
            user_agent: concat!("storefront-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            account: "http://localhost:8080".to_string(),
            product: "http://localhost:9001".to_string(),
            inventory: "http://localhost:8080/api/v1/inventory-items".to_string(),
            order: "http://localhost:8080/apis/v1/users/orders".to_string(),
            role: "http://localhost:8080".to_string(),
            cart: "http://localhost:9008/api/carts".to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from file, with environment overrides on top
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let settings = Self::builder_with_defaults()?
            .add_source(config::File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()?;

        settings.try_deserialize::<Self>()?.validated()
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> CoreResult<Self> {
        let settings = Self::builder_with_defaults()?
            .add_source(Self::environment())
            .build()?;

        settings.try_deserialize::<Self>()?.validated()
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    fn builder_with_defaults()
    -> CoreResult<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("auth.base_url", defaults.auth.base_url)?
            .set_default("auth.refresh_path", defaults.auth.refresh_path)?
            .set_default("auth.expiry_buffer_secs", defaults.auth.expiry_buffer_secs)?
            .set_default("auth.landing_route", defaults.auth.landing_route)?
            .set_default("http.timeout_secs", defaults.http.timeout_secs)?
            .set_default("http.user_agent", defaults.http.user_agent)?;

        for service in Service::ALL {
            builder = builder.set_default(
                format!("services.{service}"),
                defaults.services.base_url(service).to_string(),
            )?;
        }

        Ok(builder)
    }

    /// Reject values the client cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] naming the offending field
    pub fn validated(self) -> CoreResult<Self> {
        url::Url::parse(&self.auth.base_url)
            .with_context_str("auth.base_url")
            .map_err(CoreError::invalid_config)?;

        if !self.auth.refresh_path.starts_with('/') {
            return Err(CoreError::invalid_config(
                "auth.refresh_path must start with '/'",
            ));
        }

        if self.auth.expiry_buffer_secs < 0 {
            return Err(CoreError::invalid_config(
                "auth.expiry_buffer_secs must not be negative",
            ));
        }

        for service in Service::ALL {
            url::Url::parse(self.services.base_url(service))
                .with_context(|| format!("services.{service}"))
                .map_err(CoreError::invalid_config)?;
        }

        Ok(self)
    }

    /// Full URL of the refresh endpoint
    pub fn refresh_url(&self) -> String {
        format!(
            "{}{}",
            self.auth.base_url.trim_end_matches('/'),
            self.auth.refresh_path
        )
    }
}

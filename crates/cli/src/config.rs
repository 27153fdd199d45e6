//! CLI configuration utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storefront_core::{FileStore, StateDir, StorefrontConfig};
use storefront_http::{ClientFactory, Navigator};
use tracing::{debug, info};

/// Tells the user their session ended, since a terminal has nowhere to navigate
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: &str) {
        eprintln!("Session ended. Run `storefront login` to sign in again (landing route: {route})");
    }
}

/// Everything a command needs, resolved once at startup
pub struct CliContext {
    pub config: StorefrontConfig,
    pub store: Arc<FileStore>,
    pub factory: ClientFactory,
}

impl CliContext {
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let state_dir = data_dir.map_or_else(StateDir::new, StateDir::with_override);
        let config = load_config(config_path, &state_dir)?;

        let credentials_path = credentials_path(&config, &state_dir);
        debug!("Using credentials file {}", credentials_path.display());
        let store = Arc::new(FileStore::new(credentials_path));

        let factory =
            ClientFactory::with_navigator(config.clone(), store.clone(), Arc::new(TerminalNavigator))
                .context("Failed to build HTTP clients")?;

        Ok(Self {
            config,
            store,
            factory,
        })
    }
}

/// Load configuration from an explicit file, the default file if present, or
/// defaults plus environment
pub fn load_config(path: Option<&Path>, state_dir: &StateDir) -> Result<StorefrontConfig> {
    if let Some(path) = path {
        info!("Loading configuration from: {}", path.display());
        return StorefrontConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()));
    }

    let default_path = state_dir.config_path();
    if default_path.exists() {
        info!("Loading configuration from: {}", default_path.display());
        StorefrontConfig::from_file(&default_path).with_context(|| {
            format!(
                "Failed to load configuration from {}",
                default_path.display()
            )
        })
    } else {
        debug!("Using default configuration with environment overrides");
        StorefrontConfig::from_env().context("Failed to load configuration from environment")
    }
}

pub fn credentials_path(config: &StorefrontConfig, state_dir: &StateDir) -> PathBuf {
    config
        .storage
        .credentials_file
        .clone()
        .unwrap_or_else(|| state_dir.credentials_path())
}

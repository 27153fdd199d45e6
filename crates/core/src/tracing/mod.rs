//! Tracing setup shared by the storefront binaries

pub mod config;
pub mod init;

pub use config::{InstrumentationConfig, LogFormat};
pub use init::{init_default, init_dev, init_tracing};

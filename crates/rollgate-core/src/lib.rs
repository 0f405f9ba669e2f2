//! rollgate-core — shared types for the rollgate deployment tool.
//!
//! # Components
//!
//! - **`config`** — `DeployConfig` loading (YAML or TOML) and validation
//! - **`result`** — `DeployResult` terminal outcomes and `DeployStage`
//! - **`error`** — `ConfigError`

pub mod config;
pub mod error;
pub mod result;

pub use config::DeployConfig;
pub use error::{ConfigError, ConfigResult};
pub use result::{DeployResult, DeployStage};

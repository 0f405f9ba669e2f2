//! Deploy configuration parser.
//!
//! A config file names the service to update and the rollout policy.
//! The image reference is never read from the file: it always comes
//! from the invocation.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// RFC 1123 label, as Kubernetes enforces for object names and namespaces.
static DNS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

const MAX_LABEL_LEN: usize = 63;

/// Cluster-internal DNS suffix used to reach a service.
pub const CLUSTER_DOMAIN: &str = "svc.cluster.local";

/// Immutable input to a single deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    pub service_name: String,
    /// Target image reference (`repo/name:tag`).
    pub image: String,
    pub namespace: String,
    /// Desired replica count.
    pub replicas: u32,
    pub health_check_path: String,
    /// Upper bound for the rollout wait, in seconds.
    pub timeout_seconds: u64,
    pub rollback_on_failure: bool,
}

/// On-disk shape of a config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    service_name: String,
    #[serde(default = "default_namespace")]
    namespace: String,
    #[serde(default = "default_replicas")]
    replicas: u32,
    #[serde(default = "default_health_check_path")]
    health_check_path: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_rollback_on_failure")]
    rollback_on_failure: bool,
    /// Tolerated for compatibility; the invocation's image always wins.
    #[serde(default, rename = "image_tag")]
    _image_tag: Option<String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_replicas() -> u32 {
    3
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_rollback_on_failure() -> bool {
    true
}

/// Supported config encodings, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Toml,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Yaml,
        }
    }
}

impl DeployConfig {
    /// Build a config with the default policy for `service_name`.
    pub fn new(service_name: &str, image: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            image: image.to_string(),
            namespace: default_namespace(),
            replicas: default_replicas(),
            health_check_path: default_health_check_path(),
            timeout_seconds: default_timeout_seconds(),
            rollback_on_failure: default_rollback_on_failure(),
        }
    }

    /// Load and validate a config file, overriding the image with `image`.
    pub fn from_file(path: &Path, image: &str) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_err = |reason: String| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        };
        let file: ConfigFile = match Format::for_path(path) {
            Format::Toml => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
            Format::Yaml => serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        };

        let config = Self::from_parts(file, image);
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML config content, overriding the image with `image`.
    pub fn from_yaml_str(content: &str, image: &str) -> ConfigResult<Self> {
        let file: ConfigFile = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            reason: e.to_string(),
        })?;
        let config = Self::from_parts(file, image);
        config.validate()?;
        Ok(config)
    }

    fn from_parts(file: ConfigFile, image: &str) -> Self {
        Self {
            service_name: file.service_name,
            image: image.to_string(),
            namespace: file.namespace,
            replicas: file.replicas,
            health_check_path: file.health_check_path,
            timeout_seconds: file.timeout_seconds,
            rollback_on_failure: file.rollback_on_failure,
        }
    }

    /// Check the config invariants.
    pub fn validate(&self) -> ConfigResult<()> {
        check_label("service_name", &self.service_name)?;
        check_label("namespace", &self.namespace)?;

        if self.image.is_empty() || self.image.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "image reference {:?} must be non-empty and contain no whitespace",
                self.image
            )));
        }
        if self.replicas < 1 {
            return Err(ConfigError::Invalid("replicas must be at least 1".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if !self.health_check_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "health_check_path {:?} must start with '/'",
                self.health_check_path
            )));
        }
        let url = self.health_url();
        if url.parse::<http::Uri>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "health_check_path {:?} does not form a valid URL ({url})",
                self.health_check_path
            )));
        }
        Ok(())
    }

    /// Cluster-internal URL probed after the rollout completes.
    pub fn health_url(&self) -> String {
        format!(
            "http://{}.{}.{CLUSTER_DOMAIN}{}",
            self.service_name, self.namespace, self.health_check_path
        )
    }

    /// Rollout wait bound as a `Duration`.
    pub fn rollout_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn check_label(field: &str, value: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must not be empty")));
    }
    if value.len() > MAX_LABEL_LEN || !DNS_LABEL.is_match(value) {
        return Err(ConfigError::Invalid(format!(
            "{field} {value:?} is not a valid DNS label"
        )));
    }
    Ok(())
}

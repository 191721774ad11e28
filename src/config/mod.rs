// ABOUTME: Server configuration (exoframe-server.yml) and per-project overrides.
// ABOUTME: YAML discovery and loading, defaults, validation and the template store.

mod init;
mod project;
mod restart_policy;
mod template;

pub use init::init_config;
pub use project::{Domain, PROJECT_CONFIG_FILENAME, ProjectConfig, ProjectConfigError};
pub use restart_policy::RestartPolicy;
pub use template::{TemplateDefinition, TemplateStore};

use crate::error::{Error, Result};
use crate::runtime::{RuntimeConfig, RuntimeType};
use crate::types::Slug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "exoframe-server.yml";
pub const CONFIG_FILENAME_ALT: &str = "exoframe-server.yaml";

pub const DEFAULT_NETWORK: &str = "exoframe";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Shared network every deployment joins; the reverse proxy watches it.
    #[serde(default = "default_network")]
    pub network: String,

    #[serde(default = "default_name_prefix")]
    pub name_prefix: Slug,

    /// User recorded when a request carries no user header.
    #[serde(default = "default_user")]
    pub default_user: Slug,

    #[serde(default)]
    pub default_restart: RestartPolicy,

    /// Upper bound on an uploaded archive, in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,

    #[serde(default)]
    pub runtime: Option<RuntimeType>,

    #[serde(default)]
    pub socket: Option<String>,

    #[serde(default = "default_runtime_timeout", with = "humantime_serde")]
    pub runtime_timeout: Duration,

    #[serde(default)]
    pub default_template: Option<String>,

    #[serde(default)]
    pub templates: BTreeMap<String, TemplateDefinition>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_network() -> String {
    DEFAULT_NETWORK.to_string()
}

fn default_name_prefix() -> Slug {
    Slug::trusted("exo")
}

fn default_user() -> Slug {
    Slug::trusted("admin")
}

fn default_max_upload_size() -> usize {
    512 * 1024 * 1024
}

fn default_runtime_timeout() -> Duration {
    Duration::from_secs(120)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            network: default_network(),
            name_prefix: default_name_prefix(),
            default_user: default_user(),
            default_restart: RestartPolicy::default(),
            max_upload_size: default_max_upload_size(),
            runtime: None,
            socket: None,
            runtime_timeout: default_runtime_timeout(),
            default_template: None,
            templates: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        if let Some(base) = path.parent() {
            for template in config.templates.values_mut() {
                template.anchor(base);
            }
        }
        Ok(config)
    }

    /// Load from `dir`, or fall back to defaults when no config file exists.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [dir.join(CONFIG_FILENAME), dir.join(CONFIG_FILENAME_ALT)];

        match candidates.iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading server config");
                Self::load(path)
            }
            None => {
                tracing::debug!(dir = %dir.display(), "no server config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Explicit `--config` path; unlike discovery, a missing file is an error.
    pub fn load_explicit(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        Self::load(path)
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            runtime: self.runtime,
            socket: self.socket.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.network.trim().is_empty() {
            return Err(Error::InvalidConfig("network name cannot be empty".into()));
        }
        if self.max_upload_size == 0 {
            return Err(Error::InvalidConfig(
                "max_upload_size must be greater than zero".into(),
            ));
        }
        for (name, template) in &self.templates {
            template.validate(name).map_err(Error::InvalidConfig)?;
        }
        if let Some(name) = &self.default_template
            && !self.templates.contains_key(name)
        {
            return Err(Error::InvalidConfig(format!(
                "default_template '{}' is not defined under templates",
                name
            )));
        }
        Ok(())
    }
}

impl TemplateStore for ServerConfig {
    fn template(&self, name: &str) -> Option<TemplateDefinition> {
        self.templates.get(name).cloned()
    }

    fn default_template(&self) -> Option<String> {
        self.default_template.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = ServerConfig::from_yaml("{}").unwrap();
        assert_eq!(config.network, "exoframe");
        assert_eq!(config.name_prefix.as_str(), "exo");
        assert_eq!(config.default_user.as_str(), "admin");
        assert_eq!(config.listen.port(), 8080);
        assert_eq!(config.runtime_timeout, Duration::from_secs(120));
        assert_eq!(config.default_restart.to_string(), "on-failure:2");
    }

    #[test]
    fn unknown_default_template_is_rejected() {
        let err = ServerConfig::from_yaml("default_template: missing\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn template_store_lookup() {
        let config = ServerConfig::from_yaml(
            r#"
default_template: static
templates:
  static:
    display_name: Static HTML
    dockerfile: |
      FROM nginx:latest
      COPY . /usr/share/nginx/html
"#,
        )
        .unwrap();
        assert_eq!(config.default_template().as_deref(), Some("static"));
        let tpl = config.template("static").unwrap();
        assert_eq!(tpl.display_name("static"), "Static HTML");
        assert!(config.template("nope").is_none());
    }

    #[test]
    fn discover_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::discover(dir.path()).unwrap();
        assert_eq!(config.network, DEFAULT_NETWORK);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load_explicit(&dir.path().join("nope.yml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }
}

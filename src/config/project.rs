// ABOUTME: Per-project overrides read from an optional exoframe.json in the upload.
// ABOUTME: Name, project label, domain, restart policy, labels, env, ports, template.

use super::RestartPolicy;
use crate::types::Slug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const PROJECT_CONFIG_FILENAME: &str = "exoframe.json";

/// Routing host requested by the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Domain {
    /// Route `Host:<name>` to this deployment.
    Host(String),
    /// Never emit a routing rule, even where the recipe would default one.
    Disabled,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: Option<Slug>,

    /// Value for the `exoframe.project` label when it differs from `name`.
    #[serde(default)]
    pub project: Option<String>,

    #[serde(default, deserialize_with = "deserialize_domain")]
    pub domain: Option<Domain>,

    #[serde(default)]
    pub restart: Option<RestartPolicy>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub ports: Vec<String>,

    #[serde(default)]
    pub template: Option<String>,
}

impl ProjectConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read `exoframe.json` from a project root. A missing file is an empty config.
    pub fn read(root: &Path) -> Result<Self, ProjectConfigError> {
        let path = root.join(PROJECT_CONFIG_FILENAME);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_json(&content).map_err(ProjectConfigError::Parse),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ProjectConfigError::Io(e)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectConfigError {
    #[error("invalid exoframe.json: {0}")]
    Parse(serde_json::Error),

    #[error("cannot read exoframe.json: {0}")]
    Io(std::io::Error),
}

fn deserialize_domain<'de, D>(deserializer: D) -> Result<Option<Domain>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Name(String),
        Flag(bool),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None | Some(Raw::Flag(true)) => None,
        Some(Raw::Flag(false)) => Some(Domain::Disabled),
        Some(Raw::Name(name)) if name.trim().is_empty() => Some(Domain::Disabled),
        Some(Raw::Name(name)) => Some(Domain::Host(name.trim().to_string())),
    })
}

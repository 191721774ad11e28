// ABOUTME: Reads a compose manifest into an ordered list of services.
// ABOUTME: Declaration order is preserved; unsupported keys are ignored.

use crate::config::RestartPolicy;
use crate::types::Slug;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

pub const MANIFEST_NAMES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ComposeManifest {
    pub services: Vec<ComposeService>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposeService {
    pub name: Slug,
    pub build: Option<ComposeBuild>,
    pub image: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub environment: BTreeMap<String, String>,
    pub ports: Vec<String>,
    pub volumes: Vec<String>,
    pub command: Option<Vec<String>>,
    pub restart: Option<RestartPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeBuild {
    /// Relative to the project root.
    pub context: String,
    pub dockerfile: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("invalid compose manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("compose manifest declares no services")]
    NoServices,

    #[error("invalid service name '{name}': {reason}")]
    ServiceName { name: String, reason: String },

    #[error("service '{service}': {reason}")]
    Service { service: String, reason: String },

    #[error("cannot read compose manifest: {0}")]
    Io(#[from] std::io::Error),
}

/// The first manifest file present in `root`, if any.
pub fn find_manifest(root: &Path) -> Option<&'static str> {
    MANIFEST_NAMES
        .into_iter()
        .find(|name| root.join(name).is_file())
}

#[derive(Deserialize)]
struct RawService {
    #[serde(default)]
    build: Option<RawBuild>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    labels: Option<Value>,
    #[serde(default)]
    environment: Option<Value>,
    #[serde(default)]
    ports: Vec<Value>,
    #[serde(default)]
    volumes: Vec<String>,
    #[serde(default)]
    command: Option<RawCommand>,
    #[serde(default)]
    restart: Option<RestartPolicy>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBuild {
    Context(String),
    Detailed {
        #[serde(default)]
        context: Option<String>,
        #[serde(default)]
        dockerfile: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCommand {
    Shell(String),
    Exec(Vec<String>),
}

impl ComposeManifest {
    pub fn read(path: &Path) -> Result<Self, ComposeError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(yaml: &str) -> Result<Self, ComposeError> {
        let doc: Value = serde_yaml::from_str(yaml)?;
        let services = doc
            .get("services")
            .and_then(Value::as_mapping)
            .ok_or(ComposeError::NoServices)?;

        // serde_yaml mappings keep insertion order.
        let mut parsed: Vec<ComposeService> = Vec::with_capacity(services.len());
        for (key, value) in services {
            let raw_name = scalar_to_string(key).unwrap_or_default();
            // Compose allows `[a-zA-Z0-9._-]`; container names are stricter.
            let name = Slug::from_lossy(&raw_name).ok_or_else(|| ComposeError::ServiceName {
                name: raw_name.clone(),
                reason: "no usable characters".to_string(),
            })?;
            if let Some(other) = parsed.iter().find(|s| s.name == name) {
                return Err(ComposeError::ServiceName {
                    name: raw_name,
                    reason: format!("collides with service '{}' as '{}'", other.name, name),
                });
            }
            let raw: RawService = serde_yaml::from_value(value.clone())?;
            parsed.push(ComposeService::from_raw(name, raw)?);
        }

        if parsed.is_empty() {
            return Err(ComposeError::NoServices);
        }
        Ok(Self { services: parsed })
    }
}

impl ComposeService {
    fn from_raw(name: Slug, raw: RawService) -> Result<Self, ComposeError> {
        let fail = |reason: String| ComposeError::Service {
            service: name.to_string(),
            reason,
        };

        let build = raw.build.map(|b| match b {
            RawBuild::Context(context) => ComposeBuild {
                context,
                dockerfile: "Dockerfile".to_string(),
            },
            RawBuild::Detailed {
                context,
                dockerfile,
            } => ComposeBuild {
                context: context.unwrap_or_else(|| ".".to_string()),
                dockerfile: dockerfile.unwrap_or_else(|| "Dockerfile".to_string()),
            },
        });

        if build.is_none() && raw.image.is_none() {
            return Err(fail("needs either `build` or `image`".to_string()));
        }

        let labels = key_values(raw.labels.as_ref()).map_err(|r| fail(format!("labels: {r}")))?;
        let environment = key_values(raw.environment.as_ref())
            .map_err(|r| fail(format!("environment: {r}")))?;

        let ports = raw
            .ports
            .iter()
            .map(|p| scalar_to_string(p).ok_or_else(|| fail("ports must be scalars".into())))
            .collect::<Result<Vec<_>, _>>()?;

        let command = raw.command.map(|c| match c {
            RawCommand::Shell(line) => line.split_whitespace().map(str::to_string).collect(),
            RawCommand::Exec(argv) => argv,
        });

        Ok(Self {
            name,
            build,
            image: raw.image,
            labels,
            environment,
            ports,
            volumes: raw.volumes,
            command,
            restart: raw.restart,
        })
    }
}

/// Compose accepts both `{KEY: value}` and `["KEY=value"]`.
fn key_values(value: Option<&Value>) -> Result<BTreeMap<String, String>, String> {
    let mut out = BTreeMap::new();
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(map)) => {
            for (k, v) in map {
                let key = scalar_to_string(k).ok_or("keys must be scalars")?;
                let value = match v {
                    Value::Null => String::new(),
                    other => scalar_to_string(other).ok_or("values must be scalars")?,
                };
                out.insert(key, value);
            }
        }
        Some(Value::Sequence(items)) => {
            for item in items {
                let entry = item.as_str().ok_or("list entries must be strings")?;
                let (k, v) = entry.split_once('=').unwrap_or((entry, ""));
                out.insert(k.to_string(), v.to_string());
            }
        }
        Some(_) => return Err("expected a map or a list".to_string()),
    }
    Ok(out)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_declaration_order() {
        let manifest = ComposeManifest::parse(
            r#"
version: "2"
services:
  web:
    build: ./web
  redis:
    image: "redis:alpine"
  api:
    image: node
"#,
        )
        .unwrap();
        let names: Vec<&str> = manifest.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["web", "redis", "api"]);
    }

    #[test]
    fn build_forms() {
        let manifest = ComposeManifest::parse(
            r#"
services:
  a:
    build: ./a
  b:
    build:
      context: ./b
      dockerfile: Dockerfile.prod
"#,
        )
        .unwrap();
        assert_eq!(
            manifest.services[0].build,
            Some(ComposeBuild {
                context: "./a".into(),
                dockerfile: "Dockerfile".into()
            })
        );
        assert_eq!(
            manifest.services[1].build.as_ref().unwrap().dockerfile,
            "Dockerfile.prod"
        );
    }

    #[test]
    fn labels_and_env_in_both_shapes() {
        let manifest = ComposeManifest::parse(
            r#"
services:
  web:
    image: nginx
    labels:
      traefik.frontend.rule: "Host:test.dev"
      replicas: 2
    environment:
      - NODE_ENV=production
      - EMPTY
    ports:
      - 8080:80
      - "443"
    command: npm run serve
    restart: "no"
"#,
        )
        .unwrap();
        let web = &manifest.services[0];
        assert_eq!(web.labels["traefik.frontend.rule"], "Host:test.dev");
        assert_eq!(web.labels["replicas"], "2");
        assert_eq!(web.environment["NODE_ENV"], "production");
        assert_eq!(web.environment["EMPTY"], "");
        assert_eq!(web.ports, vec!["8080:80", "443"]);
        assert_eq!(
            web.command,
            Some(vec!["npm".into(), "run".into(), "serve".into()])
        );
        assert_eq!(web.restart, Some(RestartPolicy::No));
    }

    #[test]
    fn service_without_build_or_image_is_rejected() {
        let err = ComposeManifest::parse("services:\n  ghost:\n    ports: [80]\n").unwrap_err();
        assert!(matches!(err, ComposeError::Service { .. }));
    }

    #[test]
    fn empty_or_missing_services_are_rejected() {
        assert!(matches!(
            ComposeManifest::parse("version: '3'\n"),
            Err(ComposeError::NoServices)
        ));
        assert!(matches!(
            ComposeManifest::parse("services: {}\n"),
            Err(ComposeError::NoServices)
        ));
    }

    #[test]
    fn compose_service_names_are_normalized() {
        let manifest = ComposeManifest::parse(
            "services:\n  Web:\n    image: nginx\n  api.v1:\n    image: node\n",
        )
        .unwrap();
        let names: Vec<&str> = manifest.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["web", "api-v1"]);
    }

    #[test]
    fn colliding_service_names_are_rejected() {
        let err = ComposeManifest::parse(
            "services:\n  api.v1:\n    image: node\n  api_v1:\n    image: node\n  API-V1:\n    image: node\n",
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::ServiceName { ref name, .. } if name == "API-V1"));
        assert!(err.to_string().contains("collides with service 'api-v1'"));
    }

    #[test]
    fn unusable_service_names_are_rejected() {
        assert!(matches!(
            ComposeManifest::parse("services:\n  \"...\":\n    image: nginx\n"),
            Err(ComposeError::ServiceName { .. })
        ));
    }
}

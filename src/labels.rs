// ABOUTME: Computes the label set and network alias attached to each container.
// ABOUTME: Pure and deterministic; reserved keys cannot be overridden by users.

use crate::identity::DeploymentIdentity;
use crate::types::NetworkAlias;
use std::collections::BTreeMap;

pub const DEPLOYMENT: &str = "exoframe.deployment";
pub const USER: &str = "exoframe.user";
pub const PROJECT: &str = "exoframe.project";
pub const SERVICE: &str = "exoframe.service";
pub const TRAEFIK_BACKEND: &str = "traefik.backend";
pub const TRAEFIK_NETWORK: &str = "traefik.docker.network";
pub const TRAEFIK_ENABLE: &str = "traefik.enable";
pub const TRAEFIK_RULE: &str = "traefik.frontend.rule";

/// Keys owned by the server. `traefik.frontend.rule` is not among them:
/// a user-supplied rule is passed through.
pub const RESERVED: [&str; 7] = [
    DEPLOYMENT,
    USER,
    PROJECT,
    SERVICE,
    TRAEFIK_BACKEND,
    TRAEFIK_NETWORK,
    TRAEFIK_ENABLE,
];

pub fn is_reserved(key: &str) -> bool {
    RESERVED.contains(&key)
}

/// Ordered label map; iteration order is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

/// Everything the composer looks at.
#[derive(Debug, Clone, Copy)]
pub struct LabelInput<'a> {
    pub identity: &'a DeploymentIdentity,
    /// Value for `exoframe.project`: the config override or the project name.
    pub project_label: &'a str,
    /// Routable host, when the recipe or config supplies one.
    pub host: Option<&'a str>,
    pub network: &'a str,
    pub additional: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedLabels {
    pub labels: LabelSet,
    /// Reserved keys that were present in `additional` and dropped.
    pub dropped: Vec<String>,
}

pub fn compose(input: LabelInput<'_>) -> ComposedLabels {
    let ident = input.identity;
    let mut labels = BTreeMap::new();

    labels.insert(DEPLOYMENT.to_string(), ident.deployment_name());
    labels.insert(USER.to_string(), ident.user().to_string());
    labels.insert(PROJECT.to_string(), input.project_label.to_string());
    if let Some(service) = ident.service() {
        labels.insert(SERVICE.to_string(), service.to_string());
    }

    // Compose services always get distinct, service-qualified backends.
    let backend = match (ident.service(), input.host) {
        (None, Some(host)) => host.to_string(),
        _ => ident.base_name(),
    };
    labels.insert(TRAEFIK_BACKEND.to_string(), backend);
    labels.insert(TRAEFIK_NETWORK.to_string(), input.network.to_string());
    labels.insert(TRAEFIK_ENABLE.to_string(), "true".to_string());
    if let Some(host) = input.host {
        labels.insert(TRAEFIK_RULE.to_string(), format!("Host:{}", host));
    }

    let mut dropped = Vec::new();
    for (key, value) in input.additional {
        if is_reserved(key) {
            dropped.push(key.clone());
        } else {
            labels.insert(key.clone(), value.clone());
        }
    }

    ComposedLabels {
        labels: LabelSet(labels),
        dropped,
    }
}

/// Service name for compose, project name otherwise; unchanged across updates.
pub fn network_alias(identity: &DeploymentIdentity) -> NetworkAlias {
    identity
        .service()
        .unwrap_or_else(|| identity.project())
        .as_alias()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeploymentId, Slug};

    fn identity(service: Option<&str>) -> DeploymentIdentity {
        DeploymentIdentity::new(
            Slug::new("exo").unwrap(),
            Slug::new("admin").unwrap(),
            Slug::new("test-docker-deploy").unwrap(),
            service.map(|s| Slug::new(s).unwrap()),
            DeploymentId::parse("abc123").unwrap(),
        )
    }

    #[test]
    fn single_service_without_host() {
        let ident = identity(None);
        let extra = BTreeMap::new();
        let out = compose(LabelInput {
            identity: &ident,
            project_label: "test-docker-deploy",
            host: None,
            network: "exoframe",
            additional: &extra,
        });
        let l = &out.labels;
        assert_eq!(l.get(DEPLOYMENT), Some("exo-admin-test-docker-deploy-abc123"));
        assert_eq!(l.get(USER), Some("admin"));
        assert_eq!(l.get(PROJECT), Some("test-docker-deploy"));
        assert_eq!(l.get(TRAEFIK_BACKEND), Some("exo-admin-test-docker-deploy"));
        assert_eq!(l.get(TRAEFIK_NETWORK), Some("exoframe"));
        assert_eq!(l.get(TRAEFIK_ENABLE), Some("true"));
        assert_eq!(l.get(TRAEFIK_RULE), None);
        assert_eq!(l.get(SERVICE), None);
        assert_eq!(network_alias(&ident).as_str(), "test-docker-deploy");
    }

    #[test]
    fn host_drives_backend_and_rule() {
        let ident = identity(None);
        let extra = BTreeMap::new();
        let out = compose(LabelInput {
            identity: &ident,
            project_label: "test-docker-deploy",
            host: Some("localhost"),
            network: "exoframe",
            additional: &extra,
        });
        assert_eq!(out.labels.get(TRAEFIK_BACKEND), Some("localhost"));
        assert_eq!(out.labels.get(TRAEFIK_RULE), Some("Host:localhost"));
    }

    #[test]
    fn compose_backend_ignores_host() {
        let ident = identity(Some("web"));
        let extra = BTreeMap::new();
        let out = compose(LabelInput {
            identity: &ident,
            project_label: "test-docker-deploy",
            host: Some("test.dev"),
            network: "exoframe",
            additional: &extra,
        });
        assert_eq!(
            out.labels.get(TRAEFIK_BACKEND),
            Some("exo-admin-test-docker-deploy-web")
        );
        assert_eq!(out.labels.get(SERVICE), Some("web"));
        assert_eq!(network_alias(&ident).as_str(), "web");
    }

    #[test]
    fn reserved_keys_are_dropped_and_reported() {
        let ident = identity(None);
        let mut extra = BTreeMap::new();
        extra.insert(USER.to_string(), "mallory".to_string());
        extra.insert("custom.label".to_string(), "additional-label".to_string());
        extra.insert(TRAEFIK_RULE.to_string(), "Host:test.dev".to_string());

        let out = compose(LabelInput {
            identity: &ident,
            project_label: "p",
            host: None,
            network: "exoframe",
            additional: &extra,
        });
        assert_eq!(out.labels.get(USER), Some("admin"));
        assert_eq!(out.labels.get("custom.label"), Some("additional-label"));
        assert_eq!(out.labels.get(TRAEFIK_RULE), Some("Host:test.dev"));
        assert_eq!(out.dropped, vec![USER.to_string()]);
    }
}

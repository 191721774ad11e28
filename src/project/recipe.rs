// ABOUTME: Recipes and deployment planning: which images to build or pull, and
// ABOUTME: the fully-resolved container descriptors that a deployment will start.

use super::{ClassificationError, ComposeService, Project, dockerfile};
use crate::config::{Domain, RestartPolicy, TemplateDefinition};
use crate::identity::DeploymentIdentity;
use crate::labels::{self, LabelInput, LabelSet};
use crate::project::ComposeManifest;
use crate::runtime::{
    BuildRequest, ContainerConfig, DockerfileSource, PortMapping, VolumeMount,
};
use crate::types::{DeploymentId, ImageRef, NetworkAlias, Slug};
use nonempty::NonEmpty;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeKind {
    Compose,
    Docker,
    Node,
    Static,
    Template,
}

impl fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecipeKind::Compose => "compose",
            RecipeKind::Docker => "docker",
            RecipeKind::Node => "node",
            RecipeKind::Static => "static",
            RecipeKind::Template => "template",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub enum Recipe {
    Compose(ComposeManifest),
    Docker,
    Node { yarn: bool },
    Static,
    Template {
        name: String,
        definition: TemplateDefinition,
    },
}

impl Recipe {
    pub fn kind(&self) -> RecipeKind {
        match self {
            Recipe::Compose(_) => RecipeKind::Compose,
            Recipe::Docker => RecipeKind::Docker,
            Recipe::Node { .. } => RecipeKind::Node,
            Recipe::Static => RecipeKind::Static,
            Recipe::Template { .. } => RecipeKind::Template,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Recipe::Compose(_) => "Docker Compose".to_string(),
            Recipe::Docker => "Docker".to_string(),
            Recipe::Node { .. } => "Node.js".to_string(),
            Recipe::Static => "Static HTML".to_string(),
            Recipe::Template { name, definition } => definition.display_name(name).to_string(),
        }
    }
}

/// Server-side inputs to planning, fixed for the whole request.
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub prefix: Slug,
    pub user: Slug,
    pub network: String,
    pub default_restart: RestartPolicy,
    pub id: DeploymentId,
}

#[derive(Debug, Clone)]
pub struct BuildPlanEntry {
    pub identity: DeploymentIdentity,
    pub request: BuildRequest,
}

/// Everything needed to create one container.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub identity: DeploymentIdentity,
    pub image: ImageRef,
    pub labels: LabelSet,
    pub network: String,
    pub alias: NetworkAlias,
    pub restart: RestartPolicy,
    pub ports: Vec<PortMapping>,
    pub env: BTreeMap<String, String>,
    pub volumes: Vec<VolumeMount>,
    pub command: Option<Vec<String>>,
}

impl ServiceDescriptor {
    pub fn container_config(&self) -> ContainerConfig {
        ContainerConfig {
            name: self.identity.deployment_name(),
            image: self.image.clone(),
            env: self.env.clone(),
            labels: self.labels.as_map().clone(),
            ports: self.ports.clone(),
            volumes: self.volumes.clone(),
            command: self.command.clone(),
            restart_policy: self.restart.into(),
            network: Some(self.network.clone()),
            network_aliases: vec![self.alias.clone()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Plan {
    /// Images to build, in order.
    pub builds: Vec<BuildPlanEntry>,
    /// Prebuilt images the services reference; pulled when absent locally.
    pub pulls: Vec<ImageRef>,
    /// Containers to start, in declaration order.
    pub services: NonEmpty<ServiceDescriptor>,
    /// Non-fatal notes, e.g. reserved labels that were ignored.
    pub warnings: Vec<String>,
}

impl Project {
    /// Resolve every name, label, image and build for one request.
    pub fn plan(&self, ctx: &PlanContext) -> Result<Plan, ClassificationError> {
        match self.recipe() {
            Recipe::Compose(manifest) => self.plan_compose(manifest, ctx),
            Recipe::Docker => self.plan_single(
                ctx,
                self.root().to_path_buf(),
                DockerfileSource::InContext("Dockerfile".to_string()),
                None,
            ),
            Recipe::Node { yarn } => self.plan_single(
                ctx,
                self.root().to_path_buf(),
                DockerfileSource::Generated(dockerfile::node(*yarn)),
                Some("localhost"),
            ),
            Recipe::Static => self.plan_single(
                ctx,
                self.root().to_path_buf(),
                DockerfileSource::Generated(dockerfile::static_site()),
                None,
            ),
            Recipe::Template { definition, .. } => {
                let (context, source) = match (&definition.context, &definition.dockerfile) {
                    (Some(dir), Some(text)) => {
                        (dir.clone(), DockerfileSource::Generated(text.clone()))
                    }
                    (Some(dir), None) => {
                        (dir.clone(), DockerfileSource::InContext("Dockerfile".to_string()))
                    }
                    (None, Some(text)) => (
                        self.root().to_path_buf(),
                        DockerfileSource::Generated(text.clone()),
                    ),
                    (None, None) => {
                        return Err(ClassificationError::Invalid(
                            "template has neither a context nor a dockerfile".to_string(),
                        ));
                    }
                };
                self.plan_single(ctx, context, source, None)
            }
        }
    }

    fn identity(&self, ctx: &PlanContext, service: Option<Slug>) -> DeploymentIdentity {
        DeploymentIdentity::new(
            ctx.prefix.clone(),
            ctx.user.clone(),
            self.name().clone(),
            service,
            ctx.id.clone(),
        )
    }

    fn plan_single(
        &self,
        ctx: &PlanContext,
        context: PathBuf,
        dockerfile: DockerfileSource,
        default_host: Option<&str>,
    ) -> Result<Plan, ClassificationError> {
        let config = self.config();
        let identity = self.identity(ctx, None);
        let tag = image_tag(&identity)?;
        let host = resolve_host(config.domain.as_ref(), default_host);

        let composed = labels::compose(LabelInput {
            identity: &identity,
            project_label: self.project_label(),
            host: host.as_deref(),
            network: &ctx.network,
            additional: &config.labels,
        });

        let service = ServiceDescriptor {
            alias: labels::network_alias(&identity),
            image: tag.clone(),
            labels: composed.labels,
            network: ctx.network.clone(),
            restart: config.restart.unwrap_or(ctx.default_restart),
            ports: parse_ports(&config.ports)?,
            env: config.env.clone(),
            volumes: Vec::new(),
            command: None,
            identity: identity.clone(),
        };

        Ok(Plan {
            builds: vec![BuildPlanEntry {
                identity,
                request: BuildRequest {
                    context,
                    dockerfile,
                    tag,
                },
            }],
            pulls: Vec::new(),
            services: NonEmpty::new(service),
            warnings: reserved_warnings(&composed.dropped),
        })
    }

    fn plan_compose(
        &self,
        manifest: &ComposeManifest,
        ctx: &PlanContext,
    ) -> Result<Plan, ClassificationError> {
        let mut builds = Vec::new();
        let mut pulls = Vec::new();
        let mut services = Vec::with_capacity(manifest.services.len());
        let mut warnings = Vec::new();
        // Compose routes only when exoframe.json names a domain.
        let host = resolve_host(self.config().domain.as_ref(), None);

        for svc in &manifest.services {
            let identity = self.identity(ctx, Some(svc.name.clone()));
            let image = match (&svc.build, &svc.image) {
                (Some(build), _) => {
                    let tag = image_tag(&identity)?;
                    builds.push(BuildPlanEntry {
                        identity: identity.clone(),
                        request: BuildRequest {
                            context: resolve_context(self.root(), &build.context, svc)?,
                            dockerfile: DockerfileSource::InContext(build.dockerfile.clone()),
                            tag: tag.clone(),
                        },
                    });
                    tag
                }
                (None, Some(image)) => {
                    let image = ImageRef::parse(image).map_err(|e| {
                        ClassificationError::Invalid(format!("service '{}': {}", svc.name, e))
                    })?;
                    if !pulls.contains(&image) {
                        pulls.push(image.clone());
                    }
                    image
                }
                (None, None) => {
                    return Err(ClassificationError::Invalid(format!(
                        "service '{}' has neither build nor image",
                        svc.name
                    )));
                }
            };

            let mut additional = self.config().labels.clone();
            additional.extend(svc.labels.clone());
            let composed = labels::compose(LabelInput {
                identity: &identity,
                project_label: self.project_label(),
                host: host.as_deref(),
                network: &ctx.network,
                additional: &additional,
            });
            warnings.extend(reserved_warnings(&composed.dropped));

            let mut env = self.config().env.clone();
            env.extend(svc.environment.clone());

            let volumes = svc
                .volumes
                .iter()
                .map(|v| {
                    v.parse::<VolumeMount>().map_err(|e| {
                        ClassificationError::Invalid(format!("service '{}': {}", svc.name, e))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            services.push(ServiceDescriptor {
                alias: labels::network_alias(&identity),
                image,
                labels: composed.labels,
                network: ctx.network.clone(),
                restart: svc
                    .restart
                    .or(self.config().restart)
                    .unwrap_or(ctx.default_restart),
                ports: parse_ports(&svc.ports)?,
                env,
                volumes,
                command: svc.command.clone(),
                identity,
            });
        }

        let services = NonEmpty::from_vec(services)
            .ok_or_else(|| ClassificationError::Invalid("no services to deploy".to_string()))?;

        Ok(Plan {
            builds,
            pulls,
            services,
            warnings,
        })
    }
}

fn image_tag(identity: &DeploymentIdentity) -> Result<ImageRef, ClassificationError> {
    identity
        .image_tag()
        .map_err(|e| ClassificationError::Invalid(format!("image tag for {}: {}", identity, e)))
}

fn resolve_host(domain: Option<&Domain>, default: Option<&str>) -> Option<String> {
    match domain {
        Some(Domain::Host(host)) => Some(host.clone()),
        Some(Domain::Disabled) => None,
        None => default.map(str::to_string),
    }
}

fn parse_ports(ports: &[String]) -> Result<Vec<PortMapping>, ClassificationError> {
    ports
        .iter()
        .map(|p| {
            p.parse::<PortMapping>()
                .map_err(|e| ClassificationError::Invalid(format!("port '{}': {}", p, e)))
        })
        .collect()
}

fn reserved_warnings(dropped: &[String]) -> Vec<String> {
    dropped
        .iter()
        .map(|key| format!("ignoring reserved label '{}'", key))
        .collect()
}

/// Build context for a compose service: inside the project root, and a directory.
fn resolve_context(
    root: &Path,
    relative: &str,
    svc: &ComposeService,
) -> Result<PathBuf, ClassificationError> {
    let rel = Path::new(relative);
    let escapes = rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(ClassificationError::Invalid(format!(
            "service '{}': build context '{}' leaves the project",
            svc.name, relative
        )));
    }

    let dir = root.join(rel);
    if !dir.is_dir() {
        return Err(ClassificationError::Invalid(format!(
            "service '{}': build context '{}' is not a directory",
            svc.name, relative
        )));
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::project::classify;
    use std::fs;

    fn ctx() -> PlanContext {
        PlanContext {
            prefix: Slug::new("exo").unwrap(),
            user: Slug::new("admin").unwrap(),
            network: "exoframe".to_string(),
            default_restart: RestartPolicy::default(),
            id: DeploymentId::parse("0123456789ab").unwrap(),
        }
    }

    fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("demo");
        for (path, contents) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        let project = classify(&root, &ServerConfig::default()).unwrap();
        (dir, project)
    }

    #[test]
    fn node_defaults_to_localhost() {
        let (_dir, p) = project(&[("package.json", "{}")]);
        let plan = p.plan(&ctx()).unwrap();
        let svc = plan.services.first();
        assert_eq!(svc.labels.get(labels::TRAEFIK_RULE), Some("Host:localhost"));
        assert_eq!(svc.labels.get(labels::TRAEFIK_BACKEND), Some("localhost"));
        assert_eq!(plan.builds.len(), 1);
        assert!(matches!(
            plan.builds[0].request.dockerfile,
            DockerfileSource::Generated(_)
        ));
    }

    #[test]
    fn node_domain_can_be_disabled() {
        let (_dir, p) = project(&[("package.json", "{}"), ("exoframe.json", r#"{"domain": false}"#)]);
        let plan = p.plan(&ctx()).unwrap();
        assert_eq!(plan.services.first().labels.get(labels::TRAEFIK_RULE), None);
    }

    #[test]
    fn static_has_no_rule_and_one_build() {
        let (_dir, p) = project(&[("index.html", "<p>hi</p>")]);
        let plan = p.plan(&ctx()).unwrap();
        let svc = plan.services.first();
        assert_eq!(svc.labels.get(labels::TRAEFIK_RULE), None);
        assert_eq!(svc.identity.deployment_name(), "exo-admin-demo-0123456789ab");
        assert_eq!(svc.image.to_string(), "exo-admin-demo:0123456789ab");
    }

    #[test]
    fn compose_builds_and_pulls() {
        let manifest = "services:\n  web:\n    build: ./web\n  redis:\n    image: redis:alpine\n";
        let (_dir, p) = project(&[
            ("docker-compose.yml", manifest),
            ("web/Dockerfile", "FROM busybox\n"),
        ]);
        let plan = p.plan(&ctx()).unwrap();
        assert_eq!(plan.builds.len(), 1);
        assert_eq!(plan.pulls.len(), 1);
        assert_eq!(plan.pulls[0].to_string(), "redis:alpine");
        let names: Vec<_> = plan
            .services
            .iter()
            .map(|s| s.identity.deployment_name())
            .collect();
        assert_eq!(
            names,
            vec!["exo-admin-demo-web-0123456789ab", "exo-admin-demo-redis-0123456789ab"]
        );
        assert_eq!(plan.services.last().alias.as_str(), "redis");
    }

    #[test]
    fn compose_domain_routes_every_service() {
        let manifest = "services:\n  web:\n    image: nginx\n  api:\n    image: node\n";
        let (_dir, p) = project(&[
            ("docker-compose.yml", manifest),
            ("exoframe.json", r#"{"domain": "example.com"}"#),
        ]);
        let plan = p.plan(&ctx()).unwrap();
        for svc in plan.services.iter() {
            assert_eq!(svc.labels.get(labels::TRAEFIK_RULE), Some("Host:example.com"));
        }
        let backends: Vec<_> = plan
            .services
            .iter()
            .map(|s| s.labels.get(labels::TRAEFIK_BACKEND).map(str::to_string))
            .collect();
        assert_eq!(
            backends,
            vec![
                Some("exo-admin-demo-web".to_string()),
                Some("exo-admin-demo-api".to_string())
            ]
        );
    }

    #[test]
    fn compose_service_rule_beats_project_domain() {
        let manifest = "services:\n  web:\n    image: nginx\n    labels:\n      traefik.frontend.rule: \"Host:web.dev\"\n  api:\n    image: node\n";
        let (_dir, p) = project(&[
            ("docker-compose.yml", manifest),
            ("exoframe.json", r#"{"domain": "example.com"}"#),
        ]);
        let plan = p.plan(&ctx()).unwrap();
        assert_eq!(
            plan.services.first().labels.get(labels::TRAEFIK_RULE),
            Some("Host:web.dev")
        );
        assert_eq!(
            plan.services.last().labels.get(labels::TRAEFIK_RULE),
            Some("Host:example.com")
        );
    }

    #[test]
    fn compose_without_domain_has_no_rule() {
        let manifest = "services:\n  web:\n    image: nginx\n";
        let (_dir, p) = project(&[("docker-compose.yml", manifest)]);
        let plan = p.plan(&ctx()).unwrap();
        assert_eq!(plan.services.first().labels.get(labels::TRAEFIK_RULE), None);
    }

    #[test]
    fn compose_context_cannot_escape_root() {
        let manifest = "services:\n  web:\n    build: ../elsewhere\n";
        let (_dir, p) = project(&[("docker-compose.yml", manifest)]);
        let err = p.plan(&ctx()).unwrap_err();
        assert!(matches!(err, ClassificationError::Invalid(_)));
    }

    #[test]
    fn project_settings_merge_under_service_settings() {
        let manifest = "services:\n  web:\n    image: nginx\n    environment:\n      MODE: svc\n    restart: always\n";
        let (_dir, p) = project(&[
            ("docker-compose.yml", manifest),
            (
                "exoframe.json",
                r#"{"env": {"MODE": "proj", "EXTRA": "1"}, "restart": "no"}"#,
            ),
        ]);
        let plan = p.plan(&ctx()).unwrap();
        let svc = plan.services.first();
        assert_eq!(svc.env.get("MODE").map(String::as_str), Some("svc"));
        assert_eq!(svc.env.get("EXTRA").map(String::as_str), Some("1"));
        assert_eq!(svc.restart, RestartPolicy::Always);
    }

    #[test]
    fn reserved_labels_become_warnings() {
        let (_dir, p) = project(&[
            ("Dockerfile", "FROM busybox\n"),
            (
                "exoframe.json",
                r#"{"labels": {"exoframe.user": "mallory", "custom.label": "additional-label"}}"#,
            ),
        ]);
        let plan = p.plan(&ctx()).unwrap();
        let svc = plan.services.first();
        assert_eq!(svc.labels.get(labels::USER), Some("admin"));
        assert_eq!(svc.labels.get("custom.label"), Some("additional-label"));
        assert_eq!(plan.warnings.len(), 1);
    }

    #[test]
    fn container_config_carries_alias_and_network() {
        let (_dir, p) = project(&[("Dockerfile", "FROM busybox\n")]);
        let plan = p.plan(&ctx()).unwrap();
        let cfg = plan.services.first().container_config();
        assert_eq!(cfg.network.as_deref(), Some("exoframe"));
        assert_eq!(cfg.network_aliases[0].as_str(), "demo");
        assert_eq!(cfg.name, "exo-admin-demo-0123456789ab");
    }
}

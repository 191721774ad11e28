// ABOUTME: Project classification: picks exactly one recipe for an extracted upload.
// ABOUTME: Reads directory entries and exoframe.json only; never touches the runtime.

mod compose;
pub mod dockerfile;
mod recipe;

pub use compose::{ComposeBuild, ComposeError, ComposeManifest, ComposeService, MANIFEST_NAMES};
pub use recipe::{BuildPlanEntry, Plan, PlanContext, Recipe, RecipeKind, ServiceDescriptor};

use crate::config::{ProjectConfig, ProjectConfigError, TemplateStore};
use crate::types::Slug;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("project type not recognized")]
    NotRecognized,

    #[error(transparent)]
    Config(#[from] ProjectConfigError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("cannot derive a project name from {0}")]
    NoName(PathBuf),

    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("invalid project setting: {0}")]
    Invalid(String),
}

/// A classified upload. Immutable once built.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    name: Slug,
    recipe: Recipe,
    config: ProjectConfig,
}

impl Project {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &Slug {
        &self.name
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn kind(&self) -> RecipeKind {
        self.recipe.kind()
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Value of the `exoframe.project` label.
    pub fn project_label(&self) -> &str {
        self.config
            .project
            .as_deref()
            .unwrap_or_else(|| self.name.as_str())
    }

    /// "Deploying <this> project.."
    pub fn display_name(&self) -> String {
        self.recipe.display_name()
    }
}

/// Choose the recipe for the project rooted at `root`. First match wins:
/// compose manifest, Dockerfile, package.json, index.html, then a template
/// named by the project config or the store's default.
pub fn classify(root: &Path, templates: &dyn TemplateStore) -> Result<Project, ClassificationError> {
    let config = ProjectConfig::read(root)?;

    let name = match &config.name {
        Some(name) => name.clone(),
        None => root
            .file_name()
            .and_then(|n| Slug::from_lossy(&n.to_string_lossy()))
            .ok_or_else(|| ClassificationError::NoName(root.to_path_buf()))?,
    };

    let has = |file: &str| root.join(file).is_file();

    let recipe = if let Some(manifest) = compose::find_manifest(root) {
        Recipe::Compose(ComposeManifest::read(&root.join(manifest))?)
    } else if has("Dockerfile") {
        Recipe::Docker
    } else if has("package.json") {
        Recipe::Node {
            yarn: has("yarn.lock"),
        }
    } else if has("index.html") {
        Recipe::Static
    } else {
        let template_name = config
            .template
            .clone()
            .or_else(|| templates.default_template())
            .ok_or(ClassificationError::NotRecognized)?;
        let definition = templates
            .template(&template_name)
            .ok_or_else(|| ClassificationError::UnknownTemplate(template_name.clone()))?;
        Recipe::Template {
            name: template_name,
            definition,
        }
    };

    tracing::debug!(project = %name, recipe = %recipe.kind(), root = %root.display(), "classified project");

    Ok(Project {
        root: root.to_path_buf(),
        name,
        recipe,
        config,
    })
}

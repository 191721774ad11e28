// ABOUTME: Named build templates for projects that ship no Dockerfile of their own.
// ABOUTME: Defines TemplateDefinition and the TemplateStore lookup seam.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How to build a project selected by template name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TemplateDefinition {
    /// Human label used in progress messages ("Deploying <label> project..").
    #[serde(default)]
    pub display_name: Option<String>,

    /// Build context that replaces the uploaded tree.
    #[serde(default)]
    pub context: Option<PathBuf>,

    /// Inline Dockerfile that replaces the project's own.
    #[serde(default)]
    pub dockerfile: Option<String>,
}

impl TemplateDefinition {
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.display_name.as_deref().unwrap_or(fallback)
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), String> {
        if self.context.is_none() && self.dockerfile.is_none() {
            return Err(format!(
                "template '{}' needs a context directory or an inline dockerfile",
                name
            ));
        }
        Ok(())
    }

    /// Resolve a relative context against the directory holding the config file.
    pub(crate) fn anchor(&mut self, base: &Path) {
        if let Some(ctx) = &self.context
            && ctx.is_relative()
        {
            self.context = Some(base.join(ctx));
        }
    }
}

/// Source of template definitions.
pub trait TemplateStore: Send + Sync {
    fn template(&self, name: &str) -> Option<TemplateDefinition>;

    /// Template applied when a project matches no other recipe.
    fn default_template(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_template_is_rejected() {
        let t = TemplateDefinition::default();
        assert!(t.validate("bare").is_err());
    }

    #[test]
    fn anchor_only_touches_relative_paths() {
        let mut rel = TemplateDefinition {
            context: Some(PathBuf::from("tpl/static")),
            ..Default::default()
        };
        rel.anchor(Path::new("/etc/exoframe"));
        assert_eq!(rel.context, Some(PathBuf::from("/etc/exoframe/tpl/static")));

        let mut abs = TemplateDefinition {
            context: Some(PathBuf::from("/srv/tpl")),
            ..Default::default()
        };
        abs.anchor(Path::new("/etc/exoframe"));
        assert_eq!(abs.context, Some(PathBuf::from("/srv/tpl")));
    }

    #[test]
    fn display_name_falls_back() {
        let t = TemplateDefinition::default();
        assert_eq!(t.display_name("static"), "static");
    }
}

// ABOUTME: Config scaffolding for a new server host.
// ABOUTME: Writes a commented exoframe-server.yml starter file.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const TEMPLATE: &str = r#"# exoframe server configuration
listen: 0.0.0.0:8080

# Shared network every deployment joins (the reverse proxy must watch it)
network: exoframe

# Container names look like <name_prefix>-<user>-<project>[-<service>]-<id>
name_prefix: exo
default_user: admin

# Restart policy when exoframe.json does not set one
default_restart: on-failure:2

max_upload_size: 536870912
runtime_timeout: 2m

# Uncomment to skip runtime auto-detection
# runtime: docker
# socket: /var/run/docker.sock

# Projects with no Dockerfile, package.json or index.html fall back to this
# default_template: static
templates:
  static:
    display_name: Static HTML
    dockerfile: |
      FROM nginx:latest
      COPY . /usr/share/nginx/html
"#;

/// Write the starter config into `dir`, returning its path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;
    tracing::info!(path = %config_path.display(), "wrote server config");

    Ok(config_path)
}

//! Project Scaffolding
//!
//! `scarr init` creates a project directory holding a starter `scarr.yml`.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{ConfigFile, DeploymentSpec, CONFIG_FILE_NAME};

/// Keeps the config (and the registrant contact in it) out of the bucket
const CONFIG_EXCLUDE: &str = r"^scarr\.yml$";

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub domain: String,
    pub name: String,
    pub region: String,
    pub redirect: Option<String>,
}

/// Create `<parent>/<name>/scarr.yml`; returns the config path
pub fn scaffold(parent: &Path, options: InitOptions) -> Result<PathBuf> {
    let file = ConfigFile {
        domain: options.domain,
        name: options.name,
        region: options.region,
        redirect: options.redirect.filter(|r| !r.trim().is_empty()),
        bucket: None,
        content_root: None,
        exclude: vec![CONFIG_EXCLUDE.to_string()],
        contact: None,
    };

    // Refuse to write a config that deploy would reject
    DeploymentSpec::from_config(file.clone(), parent).context("Invalid project settings")?;

    if file.name.contains('/') || file.name.contains('\\') || file.name == ".." {
        bail!("Project name must be a plain directory name, got '{}'", file.name);
    }

    let dir = parent.join(&file.name);
    if dir.exists() {
        bail!("{} already exists", dir.display());
    }
    fs::create_dir(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let content = serde_yaml_ng::to_string(&file).context("Failed to render config")?;
    let path = dir.join(CONFIG_FILE_NAME);
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "Created project config");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn options() -> InitOptions {
        InitOptions {
            domain: "example.com".to_string(),
            name: "example".to_string(),
            region: "eu-west-1".to_string(),
            redirect: None,
        }
    }

    #[test]
    fn test_scaffold_writes_loadable_config() {
        let dir = tempdir().unwrap();

        let path = scaffold(dir.path(), options()).unwrap();
        assert_eq!(path, dir.path().join("example").join("scarr.yml"));

        let spec = DeploymentSpec::load(&path).unwrap();
        assert_eq!(spec.domain, "example.com");
        assert_eq!(spec.region, "eu-west-1");
        assert!(spec.excludes.is_excluded("scarr.yml"));
        assert!(!spec.excludes.is_excluded("index.html"));
    }

    #[test]
    fn test_scaffold_refuses_existing_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("example")).unwrap();

        let err = scaffold(dir.path(), options()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_scaffold_rejects_bad_domain() {
        let dir = tempdir().unwrap();
        let mut bad = options();
        bad.domain = "localhost".to_string();

        assert!(scaffold(dir.path(), bad).is_err());
        assert!(!dir.path().join("example").exists());
    }
}

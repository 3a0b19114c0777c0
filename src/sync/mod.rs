//! Content Sync
//!
//! Walks the content root, drops excluded paths and uploads every remaining
//! file as a publicly readable object. Every run re-uploads everything;
//! there is no diffing against what the bucket already holds.

pub mod content_type;

use std::fs::read_dir;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ExcludeSet;
use crate::error::{DeployError, DeployResult};
use crate::providers::{Acl, ObjectStore, ObjectUpload};
use crate::reporter::Reporter;

/// Wildcard that invalidates every cached object
pub const INVALIDATE_ALL: &str = "/*";

/// A file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// Object key: path relative to the content root, `/`-separated
    pub key: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Uploaded object keys, in walk order
    pub uploaded_paths: Vec<String>,
}

/// Cache paths to invalidate after a sync: everything when anything was
/// uploaded, nothing otherwise
pub fn invalidation_paths(result: &SyncResult) -> Vec<String> {
    if result.uploaded_paths.is_empty() {
        Vec::new()
    } else {
        vec![INVALIDATE_ALL.to_string()]
    }
}

fn io_error(path: &Path, source: std::io::Error) -> DeployError {
    DeployError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Files under `root` that survive the excludes, depth-first with entries
/// in name order. Symlinked files are followed, symlinked directories are not.
pub fn plan(root: &Path, excludes: &ExcludeSet) -> DeployResult<Vec<PlannedFile>> {
    fn walk(root: &Path, dir: &Path, excludes: &ExcludeSet, planned: &mut Vec<PlannedFile>) -> DeployResult<()> {
        let mut entries = read_dir(dir)
            .map_err(|e| io_error(dir, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| io_error(dir, e))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| io_error(&path, e))?;
            if file_type.is_dir() {
                walk(root, &path, excludes, planned)?;
                continue;
            }
            // Symlinked directories are not descended into
            if file_type.is_symlink() && path.is_dir() {
                debug!(path = %path.display(), "Skipping symlinked directory");
                continue;
            }

            let key = relative_key(root, &path);
            if excludes.is_excluded(&key) || excludes.is_excluded_file(&path) {
                debug!(%key, "Excluded");
                continue;
            }
            planned.push(PlannedFile { key, path });
        }
        Ok(())
    }

    let mut planned = Vec::new();
    walk(root, root, excludes, &mut planned)?;
    Ok(planned)
}

fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Uploads a content tree into a bucket
pub struct ContentSync {
    storage: Arc<dyn ObjectStore>,
    reporter: Reporter,
}

impl ContentSync {
    pub fn new(storage: Arc<dyn ObjectStore>, reporter: Reporter) -> Self {
        Self { storage, reporter }
    }

    pub async fn sync(&self, bucket: &str, root: &Path, excludes: &ExcludeSet) -> DeployResult<SyncResult> {
        self.reporter
            .step(format!("Syncing {} to bucket {}", root.display(), bucket));

        let planned = plan(root, excludes)?;
        let mut result = SyncResult::default();

        for file in planned {
            let body = tokio::fs::read(&file.path)
                .await
                .map_err(|e| io_error(&file.path, e))?;
            let content_type = content_type::resolve(&file.path, &body);

            debug!(key = %file.key, %content_type, size = body.len(), "Uploading");
            self.storage
                .put_object(ObjectUpload {
                    bucket: bucket.to_string(),
                    key: file.key.clone(),
                    body,
                    content_type,
                    acl: Acl::PublicRead,
                })
                .await?;

            result.uploaded_paths.push(file.key);
        }

        info!(bucket, uploaded = result.uploaded_paths.len(), "Sync complete");
        self.reporter
            .done(format!("Uploaded {} files", result.uploaded_paths.len()));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCloud;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_default_excludes_skip_git_and_ds_store() {
        let dir = tempdir().unwrap();
        write(dir.path(), "index.html", b"<html></html>");
        write(dir.path(), ".git/config", b"[core]");
        write(dir.path(), ".DS_Store", b"\0\0\0\x01Bud1");

        let excludes = ExcludeSet::new(&[".git", ".DS_Store"]).unwrap();
        let planned = plan(dir.path(), &excludes).unwrap();

        let keys: Vec<_> = planned.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["index.html"]);
    }

    #[test]
    fn test_walk_is_depth_first_in_name_order() {
        let dir = tempdir().unwrap();
        write(dir.path(), "b.txt", b"b");
        write(dir.path(), "a/z.txt", b"z");
        write(dir.path(), "a/b/c.txt", b"c");

        let excludes = ExcludeSet::new::<&str>(&[]).unwrap();
        let keys: Vec<_> = plan(dir.path(), &excludes)
            .unwrap()
            .into_iter()
            .map(|f| f.key)
            .collect();

        assert_eq!(keys, vec!["a/b/c.txt", "a/z.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_sync_uploads_with_content_types() {
        let dir = tempdir().unwrap();
        write(dir.path(), "index.html", b"<html></html>");
        write(dir.path(), "css/site.css", b"body {}");
        write(dir.path(), "drafts/wip.html", b"<html></html>");

        let cloud = FakeCloud::new();
        let excludes = ExcludeSet::with_defaults(&["^drafts/"]).unwrap();
        let result = ContentSync::new(cloud.services().storage, Reporter::silent())
            .sync("example.com", dir.path(), &excludes)
            .await
            .unwrap();

        assert_eq!(result.uploaded_paths, vec!["css/site.css", "index.html"]);
        assert_eq!(
            cloud.uploaded(),
            vec![
                (
                    "example.com".to_string(),
                    "css/site.css".to_string(),
                    "text/css; charset=utf-8".to_string()
                ),
                (
                    "example.com".to_string(),
                    "index.html".to_string(),
                    "text/html; charset=utf-8".to_string()
                ),
            ]
        );
        assert_eq!(invalidation_paths(&result), vec!["/*".to_string()]);
    }

    #[test]
    fn test_nothing_uploaded_means_nothing_invalidated() {
        assert!(invalidation_paths(&SyncResult::default()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_cycle_is_not_walked() {
        let dir = tempdir().unwrap();
        write(dir.path(), "index.html", b"<html></html>");
        write(dir.path(), "shared/logo.svg", b"<svg/>");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("shared/logo.svg"),
            dir.path().join("logo.svg"),
        )
        .unwrap();

        let excludes = ExcludeSet::new::<&str>(&[]).unwrap();
        let keys: Vec<_> = plan(dir.path(), &excludes)
            .unwrap()
            .into_iter()
            .map(|f| f.key)
            .collect();

        assert_eq!(keys, vec!["index.html", "logo.svg", "shared/logo.svg"]);
    }

    #[test]
    fn test_loaded_config_is_never_planned() {
        let dir = tempdir().unwrap();
        write(dir.path(), "index.html", b"<html></html>");
        write(
            dir.path(),
            "scarr.yml",
            b"domain: example.com\nname: example\ncontact:\n  email: ada@example.com\n",
        );
        let config = dir.path().join("scarr.yml");

        let excludes = ExcludeSet::new::<&str>(&[]).unwrap().with_file(&config);
        let keys: Vec<_> = plan(dir.path(), &excludes)
            .unwrap()
            .into_iter()
            .map(|f| f.key)
            .collect();

        assert_eq!(keys, vec!["index.html"]);
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let dir = tempdir().unwrap();
        let excludes = ExcludeSet::new::<&str>(&[]).unwrap();

        let err = plan(&dir.path().join("missing"), &excludes).unwrap_err();
        assert!(matches!(err, DeployError::Io { .. }));
    }
}

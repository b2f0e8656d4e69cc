use std::path::{Component, Path, PathBuf};

use anyhow::{Context as _, bail};

/// Where an object's uploads live: `(base, slug)`, e.g. `("team", "12")`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadMeta {
    pub base: &'static str,
    pub slug: String,
}

impl UploadMeta {
    pub fn new(base: &'static str, slug: impl Into<String>) -> Self {
        Self {
            base,
            slug: slug.into(),
        }
    }

    /// Relative storage path, e.g. `team/12/1700000000_team.png`.
    pub fn path_for(&self, field_fn: &str, time_now: u64) -> String {
        format!("{}/{}/{}_{}", self.base, self.slug, time_now, field_fn)
    }
}

/// Public URL of a stored upload.
pub fn upload_url(uploads_url: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        uploads_url.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// Resolve `relative` under `root`, refusing anything that could escape it.
pub fn resolve_upload_path(root: &Path, relative: &str) -> anyhow::Result<PathBuf> {
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        bail!("upload path `{}` is not a plain relative path", relative.display());
    }
    Ok(root.join(relative))
}

/// Write `bytes` to `root/relative`, creating parent directories.
pub async fn store_upload(root: &Path, relative: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    let path = resolve_upload_path(root, relative)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create upload dir `{}`", parent.display()))?;
    }
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("failed to write upload `{}`", path.display()))?;

    tracing::debug!(path = %path.display(), size = bytes.len(), "stored upload");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{UploadMeta, resolve_upload_path, store_upload, upload_url};

    #[test]
    fn builds_time_prefixed_paths() {
        let meta = UploadMeta::new("team", "12");
        assert_eq!(meta.path_for("team.png", 1_700_000_000), "team/12/1700000000_team.png");
    }

    #[test]
    fn joins_urls_with_single_slash() {
        assert_eq!(
            upload_url("/media/uploads/", "profile/alice/1_avatar.png"),
            "/media/uploads/profile/alice/1_avatar.png"
        );
        assert_eq!(upload_url("/media/uploads", "/a.png"), "/media/uploads/a.png");
    }

    #[test]
    fn rejects_escaping_paths() {
        let root = Path::new("/srv/uploads");
        assert!(resolve_upload_path(root, "profile/../../etc/passwd").is_err());
        assert!(resolve_upload_path(root, "/etc/passwd").is_err());
        assert!(resolve_upload_path(root, "team/1/1_team.png").is_ok());
    }

    #[tokio::test]
    async fn stores_bytes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_upload(dir.path(), "team/3/5_team.png", b"png").await.unwrap();
        assert_eq!(tokio::fs::read(path).await.unwrap(), b"png");
    }
}

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, bail};
use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::CatalogSource;

/// URL path under which `LocalStorage` objects are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Where catalog images end up. Implementations return a public URL that is
/// stored verbatim on the catalog row.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, content_type: Option<&str>, bytes: &[u8]) -> anyhow::Result<String>;

    /// Delete the object behind a URL returned by `put`. URLs this storage
    /// did not issue are ignored.
    async fn remove(&self, url: &str) -> anyhow::Result<()>;
}

/// Writes objects below a directory that the HTTP server exposes at
/// [`UPLOADS_ROUTE`].
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: format!("{}{}/", public_base_url.trim_end_matches('/'), UPLOADS_ROUTE),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            bail!("invalid object key `{key}`");
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(&self, key: &str, content_type: Option<&str>, bytes: &[u8]) -> anyhow::Result<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write {}", path.display()))?;

        tracing::debug!(key, content_type, size = bytes.len(), "stored object");
        Ok(format!("{}{}", self.url_prefix, key))
    }

    async fn remove(&self, url: &str) -> anyhow::Result<()> {
        let Some(key) = url.strip_prefix(&self.url_prefix) else {
            return Ok(());
        };
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
        }
    }
}

/// `<source>/<uuid>-<sanitized file name>`.
pub fn object_key(source: CatalogSource, file_name: &str) -> String {
    let mut clean: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    clean = clean.trim_start_matches('.').chars().take(100).collect();
    if clean.is_empty() {
        clean.push_str("image");
    }
    format!("{}/{}-{}", source, Uuid::new_v4(), clean)
}

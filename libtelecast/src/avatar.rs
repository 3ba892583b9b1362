//! Local copies of chat avatars

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::error::{ProviderError, Result};

/// Where linked accounts keep their avatar image
#[async_trait]
pub trait AvatarCache: Send + Sync {
    /// Fetch `url` and return the value to store in the account's `avatar` column
    async fn store(&self, url: &str) -> String;

    /// Drop a previously stored avatar. Missing files are ignored.
    fn remove(&self, stored: &str);
}

/// Downloads avatars into a directory under random file names
pub struct HttpAvatarCache {
    client: reqwest::Client,
    dir: PathBuf,
}

impl HttpAvatarCache {
    pub fn new(client: reqwest::Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn download(&self, url: &str) -> Result<PathBuf> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Network(format!("Avatar download failed: {}", e)))?;

        let extension = match response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            Some(ct) if ct.starts_with("image/jpeg") => "jpg",
            Some(ct) if ct.starts_with("image/svg") => "svg",
            _ => "png",
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Network(format!("Avatar download failed: {}", e)))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(crate::error::DbError::IoError)?;

        let path = self
            .dir
            .join(format!("{}.{}", uuid::Uuid::new_v4().simple(), extension));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(crate::error::DbError::IoError)?;

        Ok(path)
    }
}

#[async_trait]
impl AvatarCache for HttpAvatarCache {
    async fn store(&self, url: &str) -> String {
        match self.download(url).await {
            Ok(path) => path.to_string_lossy().to_string(),
            Err(e) => {
                tracing::warn!("Keeping remote avatar {}: {}", url, e);
                url.to_string()
            }
        }
    }

    fn remove(&self, stored: &str) {
        remove_cached(&self.dir, stored);
    }
}

/// Delete `stored` if it is a file inside `dir`
///
/// Remote URLs and paths outside the cache directory are left alone. A path
/// with a `..` component is never inside the cache.
pub fn remove_cached(dir: &Path, stored: &str) {
    let path = Path::new(stored);
    if stored.is_empty()
        || !path.starts_with(dir)
        || path.components().any(|c| matches!(c, Component::ParentDir))
    {
        return;
    }

    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed avatar {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove avatar {}: {}", path.display(), e),
    }
}

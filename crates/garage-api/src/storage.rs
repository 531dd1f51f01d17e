use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// URL prefix every image reference carries. Static files are served from it.
pub const UPLOADS_PREFIX: &str = "uploads";

/// Result of asking storage to remove an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    NotFound,
}

/// On-disk image storage.
///
/// Each image lives as a flat file at `{dir}/{name}` and is referenced as
/// `uploads/{name}`. Names are prefixed with a millisecond timestamp and a
/// random tag so a reference is never handed out twice.
pub struct ImageStorage {
    dir: PathBuf,
}

impl ImageStorage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an uploaded image and return its storage reference.
    pub async fn store(&self, original_name: &str, data: &[u8]) -> Result<String> {
        let name = format!(
            "{}-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8],
            sanitize_file_name(original_name)
        );
        let path = self.dir.join(&name);
        fs::write(&path, data).await?;
        Ok(format!("{UPLOADS_PREFIX}/{name}"))
    }

    /// Resolve a reference to its file path. Anything that doesn't look like
    /// one of our references (wrong prefix, nested path, `..`) is rejected.
    pub fn file_path(&self, reference: &str) -> Result<PathBuf> {
        let Some(name) = reference
            .strip_prefix(UPLOADS_PREFIX)
            .and_then(|r| r.strip_prefix('/'))
        else {
            bail!("not an image reference: {}", reference);
        };
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            bail!("not an image reference: {}", reference);
        }
        Ok(self.dir.join(name))
    }

    pub async fn exists(&self, reference: &str) -> bool {
        match self.file_path(reference) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Remove an image. A file that's already gone is not an error.
    pub async fn delete(&self, reference: &str) -> Result<Removal> {
        let path = self.file_path(reference)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted image {}", reference);
                Ok(Removal::Deleted)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("File not found: {}", path.display());
                Ok(Removal::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of several images. Failures are logged, never returned.
    pub async fn purge(&self, references: &[String]) {
        for reference in references {
            if let Err(e) = self.delete(reference).await {
                warn!("Failed to delete image {}: {:#}", reference, e);
            }
        }
    }
}

/// Keep the last path component of a client-supplied file name and replace
/// anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

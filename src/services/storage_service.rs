use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::models::document::{DocumentCategory, EntityRef};
use crate::utils::{time::file_stamp, token::random_alphanumeric};

const MAX_EXTENSION_LEN: usize = 10;

/// Disk-backed file storage rooted at the configured upload directory.
/// Callers only ever hand it paths relative to that root.
#[derive(Clone, Debug)]
pub struct StorageService {
    root: PathBuf,
}

impl StorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<entity-type>/<entity-id>/<category-slug>/<timestamp>_<random>[.ext]`
    pub fn relative_path(
        entity: EntityRef,
        category: DocumentCategory,
        original_filename: &str,
        at: DateTime<Utc>,
    ) -> String {
        let ext = safe_extension(original_filename)
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        format!(
            "{}/{}/{}/{}_{}{}",
            entity.kind.as_str(),
            entity.id,
            category.slug(),
            file_stamp(at),
            random_alphanumeric(16),
            ext
        )
    }

    pub async fn write(&self, relative: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn open(&self, relative: &str) -> Result<fs::File> {
        let path = self.resolve(relative)?;
        fs::File::open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound("File is missing from storage".to_string()),
            _ => Error::Io(e),
        })
    }

    /// Absolute location of a stored file, for blocking readers.
    pub fn locate(&self, relative: &str) -> Result<PathBuf> {
        self.resolve(relative)
    }

    /// Never fails: a leftover file is logged, not surfaced.
    pub async fn remove_best_effort(&self, relative: &str) {
        let path = match self.resolve(relative) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(path = relative, error = %e, "Refusing to remove file outside storage root");
                return;
            }
        };
        match fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = relative, "Removed stored file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = relative, "Stored file already absent")
            }
            Err(e) => tracing::warn!(path = relative, error = %e, "Failed to remove stored file"),
        }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let clean = !relative.is_empty()
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(Error::Internal(format!("Invalid storage path: {}", relative)));
        }
        Ok(self.root.join(rel))
    }
}

/// Lower-cased alphanumeric extension of the uploaded name, if any.
pub fn safe_extension(filename: &str) -> Option<String> {
    let name = display_filename(filename);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Strips any client-supplied directory part and control characters.
pub fn display_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

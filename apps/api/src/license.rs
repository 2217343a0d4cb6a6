//! License document storage.
//!
//! Files live flat in the upload directory under collision-free names. The
//! account row stores the relative path `uploads/<file>`, which is also the
//! URL path they are served from.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// URL and stored-path prefix for license documents.
pub const UPLOAD_PREFIX: &str = "uploads";

/// Accepted document extensions.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// Longest sanitized original name kept in the stored file name.
const MAX_STEM_LEN: usize = 64;

/// Writes and reads license documents on the local filesystem.
#[derive(Debug, Clone)]
pub struct LicenseStorage {
    dir: PathBuf,
}

impl LicenseStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LicenseStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the upload directory if needed.
    pub async fn ensure_dir(&self) -> Result<(), ApiError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            tracing::error!(dir = %self.dir.display(), error = %e, "Cannot create upload directory");
            ApiError::internal("Upload storage unavailable")
        })
    }

    /// Stores an uploaded document and returns its relative path.
    pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String, ApiError> {
        if bytes.is_empty() {
            return Err(ApiError::validation("License document is empty"));
        }

        let (stem, extension) = sanitize_file_name(original_name.unwrap_or_default())?;
        let file_name = format!("{}-{}.{}", Uuid::new_v4().simple(), stem, extension);

        self.ensure_dir().await?;
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to write license document");
            ApiError::internal("Failed to store license document")
        })?;

        info!(file = %file_name, size = bytes.len(), "License document stored");
        Ok(format!("{}/{}", UPLOAD_PREFIX, file_name))
    }

    /// Reads a stored document by its file name (the last path segment).
    pub async fn open(&self, file_name: &str) -> Result<(Vec<u8>, &'static str), ApiError> {
        if !is_plain_file_name(file_name) {
            return Err(ApiError::not_found("File", file_name));
        }

        let path = self.dir.join(file_name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((bytes, content_type(file_name))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ApiError::not_found("File", file_name))
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read license document");
                Err(ApiError::internal("Failed to read license document"))
            }
        }
    }

    /// Removes a stored document. Used to undo a save when signup fails.
    pub async fn remove(&self, stored_path: &str) {
        let Some(file_name) = stored_path.strip_prefix(&format!("{}/", UPLOAD_PREFIX)) else {
            return;
        };
        if !is_plain_file_name(file_name) {
            return;
        }

        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => debug!(file = %file_name, "Removed orphaned license document"),
            Err(e) => warn!(file = %file_name, error = %e, "Failed to remove license document"),
        }
    }
}

/// Splits an uploaded name into a safe stem and an allowed extension.
fn sanitize_file_name(original: &str) -> Result<(String, String), ApiError> {
    // Browsers on Windows may send a full path
    let base = original
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let (stem, extension) = base
        .rsplit_once('.')
        .ok_or_else(|| ApiError::validation("License document must be a PDF or image file"))?;

    let extension = extension.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::validation(format!(
            "License document must be one of: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let mut stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(MAX_STEM_LEN)
        .collect();
    if stem.trim_matches('_').is_empty() {
        stem = "license".to_string();
    }

    Ok((stem, extension))
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

fn content_type(file_name: &str) -> &'static str {
    match file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaValidationError {
    #[error("Media URI cannot be empty.")]
    EmptyMediaUri,

    #[error("invalid media URL: {0}")]
    InvalidUrl(String),
}

//
// ─── IMAGE REFERENCE ───────────────────────────────────────────────────────────
//

/// Where a question or option image lives: a local file or a remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum ImageRef {
    FilePath(PathBuf),
    Url(Url),
}

impl ImageRef {
    /// # Errors
    ///
    /// Returns `MediaValidationError::EmptyMediaUri` for an empty path.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, MediaValidationError> {
        let p = path.into();
        if p.as_os_str().is_empty() {
            return Err(MediaValidationError::EmptyMediaUri);
        }
        Ok(ImageRef::FilePath(p))
    }

    /// # Errors
    ///
    /// Returns `MediaValidationError` if the string is blank or not an absolute URL.
    pub fn from_url(url: impl AsRef<str>) -> Result<Self, MediaValidationError> {
        let s = url.as_ref().trim();
        if s.is_empty() {
            return Err(MediaValidationError::EmptyMediaUri);
        }
        let u = Url::parse(s).map_err(|e| MediaValidationError::InvalidUrl(e.to_string()))?;
        Ok(ImageRef::Url(u))
    }

    /// # Errors
    ///
    /// Returns `MediaValidationError::EmptyMediaUri` for an empty path.
    pub fn validate(&self) -> Result<(), MediaValidationError> {
        match self {
            ImageRef::FilePath(p) if p.as_os_str().is_empty() => {
                Err(MediaValidationError::EmptyMediaUri)
            }
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ImageRef::FilePath(p) => Some(p.as_path()),
            ImageRef::Url(_) => None,
        }
    }

    #[must_use]
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            ImageRef::Url(u) => Some(u),
            ImageRef::FilePath(_) => None,
        }
    }
}

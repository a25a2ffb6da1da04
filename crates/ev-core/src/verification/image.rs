//! Uploaded and captured images.
//!
//! [`ImageRef`] is the serializable metadata; [`ImageFile`] pairs it with the
//! raw bytes, which never leave memory.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upload ceiling for ID-card and selfie images.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Accepted MIME types. `image/jpg` is non-standard but some pickers send it.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageValidationError {
    #[error("unsupported image type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("image too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("image is empty")]
    Empty,
}

impl ImageValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnsupportedType { .. } => {
                "File type not supported. Please upload JPG, PNG, or WebP image"
            }
            Self::TooLarge { .. } => "File size too large. Maximum 5MB",
            Self::Empty => "The selected file is empty",
        }
    }
}

/// Check a candidate image against the MIME allow-list and size ceiling.
pub fn validate_image(mime_type: &str, size: u64) -> Result<(), ImageValidationError> {
    let normalized = mime_type.trim().to_ascii_lowercase();
    if !ACCEPTED_MIME_TYPES.contains(&normalized.as_str()) {
        return Err(ImageValidationError::UnsupportedType {
            mime_type: mime_type.to_string(),
        });
    }
    if size > MAX_IMAGE_BYTES {
        return Err(ImageValidationError::TooLarge {
            size,
            max: MAX_IMAGE_BYTES,
        });
    }
    if size == 0 {
        return Err(ImageValidationError::Empty);
    }
    Ok(())
}

/// Guess a MIME type from a file extension, for sources that carry none.
pub fn mime_from_file_name(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Serializable image metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    /// Opaque preview handle. Released when the image is replaced or cleared.
    pub preview_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// An image held by the workflow: metadata plus the raw bytes when they are
/// still in memory. Images restored from storage carry metadata only.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    meta: ImageRef,
    data: Option<Bytes>,
}

impl ImageFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Bytes,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        let preview_url = format!("preview:{}", uuid::Uuid::new_v4());
        Self {
            meta: ImageRef {
                name: name.into(),
                mime_type: mime_type.into(),
                size: data.len() as u64,
                preview_url,
                uploaded_at,
            },
            data: Some(data),
        }
    }

    /// Rebuild from persisted metadata. The bytes are gone.
    pub fn restored(meta: ImageRef) -> Self {
        Self { meta, data: None }
    }

    pub fn validate(&self) -> Result<(), ImageValidationError> {
        validate_image(&self.meta.mime_type, self.meta.size)
    }

    pub fn meta(&self) -> &ImageRef {
        &self.meta
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn mime_type(&self) -> &str {
        &self.meta.mime_type
    }

    pub fn size(&self) -> u64 {
        self.meta.size
    }

    pub fn preview_url(&self) -> &str {
        &self.meta.preview_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_allowed_types_within_limit() {
        for mime in ["image/jpeg", "image/jpg", "image/png", "image/webp", "IMAGE/PNG"] {
            assert!(validate_image(mime, 1024).is_ok(), "{mime} should pass");
        }
        assert!(validate_image("image/jpeg", MAX_IMAGE_BYTES).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let err = validate_image("image/gif", 10).unwrap_err();
        assert_eq!(
            err.user_message(),
            "File type not supported. Please upload JPG, PNG, or WebP image"
        );
        assert!(validate_image("application/pdf", 10).is_err());
    }

    #[test]
    fn test_rejects_oversized_file() {
        let err = validate_image("image/png", MAX_IMAGE_BYTES + 1).unwrap_err();
        assert_eq!(
            err,
            ImageValidationError::TooLarge {
                size: MAX_IMAGE_BYTES + 1,
                max: MAX_IMAGE_BYTES
            }
        );
        assert_eq!(err.user_message(), "File size too large. Maximum 5MB");
    }

    #[test]
    fn test_type_is_checked_before_size() {
        let err = validate_image("text/plain", MAX_IMAGE_BYTES * 2).unwrap_err();
        assert!(matches!(err, ImageValidationError::UnsupportedType { .. }));
    }

    #[test]
    fn test_image_file_metadata_tracks_bytes() {
        let file = ImageFile::new(
            "id.png",
            "image/png",
            Bytes::from_static(b"\x89PNG...."),
            Utc::now(),
        );
        assert_eq!(file.size(), 8);
        assert!(file.has_data());
        assert!(file.preview_url().starts_with("preview:"));
        assert!(file.validate().is_ok());

        let restored = ImageFile::restored(file.meta().clone());
        assert!(!restored.has_data());
        assert_eq!(restored.meta(), file.meta());
    }

    #[test]
    fn test_mime_from_file_name() {
        assert_eq!(mime_from_file_name("selfie.JPG"), Some("image/jpeg"));
        assert_eq!(mime_from_file_name("card.webp"), Some("image/webp"));
        assert_eq!(mime_from_file_name("noext"), None);
    }
}

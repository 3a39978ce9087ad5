//! Image Formats - Extension Allowlist and MIME Mapping

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpg,
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [Self::Jpg, Self::Jpeg, Self::Png, Self::Webp];

    /// Accepts `.jpg` or `jpg`, any case.
    pub fn from_extension(ext: &str) -> Result<Self, StoreError> {
        let bare = ext.strip_prefix('.').unwrap_or(ext);
        match bare.to_ascii_lowercase().as_str() {
            "jpg" => Ok(Self::Jpg),
            "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            _ => Err(StoreError::UnsupportedExtension(ext.to_string())),
        }
    }

    /// Format of an on-disk file, judged by its extension alone.
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| StoreError::UnsupportedExtension(String::new()))?;
        Self::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_case_and_dot_insensitive() {
        assert_eq!(ImageFormat::from_extension(".JPG").unwrap(), ImageFormat::Jpg);
        assert_eq!(ImageFormat::from_extension("webp").unwrap(), ImageFormat::Webp);
        assert!(ImageFormat::from_extension(".gif").is_err());
        assert!(ImageFormat::from_extension("").is_err());
    }

    #[test]
    fn test_jpg_maps_to_jpeg_mime() {
        assert_eq!(ImageFormat::Jpg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
    }

    #[test]
    fn test_from_path_without_extension() {
        assert!(ImageFormat::from_path(Path::new("/tmp/noext")).is_err());
    }
}

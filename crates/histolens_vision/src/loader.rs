//! Image loading from the formats clients send.

use base64::Engine;
use image::DynamicImage;

use crate::error::{Result, VisionError};

/// Decodes uploaded images from raw bytes, base64 strings, or files.
pub struct ImageLoader;

impl ImageLoader {
    /// Decode an image from raw encoded bytes (PNG, JPEG, ...).
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(VisionError::EmptyPayload);
        }
        Ok(image::load_from_memory(bytes)?)
    }

    /// Decode an image from a base64 string.
    ///
    /// A `data:image/...;base64,` URI prefix is tolerated and stripped.
    pub fn from_base64(data: &str) -> Result<DynamicImage> {
        let cleaned = if data.starts_with("data:") {
            data.split(',').nth(1).unwrap_or(data)
        } else {
            data
        };
        let bytes = base64::engine::general_purpose::STANDARD.decode(cleaned.trim())?;
        Self::from_bytes(&bytes)
    }

    /// Decode an image from a file path.
    pub fn from_path(path: &std::path::Path) -> Result<DynamicImage> {
        Ok(image::open(path)?)
    }
}

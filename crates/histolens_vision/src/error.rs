//! Vision error types.

use thiserror::Error;

/// Errors raised while decoding, transforming, or encoding images.
#[derive(Error, Debug)]
pub enum VisionError {
    /// Decoding or encoding failed inside the image library.
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// The payload was not valid base64.
    #[error("Base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A zero-length image payload.
    #[error("Empty image payload")]
    EmptyPayload,
}

/// Result type alias for vision operations.
pub type Result<T> = std::result::Result<T, VisionError>;

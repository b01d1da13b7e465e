//! Overlay encoding for transport.

use std::io::Cursor;

use base64::Engine;
use image::{ImageFormat, RgbImage};

use crate::error::Result;

/// Encode an image as PNG bytes.
pub fn png_bytes(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Encode an image as a `data:image/png;base64,...` URI.
///
/// This is the form embedded directly in JSON responses and `<img>` tags.
pub fn png_data_uri(image: &RgbImage) -> Result<String> {
    let bytes = png_bytes(image)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:image/png;base64,{encoded}"))
}

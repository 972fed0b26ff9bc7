use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::path::Path;

use crate::error::{ProcessError, Result};

/// Quality used for standardized photos unless configured otherwise
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Encode an opaque canvas as baseline JPEG
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    img.write_with_encoder(encoder)
        .map_err(|e| ProcessError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Write `bytes` to `path`, creating missing parent directories
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ProcessError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    std::fs::write(path, bytes).map_err(|source| ProcessError::Write {
        path: path.to_path_buf(),
        source,
    })
}

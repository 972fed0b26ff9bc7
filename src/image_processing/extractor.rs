use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{ProcessError, Result};

/// Segmentation model used when none is configured
pub const DEFAULT_MODEL: &str = "isnet-general-use";

/// Pluggable background-removal backend.
///
/// Takes encoded image bytes and a segmentation model identifier and
/// returns encoded RGBA bytes whose background pixels carry reduced or zero
/// alpha. A handle is created once per run and reused for every image.
pub trait ForegroundExtractor: Send + Sync {
    fn extract(&self, raw: &[u8], model: &str) -> Result<Vec<u8>>;

    /// Short name shown in logs
    fn name(&self) -> &'static str;
}

/// Decode extractor output into an RGBA buffer
pub fn decode_foreground(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}

/// Encode an RGBA buffer as PNG bytes
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| ProcessError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Background removal through the `rembg` command line tool.
///
/// Runs `rembg i -m <model> [-ppm] - -`, streaming the input on stdin and
/// reading the PNG cut-out from stdout.
pub struct RembgExtractor {
    program: PathBuf,
    post_process_mask: bool,
}

impl RembgExtractor {
    pub fn new(program: impl Into<PathBuf>, post_process_mask: bool) -> Self {
        Self {
            program: program.into(),
            post_process_mask,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn build_command(&self, model: &str) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("i").arg("-m").arg(model);
        if self.post_process_mask {
            command.arg("-ppm");
        }
        command.arg("-").arg("-");
        command
    }
}

impl Default for RembgExtractor {
    fn default() -> Self {
        Self::new("rembg", true)
    }
}

impl ForegroundExtractor for RembgExtractor {
    fn extract(&self, raw: &[u8], model: &str) -> Result<Vec<u8>> {
        let mut child = self
            .build_command(model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ProcessError::Extraction(format!(
                    "failed to execute {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProcessError::Extraction("rembg stdin unavailable".to_string()))?;

        // Feed stdin from a separate thread while stdout and stderr are drained
        let input = raw.to_vec();
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .map_err(|e| ProcessError::Extraction(format!("rembg did not finish: {}", e)))?;

        let write_result = writer
            .join()
            .map_err(|_| ProcessError::Extraction("rembg input writer panicked".to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessError::Extraction(format!(
                "rembg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        write_result
            .map_err(|e| ProcessError::Extraction(format!("failed to send image to rembg: {}", e)))?;

        if output.stdout.is_empty() {
            return Err(ProcessError::Extraction("rembg produced no output".to_string()));
        }

        Ok(output.stdout)
    }

    fn name(&self) -> &'static str {
        "rembg"
    }
}

/// Treats the input as already cut out: decodes it and hands it back as RGBA.
///
/// Images without an alpha channel come back fully opaque.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughExtractor;

impl ForegroundExtractor for PassthroughExtractor {
    fn extract(&self, raw: &[u8], _model: &str) -> Result<Vec<u8>> {
        let img = decode_foreground(raw)?;
        encode_png(&img)
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_passthrough_keeps_alpha() {
        let mut img = RgbaImage::from_pixel(8, 6, Rgba([10, 20, 30, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let bytes = encode_png(&img).unwrap();

        let out = PassthroughExtractor.extract(&bytes, DEFAULT_MODEL).unwrap();
        let decoded = decode_foreground(&out).unwrap();

        assert_eq!(decoded.dimensions(), (8, 6));
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
        assert_eq!(decoded.get_pixel(3, 3), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_passthrough_rejects_garbage() {
        let result = PassthroughExtractor.extract(b"not an image", DEFAULT_MODEL);
        assert!(matches!(result, Err(ProcessError::Decode(_))));
    }

    #[test]
    fn test_rembg_command_line() {
        let extractor = RembgExtractor::new("/opt/rembg/bin/rembg", true);
        let command = extractor.build_command("u2net_human_seg");
        let args: Vec<_> = command
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(command.get_program(), "/opt/rembg/bin/rembg");
        assert_eq!(args, vec!["i", "-m", "u2net_human_seg", "-ppm", "-", "-"]);
    }

    #[test]
    fn test_rembg_without_post_processing() {
        let extractor = RembgExtractor::new("rembg", false);
        let command = extractor.build_command(DEFAULT_MODEL);
        let args: Vec<_> = command
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(args, vec!["i", "-m", DEFAULT_MODEL, "-", "-"]);
    }

    #[test]
    fn test_rembg_missing_program_is_extraction_failure() {
        let extractor = RembgExtractor::new("/nonexistent/rembg-binary", true);
        let result = extractor.extract(b"bytes", DEFAULT_MODEL);
        assert!(matches!(result, Err(ProcessError::Extraction(_))));
    }
}

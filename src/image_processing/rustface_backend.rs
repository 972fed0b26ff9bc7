use anyhow::{Context, Result};
use image::RgbImage;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::face_locator::{DetectorParams, FaceBox, FaceLocator};
use super::profile::SMALLEST_MIN_FACE_SIZE;

/// Face locator backed by the `rustface` crate (SeetaFace frontal engine).
///
/// The model is read once; every call builds a detector from a clone of it,
/// so a single locator can be shared between worker threads.
pub struct RustfaceLocator {
    model: rustface::Model,
    params: DetectorParams,
}

impl RustfaceLocator {
    /// Load a SeetaFace model file (e.g. `seeta_fd_frontal_v1.0.bin`)
    pub fn from_file(model_path: &Path, params: DetectorParams) -> Result<Self> {
        let file = File::open(model_path)
            .with_context(|| format!("Failed to open face model: {}", model_path.display()))?;
        let model = rustface::read_model(BufReader::new(file))
            .with_context(|| format!("Failed to load face model: {}", model_path.display()))?;

        Ok(Self { model, params })
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }
}

impl FaceLocator for RustfaceLocator {
    fn locate(&self, image: &RgbImage) -> Vec<FaceBox> {
        let (width, height) = image.dimensions();
        let gray = image::DynamicImage::ImageRgb8(image.clone()).to_luma8();

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        // rustface asserts on anything smaller
        detector.set_min_face_size(self.params.min_face_size.max(SMALLEST_MIN_FACE_SIZE));
        detector.set_score_thresh(self.params.score_threshold);
        detector.set_pyramid_scale_factor(self.params.pyramid_scale_factor);
        detector.set_slide_window_step(self.params.window_step, self.params.window_step);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                FaceBox::clipped(
                    bbox.x() as i64,
                    bbox.y() as i64,
                    bbox.width() as i64,
                    bbox.height() as i64,
                    width,
                    height,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_an_error() {
        let result = RustfaceLocator::from_file(
            Path::new("/nonexistent/seeta_fd_frontal_v1.0.bin"),
            DetectorParams::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_min_face_size_from_profile() {
        let params = DetectorParams::with_min_face_size(100);
        assert_eq!(params.min_face_size, 100);
        assert_eq!(params.window_step, 4);
        assert!((params.pyramid_scale_factor - 0.909_090_9).abs() < 1e-5);
    }
}

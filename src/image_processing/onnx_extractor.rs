//! Background removal with an ISNet/U2Net style ONNX segmentation model.
//!
//! The session is loaded once and shared; `Session::run` needs exclusive
//! access, so concurrent callers take turns on the mutex.
use anyhow::{Context, Result as AnyResult};
use image::imageops::FilterType;
use image::{GrayImage, Luma, Rgba, RgbaImage, RgbImage};
use imageproc::distance_transform::Norm;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

use super::extractor::{encode_png, ForegroundExtractor};
use crate::error::{ProcessError, Result};

const MODEL_SIZE: u32 = 1024;
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [1.0, 1.0, 1.0];

pub struct OnnxExtractor {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    post_process_mask: bool,
}

impl OnnxExtractor {
    pub fn from_file(model_path: &Path, post_process_mask: bool) -> AnyResult<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load segmentation model: {}", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("Segmentation model has no inputs")?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .context("Segmentation model has no outputs")?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            post_process_mask,
        })
    }

    /// Run the model and return the soft mask (model resolution, values 0..=255)
    fn predict_mask(&self, img: &RgbImage) -> Result<GrayImage> {
        let input = prepare_tensor(img);
        let input_value = Value::from_array((vec![1usize, 3, MODEL_SIZE as usize, MODEL_SIZE as usize], input))
            .map_err(|e| ProcessError::Extraction(e.to_string()))?;

        let (shape, prediction) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| ProcessError::Extraction("segmentation session poisoned".to_string()))?;
            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input_value])
                .map_err(|e| ProcessError::Extraction(e.to_string()))?;
            let (shape, data) = outputs[self.output_name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(|e| ProcessError::Extraction(e.to_string()))?;
            let shape: Vec<i64> = shape.iter().copied().collect();
            (shape, data.to_vec())
        };

        if shape.len() < 2 {
            return Err(ProcessError::Extraction(format!(
                "unexpected mask shape {:?}",
                shape
            )));
        }
        let mask_height = shape[shape.len() - 2] as u32;
        let mask_width = shape[shape.len() - 1] as u32;

        normalize_mask(&prediction, mask_width, mask_height)
    }
}

impl ForegroundExtractor for OnnxExtractor {
    fn extract(&self, raw: &[u8], _model: &str) -> Result<Vec<u8>> {
        let source = image::load_from_memory(raw)?.to_rgb8();
        let (width, height) = source.dimensions();

        let mask = self.predict_mask(&source)?;
        let mut mask = image::imageops::resize(&mask, width, height, FilterType::Lanczos3);
        if self.post_process_mask {
            mask = refine_mask(&mask);
        }

        encode_png(&cut_out(&source, &mask))
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Resize to the model resolution and lay out as normalized NCHW floats
fn prepare_tensor(img: &RgbImage) -> Vec<f32> {
    let resized = image::imageops::resize(img, MODEL_SIZE, MODEL_SIZE, FilterType::Lanczos3);
    let max_value = resized.as_raw().iter().copied().max().unwrap_or(0).max(1) as f32;

    let plane = (MODEL_SIZE * MODEL_SIZE) as usize;
    let mut tensor = vec![0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let idx = (y * MODEL_SIZE + x) as usize;
        for c in 0..3 {
            tensor[c * plane + idx] = (pixel[c] as f32 / max_value - MEAN[c]) / STD[c];
        }
    }
    tensor
}

/// Min-max normalize raw predictions into an 8-bit mask
fn normalize_mask(prediction: &[f32], width: u32, height: u32) -> Result<GrayImage> {
    let len = (width * height) as usize;
    if prediction.len() < len {
        return Err(ProcessError::Extraction(format!(
            "mask has {} values, expected {}",
            prediction.len(),
            len
        )));
    }

    let values = &prediction[..len];
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = (max - min).max(f32::EPSILON);

    let pixels = values
        .iter()
        .map(|v| (((v - min) / range) * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();

    GrayImage::from_raw(width, height, pixels)
        .ok_or_else(|| ProcessError::Extraction("mask buffer size mismatch".to_string()))
}

/// Opening to drop specks, gaussian blur, then a hard threshold
fn refine_mask(mask: &GrayImage) -> GrayImage {
    let binary = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > 127 {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let opened = imageproc::morphology::open(&binary, Norm::LInf, 1);
    let blurred = imageproc::filter::gaussian_blur_f32(&opened, 2.0);

    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if blurred.get_pixel(x, y)[0] < 127 {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Use the mask as the alpha channel of the source image
fn cut_out(source: &RgbImage, mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(source.width(), source.height(), |x, y| {
        let p = source.get_pixel(x, y);
        Rgba([p[0], p[1], p[2], mask.get_pixel(x, y)[0]])
    })
}

use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{ImageBuffer, RgbaImage};

use crate::error::{ProcessError, Result};

/// Scaled size of a `width x height` image, each side rounded to the nearest pixel
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    (
        (width as f64 * scale).round() as u32,
        (height as f64 * scale).round() as u32,
    )
}

/// Rectangle of a source image in pixel coordinates; edges may be fractional
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRegion {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SourceRegion {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: width as f64,
            height: height as f64,
        }
    }
}

/// Resize an RGBA image to exact dimensions with a Lanczos3 filter.
///
/// Colour channels are premultiplied by alpha while resampling, so fully
/// transparent background pixels do not bleed into the subject's edges.
pub fn resize_rgba(img: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage> {
    let (src_width, src_height) = img.dimensions();
    resize_rgba_region(img, SourceRegion::full(src_width, src_height), width, height)
}

/// Resample only `region` of `img` into a `width x height` buffer.
///
/// Filter taps still read source pixels outside the region, so the result
/// matches the same window of a full resize at the same scale.
pub fn resize_rgba_region(
    img: &RgbaImage,
    region: SourceRegion,
    width: u32,
    height: u32,
) -> Result<RgbaImage> {
    let (src_width, src_height) = img.dimensions();

    if src_width == width
        && src_height == height
        && region == SourceRegion::full(src_width, src_height)
    {
        return Ok(img.clone());
    }

    if src_width == 0
        || src_height == 0
        || width == 0
        || height == 0
        || region.width <= 0.0
        || region.height <= 0.0
    {
        return Err(ProcessError::Resize(format!(
            "cannot resize {:.1}x{:.1} of {}x{} to {}x{}",
            region.width, region.height, src_width, src_height, width, height
        )));
    }

    let src_image = Image::from_vec_u8(src_width, src_height, img.as_raw().clone(), PixelType::U8x4)
        .map_err(|e| ProcessError::Resize(e.to_string()))?;

    let mut dst_image = Image::new(width, height, PixelType::U8x4);

    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3))
        .crop(region.left, region.top, region.width, region.height);
    let mut resizer = Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ProcessError::Resize(e.to_string()))?;

    ImageBuffer::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| ProcessError::Resize("resized buffer has the wrong length".to_string()))
}

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use super::extractor::encode_png;
use super::face_policy::{FaceReference, ReferenceSource};
use super::output::write_output;
use crate::error::Result;

const DETECTED_COLOR: Rgba<u8> = Rgba([0, 200, 0, 255]);
const FALLBACK_COLOR: Rgba<u8> = Rgba([220, 0, 0, 255]);
const LINE_WIDTH: i32 = 3;

/// `<dir>/<stem>_processed_debug.png` next to the standardized output
pub fn debug_path_for(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    output_path.with_file_name(format!("{}_debug.png", stem))
}

/// Foreground with the face reference drawn on it.
///
/// Detected faces get a green box; the centre fallback gets a red square of
/// the fallback height with a cross on the centre point.
pub fn draw_reference(foreground: &RgbaImage, reference: &FaceReference) -> RgbaImage {
    let mut canvas = foreground.clone();

    let (x, y, width, height, color) = match reference.source {
        ReferenceSource::Detected(face) => {
            (face.x as i32, face.y as i32, face.width, face.height, DETECTED_COLOR)
        }
        ReferenceSource::Fallback => {
            let side = reference.height.max(1.0);
            (
                (reference.center_x - side / 2.0).round() as i32,
                (reference.center_y - side / 2.0).round() as i32,
                side.round() as u32,
                side.round() as u32,
                FALLBACK_COLOR,
            )
        }
    };

    for inset in 0..LINE_WIDTH {
        let w = width.saturating_sub(2 * inset as u32);
        let h = height.saturating_sub(2 * inset as u32);
        if w == 0 || h == 0 {
            break;
        }
        draw_hollow_rect_mut(&mut canvas, Rect::at(x + inset, y + inset).of_size(w, h), color);
    }

    draw_cross_mut(
        &mut canvas,
        color,
        reference.center_x.round() as i32,
        reference.center_y.round() as i32,
    );

    canvas
}

/// Render the overlay and write it next to `output_path`
pub fn write_debug_image(
    foreground: &RgbaImage,
    reference: &FaceReference,
    output_path: &Path,
) -> Result<PathBuf> {
    let path = debug_path_for(output_path);
    let overlay = draw_reference(foreground, reference);
    write_output(&path, &encode_png(&overlay)?)?;
    Ok(path)
}

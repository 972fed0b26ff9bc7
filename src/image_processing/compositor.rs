use image::{Rgb, RgbImage, RgbaImage};

use super::face_policy::FaceReference;
use super::profile::Profile;
use super::resize::{resize_rgba_region, scaled_dimensions, SourceRegion};
use crate::error::Result;

/// Where and how large the foreground lands on the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalLayout {
    pub scale: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Reference point in scaled-foreground coordinates
    pub scaled_ref_x: i64,
    pub scaled_ref_y: i64,
    /// Canvas position of the scaled foreground's top-left corner; may be negative
    pub paste_x: i64,
    pub paste_y: i64,
}

/// Compute scale and placement so the reference height becomes
/// `H * face_height_ratio` and the reference centre lands on row
/// `round(H * face_position_ratio)`. Horizontal placement always centres
/// the scaled foreground and ignores the reference's x.
pub fn compute_layout(
    profile: &Profile,
    foreground_width: u32,
    foreground_height: u32,
    reference: &FaceReference,
) -> CanonicalLayout {
    assert!(
        reference.height > 0.0,
        "reference height must be positive, got {}",
        reference.height
    );

    let scale = profile.target_face_height() / reference.height;
    let (scaled_width, scaled_height) =
        scaled_dimensions(foreground_width, foreground_height, scale);

    let scaled_ref_x = (reference.center_x * scale).round() as i64;
    let scaled_ref_y = (reference.center_y * scale).round() as i64;

    let paste_y = profile.target_face_row() - scaled_ref_y;
    // integer division truncates toward zero
    let paste_x = (profile.canvas_width as i64 - scaled_width as i64) / 2;

    CanonicalLayout {
        scale,
        scaled_width,
        scaled_height,
        scaled_ref_x,
        scaled_ref_y,
        paste_x,
        paste_y,
    }
}

/// Part of the scaled foreground that lands on the canvas, in scaled pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Intersect the scaled foreground with the canvas. `None` when nothing of
/// it is visible. The window is never larger than the canvas.
pub fn visible_window(layout: &CanonicalLayout, canvas_width: u32, canvas_height: u32) -> Option<VisibleWindow> {
    let left = (-layout.paste_x).max(0);
    let top = (-layout.paste_y).max(0);
    let right = (canvas_width as i64 - layout.paste_x).min(layout.scaled_width as i64);
    let bottom = (canvas_height as i64 - layout.paste_y).min(layout.scaled_height as i64);

    if right <= left || bottom <= top {
        return None;
    }

    Some(VisibleWindow {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}

/// Scale the foreground per `layout` and blend it onto a flat canvas.
///
/// Only the part that lands inside the canvas is resampled. The result is
/// opaque.
pub fn composite(foreground: &RgbaImage, layout: &CanonicalLayout, profile: &Profile) -> Result<RgbImage> {
    let mut canvas = RgbImage::from_pixel(
        profile.canvas_width,
        profile.canvas_height,
        Rgb(profile.background),
    );

    if layout.scaled_width == 0 || layout.scaled_height == 0 {
        return Ok(canvas);
    }

    let window = match visible_window(layout, profile.canvas_width, profile.canvas_height) {
        Some(window) => window,
        None => return Ok(canvas),
    };

    let (width, height) = foreground.dimensions();
    // per-axis ratio of the rounded scaled size, as a full resize would use
    let scale_x = layout.scaled_width as f64 / width as f64;
    let scale_y = layout.scaled_height as f64 / height as f64;

    let left = window.x as f64 / scale_x;
    let top = window.y as f64 / scale_y;
    let region = SourceRegion {
        left,
        top,
        width: (window.width as f64 / scale_x).min(width as f64 - left),
        height: (window.height as f64 / scale_y).min(height as f64 - top),
    };

    let scaled = resize_rgba_region(foreground, region, window.width, window.height)?;
    blend_onto(
        &mut canvas,
        &scaled,
        layout.paste_x + window.x as i64,
        layout.paste_y + window.y as i64,
    );

    Ok(canvas)
}

/// Resolve the layout and produce the final image in one step
pub fn standardize(
    foreground: &RgbaImage,
    reference: &FaceReference,
    profile: &Profile,
) -> Result<(RgbImage, CanonicalLayout)> {
    let (width, height) = foreground.dimensions();
    let layout = compute_layout(profile, width, height, reference);
    let output = composite(foreground, &layout, profile)?;
    Ok((output, layout))
}

/// Alpha-blend `overlay` onto `canvas` with its top-left corner at
/// `(offset_x, offset_y)`, clipping to the canvas.
fn blend_onto(canvas: &mut RgbImage, overlay: &RgbaImage, offset_x: i64, offset_y: i64) {
    let (canvas_width, canvas_height) = canvas.dimensions();
    let (overlay_width, overlay_height) = overlay.dimensions();

    let x_start = offset_x.max(0);
    let y_start = offset_y.max(0);
    let x_end = (offset_x + overlay_width as i64).min(canvas_width as i64);
    let y_end = (offset_y + overlay_height as i64).min(canvas_height as i64);

    if x_start >= x_end || y_start >= y_end {
        return;
    }

    for cy in y_start..y_end {
        let oy = (cy - offset_y) as u32;
        for cx in x_start..x_end {
            let ox = (cx - offset_x) as u32;
            let src = overlay.get_pixel(ox, oy);
            let alpha = src[3] as u32;
            if alpha == 0 {
                continue;
            }

            let dst = canvas.get_pixel_mut(cx as u32, cy as u32);
            if alpha == 255 {
                *dst = Rgb([src[0], src[1], src[2]]);
                continue;
            }

            for c in 0..3 {
                let blended = (src[c] as u32 * alpha + dst[c] as u32 * (255 - alpha) + 127) / 255;
                dst[c] = blended as u8;
            }
        }
    }
}

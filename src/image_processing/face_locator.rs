use image::RgbImage;

/// Axis-aligned face rectangle in foreground pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Centre pixel of the box; odd sides round down
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x + self.width / 2) as f64,
            (self.y + self.height / 2) as f64,
        )
    }

    /// Clip a raw detector rectangle (which may start left of or above the
    /// image, or run past its edges) to the image. Returns `None` when
    /// nothing of the rectangle remains.
    pub fn clipped(
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        image_width: u32,
        image_height: u32,
    ) -> Option<Self> {
        let left = x.max(0);
        let top = y.max(0);
        let right = (x + width).min(image_width as i64);
        let bottom = (y + height).min(image_height as i64);

        if right <= left || bottom <= top {
            return None;
        }

        Some(Self::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

/// Detector tuning shared by all face locator backends
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorParams {
    pub min_face_size: u32,
    /// Shrink factor between pyramid levels, in (0, 1)
    pub pyramid_scale_factor: f32,
    pub score_threshold: f64,
    pub window_step: u32,
}

impl DetectorParams {
    pub fn with_min_face_size(min_face_size: u32) -> Self {
        Self {
            min_face_size,
            ..Self::default()
        }
    }
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            min_face_size: 50,
            // one pyramid level per 1.1x scale step
            pyramid_scale_factor: 1.0 / 1.1,
            score_threshold: 2.0,
            window_step: 4,
        }
    }
}

/// Pluggable face detection backend.
///
/// Implementations must be deterministic for a given image and
/// configuration. An empty list means no face was found and is not an
/// error.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, image: &RgbImage) -> Vec<FaceBox>;
}

/// Pick the face with the largest area; the first one wins ties.
pub fn select_largest(candidates: &[FaceBox]) -> Option<FaceBox> {
    let mut best: Option<FaceBox> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.area() <= current.area() => {}
            _ => best = Some(*candidate),
        }
    }
    best
}

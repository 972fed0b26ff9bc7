use super::face_locator::{select_largest, FaceBox};

/// Where a reference came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceSource {
    Detected(FaceBox),
    /// No face was found; the image centre stands in for it
    Fallback,
}

/// Anchor used to scale and place the subject: a point and a height, both
/// in foreground pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceReference {
    pub center_x: f64,
    pub center_y: f64,
    /// Always greater than zero
    pub height: f64,
    pub source: ReferenceSource,
}

impl FaceReference {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ReferenceSource::Fallback)
    }
}

/// Resolve detector output into a single reference.
///
/// The largest candidate wins (first on ties). With no candidates the
/// reference is the image centre and `image_height / fallback_divisor`,
/// never less than one pixel. All halving and division is on whole pixels.
pub fn resolve_reference(
    candidates: &[FaceBox],
    image_width: u32,
    image_height: u32,
    fallback_divisor: u32,
) -> FaceReference {
    match select_largest(candidates) {
        Some(face) => {
            let (center_x, center_y) = face.center();
            FaceReference {
                center_x,
                center_y,
                height: face.height as f64,
                source: ReferenceSource::Detected(face),
            }
        }
        None => FaceReference {
            center_x: (image_width / 2) as f64,
            center_y: (image_height / 2) as f64,
            height: (image_height / fallback_divisor.max(1)).max(1) as f64,
            source: ReferenceSource::Fallback,
        },
    }
}

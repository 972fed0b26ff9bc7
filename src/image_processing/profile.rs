use crate::error::{ProcessError, Result};
use clap::ValueEnum;

/// Flat background shared by the built-in profiles (#e1e1e1)
pub const DEFAULT_BACKGROUND: [u8; 3] = [225, 225, 225];

/// Smallest minimum face size the SeetaFace detector accepts
pub const SMALLEST_MIN_FACE_SIZE: u32 = 20;

/// Built-in standardization styles
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProfileName {
    /// 810x1440 canvas, face centre at 38% from the top
    #[value(name = "standard")]
    Standard,
    /// 2160x3840 canvas, face centre at 30% from the top
    #[value(name = "uhd")]
    Uhd,
}

impl ProfileName {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "standard" => Some(ProfileName::Standard),
            "uhd" => Some(ProfileName::Uhd),
            _ => None,
        }
    }
}

/// Constants for one deployment: canvas geometry, face placement,
/// no-face fallback and detector sensitivity.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Fraction of the canvas height the reference height occupies after scaling
    pub face_height_ratio: f64,
    /// Fraction of the canvas height (from the top) where the reference centre lands
    pub face_position_ratio: f64,
    pub background: [u8; 3],
    /// Fallback reference height is `image_height / fallback_divisor`
    pub fallback_divisor: u32,
    /// Smallest face (pixels) the detector reports
    pub min_face_size: u32,
}

impl Profile {
    pub fn standard() -> Self {
        Self {
            canvas_width: 810,
            canvas_height: 1440,
            face_height_ratio: 0.18,
            face_position_ratio: 0.38,
            background: DEFAULT_BACKGROUND,
            fallback_divisor: 4,
            min_face_size: 50,
        }
    }

    pub fn uhd() -> Self {
        Self {
            canvas_width: 2160,
            canvas_height: 3840,
            face_height_ratio: 0.18,
            face_position_ratio: 0.30,
            background: DEFAULT_BACKGROUND,
            fallback_divisor: 5,
            min_face_size: 100,
        }
    }

    pub fn named(name: ProfileName) -> Self {
        match name {
            ProfileName::Standard => Self::standard(),
            ProfileName::Uhd => Self::uhd(),
        }
    }

    /// Target height of the reference after scaling, in canvas pixels
    pub fn target_face_height(&self) -> f64 {
        self.canvas_height as f64 * self.face_height_ratio
    }

    /// Canvas row the reference centre is placed on
    pub fn target_face_row(&self) -> i64 {
        (self.canvas_height as f64 * self.face_position_ratio).round() as i64
    }

    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ProcessError::InvalidProfile(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }

        for (name, ratio) in [
            ("face height ratio", self.face_height_ratio),
            ("face position ratio", self.face_position_ratio),
        ] {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(ProcessError::InvalidProfile(format!(
                    "{} must be between 0 and 1 (exclusive), got {}",
                    name, ratio
                )));
            }
        }

        if self.fallback_divisor == 0 {
            return Err(ProcessError::InvalidProfile(
                "fallback divisor must be greater than 0".to_string(),
            ));
        }

        if self.min_face_size < SMALLEST_MIN_FACE_SIZE {
            return Err(ProcessError::InvalidProfile(format!(
                "minimum face size must be at least {}px, got {}",
                SMALLEST_MIN_FACE_SIZE, self.min_face_size
            )));
        }

        Ok(())
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::standard()
    }
}

/// Parse `#RRGGBB` (or `#RGB`) into an opaque colour
pub fn parse_hex_color(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some([r, g, b])
        }
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(rgb)
        }
        _ => None,
    }
}

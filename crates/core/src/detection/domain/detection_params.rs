use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_MAX_FACE, DEFAULT_MIN_FACE, DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR,
};

#[derive(Error, Debug, PartialEq)]
pub enum ParamsError {
    #[error("scale factor must be greater than 1.0, got {0}")]
    ScaleFactor(f64),
    #[error("min size ratio must be in (0.0, 1.0], got {0}")]
    MinSizeRatio(f64),
}

/// Multi-scale scan settings.
///
/// `max_size` of `(0, 0)` means unbounded: the whole image. A maximum
/// below the minimum is allowed and yields no detections.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub min_size: (u32, u32),
    pub max_size: (u32, u32),
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: (DEFAULT_MIN_FACE, DEFAULT_MIN_FACE),
            max_size: (DEFAULT_MAX_FACE, DEFAULT_MAX_FACE),
        }
    }
}

impl DetectionParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(ParamsError::ScaleFactor(self.scale_factor));
        }
        Ok(())
    }

    pub fn is_max_bounded(&self) -> bool {
        self.max_size.0 != 0 && self.max_size.1 != 0
    }

    /// Effective maximum window for an image, substituting the image size
    /// when unbounded.
    pub fn max_size_for(&self, width: u32, height: u32) -> (u32, u32) {
        if self.is_max_bounded() {
            self.max_size
        } else {
            (width, height)
        }
    }

    /// Square minimum size as a fraction of the shorter frame side.
    pub fn min_size_for(width: u32, height: u32, ratio: f64) -> Result<(u32, u32), ParamsError> {
        if ratio <= 0.0 || !(0.0..=1.0).contains(&ratio) {
            return Err(ParamsError::MinSizeRatio(ratio));
        }
        let side = (width.min(height) as f64 * ratio) as u32;
        Ok((side, side))
    }
}

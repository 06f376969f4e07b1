use std::path::Path;

use crate::shared::frame::Frame;

/// Saves a frame as an image file; the format follows the path extension.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}

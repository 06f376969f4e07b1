use crate::detection::domain::detection::Detection;
use crate::imaging::gray_image::GrayImage;
use crate::shared::frame::Frame;

/// Domain interface for face detection on a single frame.
///
/// `&mut self` lets implementations reuse scratch buffers between frames.
pub trait FaceDetector: Send {
    fn detect_gray(
        &mut self,
        image: &GrayImage,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;

    /// Converts the frame to grayscale, then runs [`Self::detect_gray`].
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let gray = frame.to_gray()?;
        self.detect_gray(&gray)
    }
}

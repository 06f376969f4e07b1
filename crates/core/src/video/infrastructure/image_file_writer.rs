use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes frames through the `image` crate.
///
/// Gray, RGB and RGBA frames are saved with their own color type.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let (w, h, data) = (frame.width(), frame.height(), frame.data().to_vec());
        let img = match frame.channels() {
            1 => image::GrayImage::from_raw(w, h, data).map(image::DynamicImage::ImageLuma8),
            3 => image::RgbImage::from_raw(w, h, data).map(image::DynamicImage::ImageRgb8),
            4 => image::RgbaImage::from_raw(w, h, data).map(image::DynamicImage::ImageRgba8),
            n => return Err(format!("Cannot save a frame with {n} channels").into()),
        }
        .ok_or("Failed to create image from frame data")?;

        img.save(path)?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, pixel: &[u8]) -> Frame {
        let data = pixel.repeat((width * height) as usize);
        Frame::new(data, width, height, pixel.len() as u8, 0)
    }

    #[test]
    fn test_write_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");
        ImageFileWriter::new()
            .write(&path, &make_frame(40, 30, &[1, 2, 3]))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_rgb_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        ImageFileWriter::new()
            .write(&path, &make_frame(50, 50, &[50, 100, 200]))
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (50, 50));
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200]);
    }

    #[test]
    fn test_gray_frame_saved_as_luma() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        ImageFileWriter::new()
            .write(&path, &make_frame(8, 4, &[77]))
            .unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.color(), image::ColorType::L8);
        assert_eq!(img.to_luma8().get_pixel(3, 2).0, [77]);
    }

    #[test]
    fn test_two_channel_frame_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let frame = make_frame(4, 4, &[1, 2]);
        assert!(ImageFileWriter::new()
            .write(&dir.path().join("bad.png"), &frame)
            .is_err());
    }
}

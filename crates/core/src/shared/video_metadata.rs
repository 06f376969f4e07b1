use std::path::PathBuf;

/// Properties of an opened frame source. Still images report `fps = 0`
/// and a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    pub fn is_still_image(&self) -> bool {
        self.fps == 0.0 && self.total_frames == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_is_not_still_image() {
        let meta = VideoMetadata {
            width: 640,
            height: 480,
            fps: 15.0,
            total_frames: 450,
            codec: "h264".to_string(),
            source_path: Some(PathBuf::from("sub101_15fps.mp4")),
        };
        assert!(!meta.is_still_image());
    }

    #[test]
    fn test_image_metadata() {
        let meta = VideoMetadata {
            width: 800,
            height: 600,
            fps: 0.0,
            total_frames: 1,
            codec: String::new(),
            source_path: None,
        };
        assert!(meta.is_still_image());
    }
}

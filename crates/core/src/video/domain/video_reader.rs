use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Source of frames for detection: a video container or a still image.
pub trait VideoReader: Send {
    /// Opens the source and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Frames in decode order, indexed from 0.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Decodes only the first frame; `None` when the source has none.
    fn first_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        self.frames().next().transpose()
    }

    fn close(&mut self);
}

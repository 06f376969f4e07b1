use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::infrastructure::ffmpeg_support::RgbDecoder;

/// Presents a still image as a one-frame video (`fps = 0`, one frame).
///
/// Decoding goes through ffmpeg like [`FfmpegReader`](super::ffmpeg_reader::FfmpegReader)
/// so PNG, JPEG and BMP inputs all come out as RGB24.
pub struct ImageFileReader {
    frame: Option<Frame>,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self { frame: None }
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_single_frame(
    ictx: &mut ffmpeg_next::format::context::Input,
    rgb: &mut RgbDecoder,
) -> Result<Frame, Box<dyn std::error::Error>> {
    for (stream, packet) in ictx.packets() {
        if stream.index() != rgb.stream_index {
            continue;
        }
        rgb.decoder.send_packet(&packet)?;
        if let Some(frame) = rgb.receive(0)? {
            return Ok(frame);
        }
    }

    // Some decoders hold the picture until flushed.
    let _ = rgb.decoder.send_eof();
    rgb.receive(0)?
        .ok_or_else(|| "Failed to decode image".into())
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let mut ictx = ffmpeg_next::format::input(path)
            .map_err(|e| format!("Cannot open image {}: {e}", path.display()))?;
        let mut rgb = RgbDecoder::open(&ictx)?;
        let frame = decode_single_frame(&mut ictx, &mut rgb)?;

        let metadata = VideoMetadata {
            width: rgb.width,
            height: rgb.height,
            fps: 0.0,
            total_frames: 1,
            codec: String::new(),
            source_path: Some(path.to_path_buf()),
        };
        log::debug!(
            "Opened image {} ({}x{})",
            path.display(),
            metadata.width,
            metadata.height
        );

        self.frame = Some(frame);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        if self.frame.is_none() {
            return Box::new(std::iter::once(Err("ImageFileReader: not opened".into())));
        }
        Box::new(self.frame.take().into_iter().map(Ok))
    }

    fn close(&mut self) {
        self.frame = None;
    }
}

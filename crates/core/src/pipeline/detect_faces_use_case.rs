use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::imaging::annotate::{draw_regions, DEFAULT_BOX_COLOR};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

const ANNOTATION_THICKNESS: u32 = 2;

/// Faces found in one decoded frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameDetections {
    pub frame_index: usize,
    pub detections: Vec<Detection>,
}

impl FrameDetections {
    pub fn regions(&self) -> Vec<Region> {
        self.detections.iter().map(|d| d.region).collect()
    }
}

/// Read → grayscale → detect over the leading frames of a source.
pub struct DetectFacesUseCase {
    reader: Box<dyn VideoReader>,
    detector: Box<dyn FaceDetector>,
    image_writer: Option<Box<dyn ImageWriter>>,
    logger: Box<dyn PipelineLogger>,
}

impl DetectFacesUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        detector: Box<dyn FaceDetector>,
        image_writer: Option<Box<dyn ImageWriter>>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            detector,
            image_writer,
            logger,
        }
    }

    /// Detects faces in up to `max_frames` frames of `input`.
    ///
    /// With `annotate`, the first frame is saved there with its detections
    /// outlined. Fails if the source yields no frame at all.
    pub fn execute(
        &mut self,
        input: &Path,
        max_frames: usize,
        annotate: Option<&Path>,
    ) -> Result<Vec<FrameDetections>, Box<dyn std::error::Error>> {
        if max_frames == 0 {
            return Err("At least one frame must be read".into());
        }
        if annotate.is_some() && self.image_writer.is_none() {
            return Err("Annotation requested without an image writer".into());
        }

        let metadata = self.reader.open(input)?;
        let kind = if metadata.is_still_image() { "image" } else { "video" };
        self.logger.info(&format!(
            "Reading {kind} {} ({}x{})",
            input.display(),
            metadata.width,
            metadata.height
        ));
        let total = if metadata.total_frames > 0 {
            max_frames.min(metadata.total_frames)
        } else {
            max_frames
        };

        let result = self.process_frames(max_frames, total, annotate);
        self.reader.close();
        let results = result?;

        if results.is_empty() {
            return Err(format!("No frame could be read from {}", input.display()).into());
        }
        self.logger.summary();
        Ok(results)
    }

    fn process_frames(
        &mut self,
        max_frames: usize,
        total: usize,
        annotate: Option<&Path>,
    ) -> Result<Vec<FrameDetections>, Box<dyn std::error::Error>> {
        let mut results = Vec::new();
        let mut frames = self.reader.frames();

        while results.len() < max_frames {
            let t0 = Instant::now();
            let Some(frame) = frames.next().transpose()? else {
                break;
            };
            self.logger.timing("decode", elapsed_ms(t0));

            let t0 = Instant::now();
            let gray = frame.to_gray()?;
            self.logger.timing("gray", elapsed_ms(t0));

            let t0 = Instant::now();
            let detections = self.detector.detect_gray(&gray)?;
            self.logger.timing("detect", elapsed_ms(t0));
            self.logger.metric("faces", detections.len() as f64);

            let found = FrameDetections {
                frame_index: frame.index(),
                detections,
            };
            if results.is_empty() {
                if let Some(path) = annotate {
                    Self::write_annotated(&self.image_writer, frame, &found.regions(), path)?;
                }
            }
            results.push(found);
            self.logger.progress(results.len(), total);
        }
        Ok(results)
    }

    fn write_annotated(
        image_writer: &Option<Box<dyn ImageWriter>>,
        mut frame: Frame,
        regions: &[Region],
        path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let writer = image_writer
            .as_ref()
            .ok_or("Annotation requested without an image writer")?;
        draw_regions(&mut frame, regions, DEFAULT_BOX_COLOR, ANNOTATION_THICKNESS);
        writer.write(path, &frame)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
